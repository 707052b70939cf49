use serde::{Deserialize, Serialize};

use crate::core::{Field, Piece};

use super::state::{GameOverCause, piece_fits};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SnapshotError {
    #[display("failed to encode session snapshot")]
    Encode(serde_json::Error),
    #[display("failed to decode session snapshot")]
    Decode(serde_json::Error),
    #[display("active piece {piece:?} lies outside the field")]
    PieceOutOfBounds {
        #[error(not(source))]
        piece: Piece,
    },
    #[display("active piece {piece:?} overlaps locked cells")]
    PieceOverlapsField {
        #[error(not(source))]
        piece: Piece,
    },
}

/// Complete state of a session: locked cells, the active piece and whether
/// the session has ended.
///
/// The blob form is opaque to callers; only [`SessionSnapshot::from_blob`] reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub field: Field,
    pub piece: Piece,
    #[serde(default)]
    pub game_over: Option<GameOverCause>,
}

impl SessionSnapshot {
    pub fn to_blob(&self) -> Result<Vec<u8>, SnapshotError> {
        serde_json::to_vec(self).map_err(SnapshotError::Encode)
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_slice(blob).map_err(SnapshotError::Decode)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Checks that a running session's piece is in a legal position.
    ///
    /// A finished session may hold a piece that never fit, so it is not checked.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.game_over.is_some() || piece_fits(&self.field, &self.piece) {
            return Ok(());
        }
        let inside = self.piece.cells().all(|(x, y)| {
            usize::try_from(x).is_ok_and(|x| x < self.field.width())
                && usize::try_from(y).map_or(y < 0, |y| y < self.field.height())
        });
        if inside {
            Err(SnapshotError::PieceOverlapsField { piece: self.piece })
        } else {
            Err(SnapshotError::PieceOutOfBounds { piece: self.piece })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldSize, NextPiece, PieceKind, PlayfieldState};

    #[test]
    fn test_blob_round_trip() {
        let mut state =
            PlayfieldState::new(FieldSize::new(8, 10).unwrap(), NextPiece::new(PieceKind::Z, 1));
        state.move_vertical(4);
        state.lock_and_advance(NextPiece::new(PieceKind::J, 3));
        state.move_horizontal(-2);

        let snapshot = state.snapshot();
        let blob = snapshot.to_blob().unwrap();
        let decoded = SessionSnapshot::from_blob(&blob).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(
            PlayfieldState::from_snapshot(decoded).unwrap().snapshot(),
            snapshot
        );
    }

    #[test]
    fn test_serialized_form() {
        let snapshot = SessionSnapshot {
            field: Field::from_ascii(&["....", "#..#"]),
            piece: Piece::new(PieceKind::O, 0, 1, -1),
            game_over: None,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(
            json,
            r#"{"field":"4x2:0,9","piece":"O#0@1,-1","game_over":null}"#
        );
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            SessionSnapshot::from_blob(b"not json"),
            Err(SnapshotError::Decode(_))
        ));
        let wrong_rows = br#"{"field":"4x2:0","piece":"O#0@1,-1"}"#;
        assert!(matches!(
            SessionSnapshot::from_blob(wrong_rows),
            Err(SnapshotError::Decode(_))
        ));
    }

    #[test]
    fn test_validate_rejects_illegal_piece() {
        let out_of_bounds = br#"{"field":"4x2:0,0","piece":"O#0@3,0"}"#;
        assert!(matches!(
            SessionSnapshot::from_blob(out_of_bounds),
            Err(SnapshotError::PieceOutOfBounds { .. })
        ));
        let below_floor = br#"{"field":"4x2:0,0","piece":"O#0@1,1"}"#;
        assert!(matches!(
            SessionSnapshot::from_blob(below_floor),
            Err(SnapshotError::PieceOutOfBounds { .. })
        ));
        let overlapping = br#"{"field":"4x2:0,2","piece":"O#0@1,0"}"#;
        assert!(matches!(
            SessionSnapshot::from_blob(overlapping),
            Err(SnapshotError::PieceOverlapsField { .. })
        ));
    }

    #[test]
    fn test_finished_session_skips_piece_check() {
        let blob = br#"{"field":"4x2:0,2","piece":"O#0@1,0","game_over":"blocked_spawn"}"#;
        let snapshot = SessionSnapshot::from_blob(blob).unwrap();
        assert_eq!(snapshot.game_over, Some(GameOverCause::BlockedSpawn));
    }
}
