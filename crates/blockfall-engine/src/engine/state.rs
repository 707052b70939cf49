use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{Field, FieldSize, Piece};

use super::{
    events::{FieldEvent, FieldObserver, Notifier},
    randomizer::NextPiece,
    snapshot::{SessionSnapshot, SnapshotError},
};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case")]
pub enum GameOverCause {
    /// The locked piece still had cells above the top row.
    Overflow,
    /// The next piece did not fit at its spawn position.
    BlockedSpawn,
}

/// Result of [`PlayfieldState::lock_and_advance`].
#[derive(Debug, Clone, PartialEq, Eq, derive_more::IsVariant)]
pub enum LockOutcome {
    /// A new piece was spawned. `cleared_rows` lists the removed rows (possibly none).
    Continued { cleared_rows: Vec<usize> },
    GameOver(GameOverCause),
}

/// The playfield state machine: locked cells plus the active piece.
///
/// Every mutation validates the candidate state first and commits only if it
/// is valid, so a rejected call leaves the state untouched. Committed changes
/// are broadcast to the registered observers before the call returns.
///
/// After game over all mutations are rejected.
#[derive(Debug)]
pub struct PlayfieldState {
    field: Field,
    piece: Piece,
    game_over: Option<GameOverCause>,
    notifier: Notifier,
}

impl PlayfieldState {
    /// Starts a session on an empty field with `first` as the active piece.
    ///
    /// If `first` cannot spawn at all (a field narrower than the piece), the
    /// session starts already over.
    #[must_use]
    pub fn new(size: FieldSize, first: NextPiece) -> Self {
        let field = Field::new(size);
        let piece = spawn_position(size, first);
        let mut this = Self {
            field,
            piece,
            game_over: None,
            notifier: Notifier::new(),
        };
        if !this.fits(&piece) {
            this.game_over = Some(GameOverCause::BlockedSpawn);
        }
        this
    }

    /// Rebuilds a session from a snapshot. Observers are not part of a snapshot.
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Result<Self, SnapshotError> {
        snapshot.validate()?;
        Ok(Self {
            field: snapshot.field,
            piece: snapshot.piece,
            game_over: snapshot.game_over,
            notifier: Notifier::new(),
        })
    }

    /// Replaces the session with a snapshot, keeping the registered observers.
    pub fn restore(&mut self, snapshot: SessionSnapshot) -> Result<(), SnapshotError> {
        snapshot.validate()?;
        let old_area = self.piece.area();
        self.field = snapshot.field;
        self.piece = snapshot.piece;
        self.game_over = snapshot.game_over;
        self.notifier.broadcast(&FieldEvent::PieceMoved { old_area });
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            field: self.field.clone(),
            piece: self.piece,
            game_over: self.game_over,
        }
    }

    #[must_use]
    pub fn size(&self) -> FieldSize {
        self.field.size()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.field.width()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.field.height()
    }

    /// Returns `true` if the cell holds a locked block. The active piece is not included.
    #[must_use]
    pub fn is_occupied(&self, x: usize, y: usize) -> bool {
        self.field.is_occupied(x, y)
    }

    #[must_use]
    pub fn field(&self) -> &Field {
        &self.field
    }

    #[must_use]
    pub fn active_piece(&self) -> Piece {
        self.piece
    }

    #[must_use]
    pub fn game_over(&self) -> Option<GameOverCause> {
        self.game_over
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.game_over.is_some()
    }

    /// Returns `true` if the active piece is in a legal position.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.fits(&self.piece)
    }

    pub fn register_observer(&mut self, observer: Arc<dyn FieldObserver>) -> bool {
        self.notifier.register(observer)
    }

    pub fn unregister_observer(&mut self, observer: &Arc<dyn FieldObserver>) -> bool {
        self.notifier.unregister(observer)
    }

    pub fn move_horizontal(&mut self, dx: i32) -> bool {
        self.piece
            .shifted(dx, 0)
            .is_some_and(|candidate| self.try_replace(candidate))
    }

    /// Moves the piece down by `dy` rows. `false` from `move_vertical(1)` means it has landed.
    pub fn move_vertical(&mut self, dy: i32) -> bool {
        self.piece
            .shifted(0, dy)
            .is_some_and(|candidate| self.try_replace(candidate))
    }

    /// Rotates in place by `delta` states (positive is clockwise). There is no wall kick.
    pub fn rotate(&mut self, delta: i32) -> bool {
        self.try_replace(self.piece.rotated(delta))
    }

    /// Locks the active piece into the field, removes full rows and spawns `next`.
    ///
    /// A piece locked with cells above the top row ends the session and clears
    /// the field. A spawn that does not fit ends the session and leaves the
    /// field as merged.
    pub fn lock_and_advance(&mut self, next: NextPiece) -> LockOutcome {
        if let Some(cause) = self.game_over {
            return LockOutcome::GameOver(cause);
        }

        if self.piece.cells().any(|(_, y)| y < 0) {
            self.field.clear();
            return self.end(GameOverCause::Overflow);
        }

        let old_area = self.piece.area();
        self.field.fill_cells(self.piece.cells());
        let cleared_rows = self.field.collapse_full_rows();

        self.piece = spawn_position(self.field.size(), next);
        if !self.fits(&self.piece) {
            return self.end(GameOverCause::BlockedSpawn);
        }

        if !cleared_rows.is_empty() {
            self.notifier.broadcast(&FieldEvent::LinesRemoved {
                rows: cleared_rows.clone(),
            });
        }
        self.notifier.broadcast(&FieldEvent::PieceMoved { old_area });
        LockOutcome::Continued { cleared_rows }
    }

    fn end(&mut self, cause: GameOverCause) -> LockOutcome {
        self.game_over = Some(cause);
        self.notifier.broadcast(&FieldEvent::GameOver);
        LockOutcome::GameOver(cause)
    }

    fn try_replace(&mut self, candidate: Piece) -> bool {
        if self.game_over.is_some() || !self.fits(&candidate) {
            return false;
        }
        let old_area = self.piece.area();
        self.piece = candidate;
        self.notifier.broadcast(&FieldEvent::PieceMoved { old_area });
        true
    }

    /// Every cell must be inside the side walls and above the floor; cells
    /// inside the field must also be free. Cells above the top row are allowed.
    fn fits(&self, piece: &Piece) -> bool {
        piece_fits(&self.field, piece)
    }
}

pub(crate) fn piece_fits(field: &Field, piece: &Piece) -> bool {
    piece.cells().all(|(x, y)| match field.cell(x, y) {
        Some(occupied) => !occupied,
        None => y < 0 && usize::try_from(x).is_ok_and(|x| x < field.width()),
    })
}

/// Centers the piece over the columns its occupied cells can reach, with its
/// bottom occupied row on the top row of the field.
fn spawn_position(size: FieldSize, next: NextPiece) -> Piece {
    let mask = next.kind.mask(usize::from(next.rotation));
    let left = i32::from(mask.leftmost_column());
    let span = i32::from(mask.rightmost_column()) - left + 1;
    let x = (size.bounds().width - span).div_euclid(2) - left;
    let y = -i32::from(mask.bottom_row());
    Piece::new(next.kind, next.rotation, x, y)
}
