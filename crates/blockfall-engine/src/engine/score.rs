use std::{
    convert::Infallible,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};

use super::events::{FieldEvent, FieldObserver};

/// Observer counting removed lines. Each line is worth one point.
#[derive(Debug, Default)]
pub struct ScoreCounter {
    lines: AtomicU64,
}

impl ScoreCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter resuming from an earlier score.
    #[must_use]
    pub fn with_score(score: u64) -> Self {
        Self {
            lines: AtomicU64::new(score),
        }
    }

    #[must_use]
    pub fn score(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }
}

impl FieldObserver for ScoreCounter {
    fn notify(&self, event: &FieldEvent) {
        if let FieldEvent::LinesRemoved { rows } = event {
            self.lines.fetch_add(rows.len() as u64, Ordering::Relaxed);
        }
    }
}

/// Final score of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub score: u64,
}

/// Append-only destination for final scores.
pub trait ScoreSink {
    type Error;

    fn append(&mut self, record: ScoreRecord) -> Result<(), Self::Error>;
}

impl ScoreSink for Vec<ScoreRecord> {
    type Error = Infallible;

    fn append(&mut self, record: ScoreRecord) -> Result<(), Self::Error> {
        self.push(record);
        Ok(())
    }
}

/// Appends the score to `sink` if it is positive.
///
/// Returns whether a record was written.
pub fn record_final_score<S>(sink: &mut S, score: u64, timestamp_ms: i64) -> Result<bool, S::Error>
where
    S: ScoreSink + ?Sized,
{
    if score == 0 {
        return Ok(false);
    }
    sink.append(ScoreRecord {
        timestamp_ms,
        score,
    })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{Field, FieldSize, NextPiece, Piece, PieceKind, PlayfieldState, SessionSnapshot};

    #[test]
    fn test_counter_adds_one_point_per_line() {
        let counter = ScoreCounter::with_score(3);
        counter.notify(&FieldEvent::LinesRemoved { rows: vec![4, 7] });
        counter.notify(&FieldEvent::GameOver);
        assert_eq!(counter.score(), 5);
    }

    #[test]
    fn test_counter_as_observer() {
        let field: Field = serde_json::from_str("\"4x4:0,0,0,7\"").unwrap();
        let snapshot = SessionSnapshot {
            field,
            piece: Piece::new(PieceKind::I, 1, 2, 0),
            game_over: None,
        };
        let mut state = PlayfieldState::from_snapshot(snapshot).unwrap();
        let counter = Arc::new(ScoreCounter::new());
        state.register_observer(counter.clone());

        assert!(!state.move_vertical(1));
        let outcome = state.lock_and_advance(NextPiece::new(PieceKind::O, 0));
        assert!(outcome.is_continued());
        assert_eq!(counter.score(), 1);
        assert_eq!(state.size(), FieldSize::new(4, 4).unwrap());
    }

    #[test]
    fn test_record_final_score_skips_zero() {
        let mut sink: Vec<ScoreRecord> = vec![];
        assert_eq!(record_final_score(&mut sink, 0, 1_000), Ok(false));
        assert_eq!(record_final_score(&mut sink, 12, 2_000), Ok(true));
        assert_eq!(
            sink,
            [ScoreRecord {
                timestamp_ms: 2_000,
                score: 12
            }]
        );
    }
}
