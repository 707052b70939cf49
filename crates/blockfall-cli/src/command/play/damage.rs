use std::{
    mem,
    sync::{Mutex, MutexGuard, PoisonError},
};

use blockfall_engine::{CellRect, FieldEvent, FieldObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Pending {
    #[default]
    Clean,
    Region(CellRect),
    Full,
}

/// Collects the redraw hints carried by field events between two frames.
///
/// A moved piece dirties its old box plus its new one, one cell wider on each
/// side; only the part inside the field matters.
#[derive(Debug)]
pub struct DamageTracker {
    field_width: usize,
    pending: Mutex<Pending>,
}

impl DamageTracker {
    /// A tracker that asks for the first frame.
    pub fn new(field_width: usize) -> Self {
        Self {
            field_width,
            pending: Mutex::new(Pending::Full),
        }
    }

    /// Requests a full redraw, e.g. after input or a terminal resize.
    pub fn mark_full(&self) {
        *self.lock() = Pending::Full;
    }

    /// Takes the pending damage. Call before reading the playfield, so that
    /// events arriving afterwards stay pending for the next frame.
    pub fn take(&self) -> Damage {
        Damage(mem::take(&mut *self.lock()))
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FieldObserver for DamageTracker {
    fn notify(&self, event: &FieldEvent) {
        let mut pending = self.lock();
        *pending = match (*pending, event.damage(self.field_width)) {
            (Pending::Full, _) | (_, None) => Pending::Full,
            (Pending::Clean, Some(rect)) => Pending::Region(rect),
            (Pending::Region(old), Some(rect)) => Pending::Region(old.union(&rect)),
        };
    }
}

/// Damage taken from a [`DamageTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Damage(Pending);

impl Damage {
    /// Whether the frame must be redrawn, given where the piece is now and
    /// the field bounds.
    pub fn needs_redraw(self, piece_area: CellRect, bounds: CellRect) -> bool {
        match self.0 {
            Pending::Clean => false,
            Pending::Full => true,
            Pending::Region(rect) => rect
                .union(&piece_area)
                .inflate(1)
                .intersection(&bounds)
                .is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: CellRect = CellRect::new(0, 0, 10, 20);

    fn moved(x: i32, y: i32) -> FieldEvent {
        FieldEvent::PieceMoved {
            old_area: CellRect::new(x, y, 3, 2),
        }
    }

    #[test]
    fn test_first_frame_and_take_clears() {
        let tracker = DamageTracker::new(10);
        assert!(tracker.take().needs_redraw(CellRect::default(), BOUNDS));
        assert!(!tracker.take().needs_redraw(CellRect::new(3, 3, 3, 2), BOUNDS));

        tracker.mark_full();
        assert!(tracker.take().needs_redraw(CellRect::default(), BOUNDS));
    }

    #[test]
    fn test_moves_above_field_need_no_redraw() {
        let tracker = DamageTracker::new(10);
        _ = tracker.take();

        tracker.notify(&moved(3, -6));
        let above = CellRect::new(3, -5, 3, 2);
        assert!(!tracker.take().needs_redraw(above, BOUNDS));

        // Touching the top row through the one-cell margin, then entering it
        tracker.notify(&moved(3, -4));
        assert!(tracker.take().needs_redraw(CellRect::new(3, -2, 3, 2), BOUNDS));
        tracker.notify(&moved(3, -4));
        assert!(tracker.take().needs_redraw(CellRect::new(3, -1, 3, 2), BOUNDS));
    }

    #[test]
    fn test_regions_accumulate() {
        let tracker = DamageTracker::new(10);
        _ = tracker.take();

        tracker.notify(&moved(3, -8));
        tracker.notify(&moved(3, 4));
        let above = CellRect::new(3, -7, 3, 2);
        assert!(tracker.take().needs_redraw(above, BOUNDS));
    }

    #[test]
    fn test_lines_and_game_over() {
        let tracker = DamageTracker::new(10);
        _ = tracker.take();

        tracker.notify(&FieldEvent::LinesRemoved { rows: vec![18, 19] });
        let above = CellRect::new(3, -7, 3, 2);
        assert!(tracker.take().needs_redraw(above, BOUNDS));

        tracker.notify(&moved(3, -8));
        tracker.notify(&FieldEvent::GameOver);
        tracker.notify(&moved(3, -8));
        assert!(tracker.take().needs_redraw(above, BOUNDS));
    }
}
