use std::{fmt, sync::Arc};

use crate::core::CellRect;

/// Notification broadcast by the playfield after a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::IsVariant)]
pub enum FieldEvent {
    /// The active piece moved, rotated, or was replaced by a new piece.
    ///
    /// Carries the bounding box the piece occupied before the change.
    PieceMoved { old_area: CellRect },
    /// Full rows were removed. Indices are ascending and taken before any shifting.
    LinesRemoved { rows: Vec<usize> },
    /// The session ended.
    GameOver,
}

impl FieldEvent {
    /// Region of a `field_width`-wide field that needs redrawing, or `None` for the whole field.
    ///
    /// Removing a row shifts everything above it, so line removal dirties all
    /// rows from the top down to the lowest removed one.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn damage(&self, field_width: usize) -> Option<CellRect> {
        match self {
            FieldEvent::PieceMoved { old_area } => Some(*old_area),
            FieldEvent::LinesRemoved { rows } => {
                let lowest = *rows.iter().max()?;
                Some(CellRect::new(0, 0, field_width as i32, lowest as i32 + 1))
            }
            FieldEvent::GameOver => None,
        }
    }
}

/// Receiver of [`FieldEvent`]s.
///
/// Notifications run synchronously on the mutating thread while the playfield
/// lock is held. An observer must return quickly and must not call back into
/// the playfield, or it will deadlock.
pub trait FieldObserver: Send + Sync {
    fn notify(&self, event: &FieldEvent);
}

impl<F> FieldObserver for F
where
    F: Fn(&FieldEvent) + Send + Sync,
{
    fn notify(&self, event: &FieldEvent) {
        self(event);
    }
}

/// Registry of observers keyed by handle identity.
#[derive(Default)]
pub struct Notifier {
    observers: Vec<Arc<dyn FieldObserver>>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("observers", &self.observers.len())
            .finish()
    }
}

fn same_handle(a: &Arc<dyn FieldObserver>, b: &Arc<dyn FieldObserver>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer. Registering the same handle twice is a no-op.
    ///
    /// Returns `true` if the handle was newly added.
    pub fn register(&mut self, observer: Arc<dyn FieldObserver>) -> bool {
        if self.observers.iter().any(|o| same_handle(o, &observer)) {
            return false;
        }
        self.observers.push(observer);
        true
    }

    /// Removes an observer previously passed to [`Notifier::register`].
    pub fn unregister(&mut self, observer: &Arc<dyn FieldObserver>) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| !same_handle(o, observer));
        self.observers.len() != before
    }

    pub fn broadcast(&self, event: &FieldEvent) {
        for observer in &self.observers {
            observer.notify(event);
        }
    }
}
