use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{events::FieldObserver, snapshot::SessionSnapshot, state::PlayfieldState};

/// Shared handle to one playfield.
///
/// A single mutex serializes the tick worker, input and readers. Every read
/// and every mutation (including the observer callbacks it triggers) runs
/// with the lock held, so readers never see a half-applied change.
#[derive(Debug, Clone)]
pub struct SharedPlayfield {
    inner: Arc<Mutex<PlayfieldState>>,
}

impl SharedPlayfield {
    #[must_use]
    pub fn new(state: PlayfieldState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Locks the playfield.
    ///
    /// A panic while the lock was held cannot leave the state half-changed,
    /// since mutations validate before they commit, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, PlayfieldState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read<T>(&self, f: impl FnOnce(&PlayfieldState) -> T) -> T {
        f(&self.lock())
    }

    pub fn write<T>(&self, f: impl FnOnce(&mut PlayfieldState) -> T) -> T {
        f(&mut self.lock())
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.read(PlayfieldState::snapshot)
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.read(PlayfieldState::is_game_over)
    }

    pub fn register_observer(&self, observer: Arc<dyn FieldObserver>) -> bool {
        self.write(|state| state.register_observer(observer))
    }

    pub fn unregister_observer(&self, observer: &Arc<dyn FieldObserver>) -> bool {
        self.write(|state| state.unregister_observer(observer))
    }
}
