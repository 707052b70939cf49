use std::{sync::Arc, time::Duration};

use rand::Rng as _;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{SchedulerStoppedError, core::FieldSize};

use super::{
    events::FieldObserver,
    randomizer::{NextPiece, PieceSeed},
    scheduler::{PlayerCommand, TickConfig, TickScheduler},
    shared::SharedPlayfield,
    snapshot::{SessionSnapshot, SnapshotError},
    state::PlayfieldState,
};

/// Settings for a new game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub field: FieldSize,
    #[serde(default)]
    pub tick: TickConfig,
}

/// One game: the shared playfield plus the scheduler driving it.
///
/// A session starts stopped. [`GameSession::start`] and [`GameSession::stop`]
/// pause and resume gravity; the random source survives pauses, so a seeded
/// session stays reproducible. Dropping the session stops its scheduler.
#[derive(Debug)]
pub struct GameSession {
    config: GameConfig,
    playfield: SharedPlayfield,
    rng: Option<Pcg32>,
    scheduler: Option<TickScheduler<Pcg32>>,
}

impl GameSession {
    #[must_use]
    pub fn new(config: GameConfig, seed: PieceSeed) -> Self {
        let mut rng = seed.rng();
        let first = NextPiece::random(&mut rng);
        let state = PlayfieldState::new(config.field, first);
        Self {
            config,
            playfield: SharedPlayfield::new(state),
            rng: Some(rng),
            scheduler: None,
        }
    }

    /// Resumes a saved game. The field size comes from the snapshot.
    pub fn restore(
        config: GameConfig,
        snapshot: SessionSnapshot,
        seed: PieceSeed,
    ) -> Result<Self, SnapshotError> {
        let config = GameConfig {
            field: snapshot.field.size(),
            ..config
        };
        let state = PlayfieldState::from_snapshot(snapshot)?;
        Ok(Self {
            config,
            playfield: SharedPlayfield::new(state),
            rng: Some(seed.rng()),
            scheduler: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub fn playfield(&self) -> &SharedPlayfield {
        &self.playfield
    }

    /// Starts gravity. Returns `false` if already running or the game is over.
    pub fn start(&mut self) -> bool {
        if self.is_running() || self.playfield.is_game_over() {
            return false;
        }
        // A scheduler that stopped itself at game over is still parked here.
        self.stop();
        let rng = self
            .rng
            .take()
            .unwrap_or_else(|| rand::rng().random::<PieceSeed>().rng());
        self.scheduler = Some(TickScheduler::start(
            self.playfield.clone(),
            self.config.tick,
            rng,
        ));
        true
    }

    /// Stops gravity and waits for the worker to finish.
    pub fn stop(&mut self) {
        if let Some(mut scheduler) = self.scheduler.take() {
            if let Some(rng) = scheduler.stop() {
                self.rng = Some(rng);
            }
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.scheduler
            .as_ref()
            .is_some_and(|s| s.state().is_running())
    }

    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.playfield.is_game_over()
    }

    pub fn send(&self, command: PlayerCommand) -> Result<(), SchedulerStoppedError> {
        self.scheduler
            .as_ref()
            .ok_or(SchedulerStoppedError)?
            .send(command)
    }

    pub fn speed_up(&self) -> Result<(), SchedulerStoppedError> {
        self.send(PlayerCommand::SpeedUp)
    }

    /// Changes the base gravity period, for this run and later ones.
    pub fn set_period(&mut self, period: Duration) -> Result<(), SchedulerStoppedError> {
        self.config.tick.period = period;
        match &self.scheduler {
            Some(scheduler) => scheduler.set_period(period),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.playfield.snapshot()
    }

    pub fn register_observer(&self, observer: Arc<dyn FieldObserver>) -> bool {
        self.playfield.register_observer(observer)
    }

    pub fn unregister_observer(&self, observer: &Arc<dyn FieldObserver>) -> bool {
        self.playfield.unregister_observer(observer)
    }
}
