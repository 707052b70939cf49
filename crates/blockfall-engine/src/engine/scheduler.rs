use std::{
    panic,
    sync::{
        Arc, Mutex, PoisonError,
        mpsc::{self, RecvTimeoutError},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::SchedulerStoppedError;

use super::{randomizer::NextPiece, shared::SharedPlayfield, state::PlayfieldState};

/// Gravity timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickConfig {
    /// Interval between gravity ticks.
    #[serde(with = "millis")]
    pub period: Duration,
    /// Interval used after [`PlayerCommand::SpeedUp`] until the piece locks.
    #[serde(with = "millis")]
    pub fast_period: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(500),
            fast_period: Duration::from_millis(50),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[expect(clippy::cast_possible_truncation)]
    pub(super) fn serialize<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Player input, applied on the tick worker so it never interleaves with gravity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    MoveLeft,
    MoveRight,
    RotateClockwise,
    SpeedUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum SchedulerState {
    Stopped,
    Running { period: Duration },
}

#[derive(Debug)]
enum Command {
    Input(PlayerCommand),
    SetPeriod(Duration),
    Stop,
}

/// Drives gravity on a dedicated worker thread.
///
/// Every `period` the worker drops the active piece one row; a piece that
/// cannot drop is locked and a random next piece spawns. Player commands are
/// queued to the same worker. The worker exits on its own at game over.
///
/// The worker owns the random source and hands it back from [`TickScheduler::stop`].
#[derive(Debug)]
pub struct TickScheduler<R> {
    tx: Option<mpsc::Sender<Command>>,
    handle: Option<JoinHandle<R>>,
    state: Arc<Mutex<SchedulerState>>,
}

impl<R> TickScheduler<R>
where
    R: Rng + Send + 'static,
{
    #[must_use]
    pub fn start(playfield: SharedPlayfield, config: TickConfig, rng: R) -> Self {
        let (tx, rx) = mpsc::channel();
        let state = Arc::new(Mutex::new(SchedulerState::Running {
            period: config.period,
        }));
        let handle = thread::spawn({
            let state = Arc::clone(&state);
            move || {
                let mut worker = Worker {
                    playfield,
                    config,
                    rng,
                    state,
                    period: config.period,
                    sped_up: false,
                };
                worker.run(&rx);
                worker.set_state(SchedulerState::Stopped);
                worker.rng
            }
        });
        Self {
            tx: Some(tx),
            handle: Some(handle),
            state,
        }
    }
}

impl<R> TickScheduler<R> {
    #[must_use]
    pub fn state(&self) -> SchedulerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn send(&self, command: PlayerCommand) -> Result<(), SchedulerStoppedError> {
        self.command(Command::Input(command))
    }

    /// Changes the gravity period. The pending tick is rescheduled, not kept.
    pub fn set_period(&self, period: Duration) -> Result<(), SchedulerStoppedError> {
        self.command(Command::SetPeriod(period))
    }

    fn command(&self, command: Command) -> Result<(), SchedulerStoppedError> {
        let tx = self.tx.as_ref().ok_or(SchedulerStoppedError)?;
        tx.send(command).map_err(|_| SchedulerStoppedError)
    }

    /// Stops the worker and waits for it to exit.
    ///
    /// When this returns no tick is running and none will run again. Returns
    /// the random source, or `None` if the scheduler was already stopped.
    pub fn stop(&mut self) -> Option<R> {
        if let Some(tx) = self.tx.take() {
            // The worker may already be gone after game over.
            let _ = tx.send(Command::Stop);
        }
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(rng) => Some(rng),
            Err(payload) => {
                if !thread::panicking() {
                    panic::resume_unwind(payload);
                }
                None
            }
        }
    }
}

impl<R> Drop for TickScheduler<R> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

struct Worker<R> {
    playfield: SharedPlayfield,
    config: TickConfig,
    rng: R,
    state: Arc<Mutex<SchedulerState>>,
    period: Duration,
    sped_up: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickResult {
    Dropped,
    Locked,
    GameOver,
}

impl<R> Worker<R>
where
    R: Rng,
{
    fn run(&mut self, rx: &mpsc::Receiver<Command>) {
        let mut deadline = Instant::now() + self.period;
        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(timeout) {
                Ok(Command::Input(PlayerCommand::SpeedUp)) => {
                    if !self.sped_up {
                        self.sped_up = true;
                        self.set_period(self.config.fast_period);
                        deadline = Instant::now() + self.period;
                    }
                }
                Ok(Command::Input(command)) => {
                    self.playfield.write(|state| apply(state, command));
                }
                Ok(Command::SetPeriod(period)) => {
                    self.config.period = period;
                    if !self.sped_up {
                        self.set_period(period);
                    }
                    deadline = Instant::now() + self.period;
                }
                Ok(Command::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    match self.tick() {
                        TickResult::Dropped => {}
                        TickResult::Locked => {
                            if self.sped_up {
                                self.sped_up = false;
                                self.set_period(self.config.period);
                            }
                        }
                        TickResult::GameOver => break,
                    }
                    deadline = Instant::now() + self.period;
                }
            }
        }
    }

    fn tick(&mut self) -> TickResult {
        let rng = &mut self.rng;
        self.playfield.write(|state| {
            if state.is_game_over() {
                return TickResult::GameOver;
            }
            if state.move_vertical(1) {
                return TickResult::Dropped;
            }
            if state.lock_and_advance(NextPiece::random(rng)).is_continued() {
                TickResult::Locked
            } else {
                TickResult::GameOver
            }
        })
    }

    fn set_period(&mut self, period: Duration) {
        self.period = period;
        self.set_state(SchedulerState::Running { period });
    }

    fn set_state(&self, state: SchedulerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

fn apply(state: &mut PlayfieldState, command: PlayerCommand) -> bool {
    match command {
        PlayerCommand::MoveLeft => state.move_horizontal(-1),
        PlayerCommand::MoveRight => state.move_horizontal(1),
        PlayerCommand::RotateClockwise => state.rotate(1),
        PlayerCommand::SpeedUp => false,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;
    use crate::{Field, FieldSize, Piece, PieceKind, SessionSnapshot};

    fn playfield(width: u8, height: u8) -> SharedPlayfield {
        SharedPlayfield::new(PlayfieldState::new(
            FieldSize::new(width, height).unwrap(),
            NextPiece::new(PieceKind::O, 0),
        ))
    }

    fn config(period_ms: u64, fast_ms: u64) -> TickConfig {
        TickConfig {
            period: Duration::from_millis(period_ms),
            fast_period: Duration::from_millis(fast_ms),
        }
    }

    fn wait_until(timeout: Duration, mut f: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        f()
    }

    #[test]
    fn test_ticks_drop_the_piece() {
        let shared = playfield(10, 40);
        let start_y = shared.read(|s| s.active_piece().y());
        let mut scheduler =
            TickScheduler::start(shared.clone(), config(5, 1), Pcg32::seed_from_u64(1));
        assert!(scheduler.state().is_running());

        assert!(wait_until(Duration::from_secs(5), || {
            shared.read(|s| s.active_piece().y()) >= start_y + 3
        }));
        assert!(scheduler.stop().is_some());
        assert!(scheduler.state().is_stopped());
    }

    #[test]
    fn test_stop_is_synchronous() {
        let shared = playfield(10, 20);
        let mut scheduler =
            TickScheduler::start(shared.clone(), config(1, 1), Pcg32::seed_from_u64(2));
        thread::sleep(Duration::from_millis(30));
        scheduler.stop();

        let frozen = shared.snapshot();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(shared.snapshot(), frozen);
        assert!(scheduler.stop().is_none());
        assert_eq!(
            scheduler.send(PlayerCommand::MoveLeft),
            Err(SchedulerStoppedError)
        );
    }

    #[test]
    fn test_commands_run_on_worker() {
        let shared = playfield(10, 40);
        let scheduler =
            TickScheduler::start(shared.clone(), config(60_000, 60_000), Pcg32::seed_from_u64(3));
        let start_x = shared.read(|s| s.active_piece().x());

        scheduler.send(PlayerCommand::MoveLeft).unwrap();
        scheduler.send(PlayerCommand::MoveLeft).unwrap();
        assert!(wait_until(Duration::from_secs(5), || {
            shared.read(|s| s.active_piece().x()) == start_x - 2
        }));
    }

    #[test]
    fn test_speed_up_replaces_pending_tick() {
        let shared = playfield(10, 40);
        let start_y = shared.read(|s| s.active_piece().y());
        let scheduler =
            TickScheduler::start(shared.clone(), config(60_000, 5), Pcg32::seed_from_u64(4));

        scheduler.send(PlayerCommand::SpeedUp).unwrap();
        assert!(wait_until(Duration::from_secs(5), || {
            shared.read(|s| s.active_piece().y()) > start_y
        }));
        assert_eq!(
            scheduler.state(),
            SchedulerState::Running {
                period: Duration::from_millis(5)
            }
        );
    }

    #[test]
    fn test_speed_up_ends_when_piece_locks() {
        let shared = playfield(10, 4);
        let scheduler =
            TickScheduler::start(shared.clone(), config(60_000, 2), Pcg32::seed_from_u64(5));

        scheduler.send(PlayerCommand::SpeedUp).unwrap();
        assert!(wait_until(Duration::from_secs(5), || {
            shared.read(|s| s.field().occupied_count()) > 0
        }));
        assert_eq!(shared.read(|s| s.field().occupied_count()), 4);
        assert!(wait_until(Duration::from_secs(5), || {
            scheduler.state()
                == SchedulerState::Running {
                    period: Duration::from_secs(60),
                }
        }));
    }

    #[test]
    fn test_set_period() {
        let shared = playfield(10, 40);
        let start_y = shared.read(|s| s.active_piece().y());
        let scheduler =
            TickScheduler::start(shared.clone(), config(60_000, 60_000), Pcg32::seed_from_u64(6));

        scheduler.set_period(Duration::from_millis(3)).unwrap();
        assert!(wait_until(Duration::from_secs(5), || {
            shared.read(|s| s.active_piece().y()) > start_y
        }));
    }

    #[test]
    fn test_game_over_stops_worker() {
        let snapshot = SessionSnapshot {
            field: Field::from_ascii(&[
                "......", //
                "#.####", //
                "######", //
                "######", //
            ]),
            piece: Piece::new(PieceKind::O, 0, 2, -1),
            game_over: None,
        };
        let shared = SharedPlayfield::new(PlayfieldState::from_snapshot(snapshot).unwrap());
        let scheduler =
            TickScheduler::start(shared.clone(), config(1, 1), Pcg32::seed_from_u64(7));

        let stopped = wait_until(Duration::from_secs(5), || scheduler.state().is_stopped());
        assert!(stopped);
        assert!(shared.is_game_over());
        let rejected = wait_until(Duration::from_secs(5), || {
            scheduler.send(PlayerCommand::MoveLeft).is_err()
        });
        assert!(rejected);
    }
}
