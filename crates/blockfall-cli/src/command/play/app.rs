use std::{sync::Arc, time::Duration};

use blockfall_engine::{FieldObserver, GameSession, PlayerCommand, ScoreCounter, SessionSnapshot};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Layout},
    style::{Color, Style},
    text::Text,
};

use crate::{
    command::play::damage::DamageTracker,
    ui::widgets::{GameDisplay, GameStatus},
};

const FPS: u64 = 60;
const FRAME_INTERVAL: Duration = Duration::from_millis(1000 / FPS);
const PERIOD_STEP: i64 = 50;
const MIN_PERIOD_MS: u64 = 50;
const MAX_PERIOD_MS: u64 = 2000;

/// What the player leaves behind when the app exits.
#[derive(Debug)]
pub struct PlayResult {
    pub game_over: bool,
    pub score: u64,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug)]
pub struct PlayApp {
    session: GameSession,
    score: Arc<ScoreCounter>,
    damage: Arc<DamageTracker>,
    paused: bool,
    is_exiting: bool,
}

impl PlayApp {
    pub fn new(session: GameSession, score: u64) -> Self {
        let score = Arc::new(ScoreCounter::with_score(score));
        let damage = Arc::new(DamageTracker::new(session.config().field.width()));
        session.register_observer(score.clone());
        session.register_observer(damage.clone());
        Self {
            session,
            score,
            damage,
            paused: false,
            is_exiting: false,
        }
    }

    fn status(&self) -> GameStatus {
        if self.session.is_game_over() {
            GameStatus::GameOver
        } else if self.paused {
            GameStatus::Paused
        } else {
            GameStatus::Playing
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> anyhow::Result<()> {
        self.session.start();
        while !self.is_exiting {
            if let Some(snapshot) = self.next_frame() {
                terminal.draw(|frame| self.draw(frame, &snapshot))?;
            }
            // Gravity runs on the scheduler thread; this loop only waits for
            // input and redraws at most once per frame.
            if event::poll(FRAME_INTERVAL)? {
                let event = event::read()?;
                self.handle_event(&event);
                self.damage.mark_full();
            }
        }
        Ok(())
    }

    /// Stops gravity and hands back the final state.
    pub fn finish(mut self) -> PlayResult {
        let damage: Arc<dyn FieldObserver> = self.damage.clone();
        self.session.unregister_observer(&damage);
        self.session.stop();
        PlayResult {
            game_over: self.session.is_game_over(),
            score: self.score.score(),
            snapshot: self.session.snapshot(),
        }
    }

    /// The state to draw, if anything visible changed since the last frame.
    fn next_frame(&self) -> Option<SessionSnapshot> {
        let damage = self.damage.take();
        let snapshot = self.session.snapshot();
        let bounds = snapshot.field.size().bounds();
        damage
            .needs_redraw(snapshot.piece.area(), bounds)
            .then_some(snapshot)
    }

    fn draw(&self, frame: &mut Frame<'_>, snapshot: &SessionSnapshot) {
        let status = self.status();
        let game_display = GameDisplay::new(snapshot, self.score.score(), status)
            .period(self.session.config().tick.period);
        let help_text = match status {
            GameStatus::Playing => {
                "Controls: ← → (Move) | ↑ X (Rotate) | ↓ Space (Speed Up) | + - (Gravity) | P (Pause) | Q (Quit)"
            }
            GameStatus::Paused => "Controls: P (Resume) | Q (Quit)",
            GameStatus::GameOver => "Controls: Q (Quit)",
        };
        let help_text = Text::from(help_text)
            .style(Style::default().fg(Color::DarkGray))
            .centered();

        let [main_area, help_area] = Layout::vertical([
            Constraint::Length(game_display.height()),
            Constraint::Length(1),
        ])
        .areas(frame.area());
        frame.render_widget(game_display, main_area);
        frame.render_widget(help_text, help_area);
    }

    fn handle_event(&mut self, event: &Event) {
        let Event::Key(key) = event else {
            return;
        };
        if key.kind != KeyEventKind::Press {
            return;
        }
        let is_playing = self.status() == GameStatus::Playing;
        match key.code {
            KeyCode::Char('p') => self.toggle_pause(),
            KeyCode::Char('q') => self.is_exiting = true,
            KeyCode::Char('+') if is_playing => self.change_period(-PERIOD_STEP),
            KeyCode::Char('-') if is_playing => self.change_period(PERIOD_STEP),
            code if is_playing => {
                if let Some(command) = player_command(code) {
                    // The scheduler may have stopped itself at game over.
                    _ = self.session.send(command);
                }
            }
            _ => {}
        }
    }

    fn change_period(&mut self, delta_ms: i64) {
        let current =
            u64::try_from(self.session.config().tick.period.as_millis()).unwrap_or(u64::MAX);
        let next = current
            .saturating_add_signed(delta_ms)
            .clamp(MIN_PERIOD_MS, MAX_PERIOD_MS);
        _ = self.session.set_period(Duration::from_millis(next));
    }

    fn toggle_pause(&mut self) {
        if self.session.is_game_over() {
            return;
        }
        if self.paused {
            self.paused = !self.session.start();
        } else {
            self.session.stop();
            self.paused = true;
        }
    }
}

fn player_command(code: KeyCode) -> Option<PlayerCommand> {
    match code {
        KeyCode::Left => Some(PlayerCommand::MoveLeft),
        KeyCode::Right => Some(PlayerCommand::MoveRight),
        KeyCode::Up | KeyCode::Char('x') => Some(PlayerCommand::RotateClockwise),
        KeyCode::Down | KeyCode::Char(' ') => Some(PlayerCommand::SpeedUp),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Instant};

    use blockfall_engine::{FieldSize, GameConfig, PieceSeed, TickConfig};
    use crossterm::event::{KeyEvent, KeyEventState, KeyModifiers};

    use super::*;

    fn app(period: Duration) -> PlayApp {
        let config = GameConfig {
            field: FieldSize::new(10, 20).unwrap(),
            tick: TickConfig {
                period,
                fast_period: Duration::from_millis(50),
            },
        };
        PlayApp::new(GameSession::new(config, PieceSeed::from_bytes([9; 16])), 0)
    }

    fn press(app: &mut PlayApp, code: KeyCode) {
        app.handle_event(&Event::Key(KeyEvent::new(code, KeyModifiers::NONE)));
    }

    fn wait_until(mut f: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_player_command_keys() {
        assert_eq!(player_command(KeyCode::Left), Some(PlayerCommand::MoveLeft));
        assert_eq!(player_command(KeyCode::Right), Some(PlayerCommand::MoveRight));
        for code in [KeyCode::Up, KeyCode::Char('x')] {
            assert_eq!(player_command(code), Some(PlayerCommand::RotateClockwise));
        }
        for code in [KeyCode::Down, KeyCode::Char(' ')] {
            assert_eq!(player_command(code), Some(PlayerCommand::SpeedUp));
        }
        assert_eq!(player_command(KeyCode::Char('z')), None);
    }

    #[test]
    fn test_keys_reach_the_worker() {
        let mut app = app(Duration::from_secs(60));
        assert!(app.session.start());
        let x = app.session.snapshot().piece.x();

        press(&mut app, KeyCode::Left);
        assert!(wait_until(|| app.session.snapshot().piece.x() == x - 1));

        let release = KeyEvent {
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
            ..KeyEvent::new(KeyCode::Right, KeyModifiers::NONE)
        };
        app.handle_event(&Event::Key(release));
        press(&mut app, KeyCode::Left);
        assert!(wait_until(|| app.session.snapshot().piece.x() == x - 2));
        app.session.stop();
    }

    #[test]
    fn test_pause_toggles_scheduler() {
        let mut app = app(Duration::from_secs(60));
        assert!(app.session.start());

        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.status(), GameStatus::Paused);
        assert!(!app.session.is_running());

        // Moves are ignored while paused
        let paused = app.session.snapshot();
        press(&mut app, KeyCode::Left);
        assert_eq!(app.session.snapshot(), paused);

        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.status(), GameStatus::Playing);
        assert!(app.session.is_running());

        press(&mut app, KeyCode::Char('q'));
        let result = app.finish();
        assert!(!result.game_over);
        assert_eq!(result.score, 0);
        assert_eq!(result.snapshot, paused);
    }

    #[test]
    fn test_gravity_keys_clamp() {
        let mut app = app(Duration::from_millis(500));
        press(&mut app, KeyCode::Char('+'));
        assert_eq!(app.session.config().tick.period, Duration::from_millis(450));

        for _ in 0..20 {
            press(&mut app, KeyCode::Char('+'));
        }
        assert_eq!(
            app.session.config().tick.period,
            Duration::from_millis(MIN_PERIOD_MS)
        );

        for _ in 0..100 {
            press(&mut app, KeyCode::Char('-'));
        }
        assert_eq!(
            app.session.config().tick.period,
            Duration::from_millis(MAX_PERIOD_MS)
        );
    }

    #[test]
    fn test_frames_follow_damage() {
        let app = app(Duration::from_secs(60));
        assert!(app.next_frame().is_some());
        assert!(app.next_frame().is_none());

        app.session.playfield().write(|state| state.move_vertical(1));
        assert!(app.next_frame().is_some());
        assert!(app.next_frame().is_none());
    }
}
