use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use blockfall_engine::{
    FieldSize, GameConfig, GameSession, PieceSeed, TickConfig, record_final_score,
};
use chrono::Utc;
use rand::Rng as _;

use crate::{
    command::play::app::PlayApp,
    save::{self, SavedGame},
    store::HighScoreStore,
};

mod app;
mod damage;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PlayArg {
    /// Field width in cells
    #[clap(long, default_value_t = 24)]
    pub(crate) width: u8,
    /// Field height in cells
    #[clap(long, default_value_t = 24)]
    pub(crate) height: u8,
    /// Gravity interval in milliseconds
    #[clap(long, default_value_t = 500)]
    pub(crate) period_ms: u64,
    /// Gravity interval after speeding up, until the piece locks
    #[clap(long, default_value_t = 50)]
    pub(crate) fast_period_ms: u64,
    /// Seed for the piece sequence (32 hex digits); random if omitted
    #[clap(long)]
    pub(crate) seed: Option<PieceSeed>,
    /// File the final score is appended to
    #[clap(long, default_value = "./data/highscores.jsonl")]
    pub(crate) scores_file: PathBuf,
    /// Save the game here on quit and resume from it on the next start
    #[clap(long)]
    pub(crate) save_file: Option<PathBuf>,
}

impl PlayArg {
    fn game_config(&self) -> anyhow::Result<GameConfig> {
        let field = FieldSize::new(self.width, self.height).context("Invalid field size")?;
        Ok(GameConfig {
            field,
            tick: TickConfig {
                period: Duration::from_millis(self.period_ms),
                fast_period: Duration::from_millis(self.fast_period_ms),
            },
        })
    }
}

pub(crate) fn run(arg: &PlayArg) -> anyhow::Result<()> {
    let config = arg.game_config()?;
    let seed = arg.seed.unwrap_or_else(|| rand::rng().random());

    let saved = match &arg.save_file {
        Some(path) if path.exists() => Some(save::load(path)?),
        _ => None,
    };
    let (session, score) = match saved {
        Some(saved) => {
            eprintln!(
                "Resuming game saved at {} (score {})",
                saved.saved_at.format("%Y-%m-%d %H:%M:%S"),
                saved.score
            );
            let session = GameSession::restore(config, saved.session, seed)
                .context("Saved game is not a valid session")?;
            (session, saved.score)
        }
        None => (GameSession::new(config, seed), 0),
    };

    let mut app = PlayApp::new(session, score);
    ratatui::run(|terminal| app.run(terminal))?;
    let result = app.finish();

    if result.game_over {
        let mut store = HighScoreStore::new(&arg.scores_file);
        let timestamp_ms = Utc::now().timestamp_millis();
        if record_final_score(&mut store, result.score, timestamp_ms)? {
            eprintln!("Score {} saved to {}", result.score, arg.scores_file.display());
        }
        if let Some(path) = &arg.save_file {
            save::remove(path)?;
        }
    } else if let Some(path) = &arg.save_file {
        let saved = SavedGame {
            saved_at: Utc::now(),
            score: result.score,
            session: result.snapshot,
        };
        save::store(path, &saved)?;
        eprintln!("Game saved to {}", path.display());
    }

    Ok(())
}
