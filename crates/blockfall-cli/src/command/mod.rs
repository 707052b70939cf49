use clap::{Parser, Subcommand};

use self::{play::PlayArg, scores::ScoresArg};

mod play;
mod scores;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None, args_conflicts_with_subcommands = true)]
pub struct CommandArgs {
    /// What mode to run the program in (defaults to `play`)
    #[command(subcommand)]
    mode: Option<Mode>,
    #[clap(flatten)]
    play: PlayArg,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Play a game in the terminal
    Play(#[clap(flatten)] PlayArg),
    /// List recorded high scores
    Scores(#[clap(flatten)] ScoresArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode.unwrap_or(Mode::Play(args.play)) {
        Mode::Play(arg) => play::run(&arg)?,
        Mode::Scores(arg) => scores::run(&arg)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn test_command_args() {
        CommandArgs::command().debug_assert();
    }

    #[test]
    fn test_play_is_default_mode() {
        let args = CommandArgs::try_parse_from(["blockfall", "--width", "12"]).unwrap();
        assert!(args.mode.is_none());
        assert_eq!(args.play.width, 12);

        let args = CommandArgs::try_parse_from(["blockfall", "scores", "--limit", "3"]).unwrap();
        assert!(matches!(args.mode, Some(Mode::Scores(_))));
    }
}
