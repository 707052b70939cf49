use std::path::PathBuf;

use blockfall_engine::ScoreRecord;
use chrono::{DateTime, Local};

use crate::store::HighScoreStore;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ScoresArg {
    /// File the scores are read from
    #[clap(long, default_value = "./data/highscores.jsonl")]
    scores_file: PathBuf,
    /// Maximum number of scores to show
    #[clap(long, default_value_t = 10)]
    limit: usize,
}

pub(crate) fn run(arg: &ScoresArg) -> anyhow::Result<()> {
    let ScoresArg { scores_file, limit } = arg;

    let store = HighScoreStore::new(scores_file);
    let records = store.top_scores(*limit)?;
    if records.is_empty() {
        eprintln!("No scores recorded yet in {}", store.path().display());
        return Ok(());
    }

    println!("{:>4}  {:>8}  DATE", "RANK", "SCORE");
    for (rank, record) in records.iter().enumerate() {
        println!("{}", format_row(rank + 1, record));
    }
    Ok(())
}

fn format_row(rank: usize, record: &ScoreRecord) -> String {
    let date = DateTime::from_timestamp_millis(record.timestamp_ms).map_or_else(
        || "(invalid date)".to_owned(),
        |date| {
            date.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    );
    format!("{rank:>4}  {:>8}  {date}", record.score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_row() {
        let row = format_row(
            3,
            &ScoreRecord {
                timestamp_ms: 0,
                score: 120,
            },
        );
        assert!(row.starts_with("   3       120  19"), "{row}");

        let row = format_row(
            1,
            &ScoreRecord {
                timestamp_ms: i64::MAX,
                score: 5,
            },
        );
        assert!(row.ends_with("(invalid date)"), "{row}");
    }
}
