use std::{
    cmp::Reverse,
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use blockfall_engine::{ScoreRecord, ScoreSink};

use crate::util;

/// Append-only JSON-lines file of final scores.
#[derive(Debug, Clone)]
pub struct HighScoreStore {
    path: PathBuf,
}

impl HighScoreStore {
    pub fn new<P>(path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record. A missing file holds no scores.
    pub fn load(&self) -> anyhow::Result<Vec<ScoreRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to open scores file: {}", self.path.display())
                });
            }
        };
        parse_records(BufReader::new(file))
            .with_context(|| format!("Failed to read scores file: {}", self.path.display()))
    }

    /// Best `limit` records, highest score first.
    pub fn top_scores(&self, limit: usize) -> anyhow::Result<Vec<ScoreRecord>> {
        let mut records = self.load()?;
        rank(&mut records);
        records.truncate(limit);
        Ok(records)
    }
}

impl ScoreSink for HighScoreStore {
    type Error = anyhow::Error;

    fn append(&mut self, record: ScoreRecord) -> anyhow::Result<()> {
        util::create_parent_dir(&self.path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open scores file: {}", self.path.display()))?;
        let mut line = serde_json::to_vec(&record).context("Failed to encode score record")?;
        line.push(b'\n');
        file.write_all(&line)
            .with_context(|| format!("Failed to append to scores file: {}", self.path.display()))?;
        Ok(())
    }
}

pub fn parse_records<R>(reader: R) -> anyhow::Result<Vec<ScoreRecord>>
where
    R: BufRead,
{
    let mut records = vec![];
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("Failed to read line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .with_context(|| format!("Invalid score record at line {line_no}"))?;
        records.push(record);
    }
    Ok(records)
}

/// Sorts by score descending; equal scores keep the earlier one first.
pub fn rank(records: &mut [ScoreRecord]) {
    records.sort_by_key(|r| (Reverse(r.score), r.timestamp_ms));
}
