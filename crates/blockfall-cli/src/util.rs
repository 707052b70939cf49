use std::{
    fs::{self, File},
    io::{self, BufWriter, Write as _},
    path::Path,
};

use anyhow::Context;

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Writes `value` as pretty JSON, creating parent directories as needed.
pub fn write_json_file<T, P>(file_kind: &str, path: P, value: &T) -> anyhow::Result<()>
where
    T: serde::Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    create_parent_dir(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create {} file: {}", file_kind, path.display()))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).with_context(|| {
        format!(
            "Failed to write {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;
    writeln!(writer)
        .and_then(|()| writer.flush())
        .with_context(|| format!("Failed to flush {} file: {}", file_kind, path.display()))?;

    Ok(())
}

pub fn create_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("blockfall-test-{}", std::process::id()))
        .join(name)
}
