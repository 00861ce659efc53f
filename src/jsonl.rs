//! Line-delimited JSON: one record per line, blank lines ignored on read.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{QacurateError, Result};

/// Read every record of a JSON-lines file.
///
/// Parse failures report the 1-based line number.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let mut records = Vec::new();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            QacurateError::InvalidInput(format!("{}:{}: {}", path.display(), idx + 1, e))
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Serialize one record as a single JSON line, newline included.
pub fn to_line<T: Serialize>(record: &T) -> Result<String> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    Ok(line)
}

/// Write records to `path`, replacing any existing content.
pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let file = File::create(path)?;
    write_records(file, records)
}

/// Append records to `path`, creating it if needed.
pub fn append_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    write_records(file, records)
}

fn write_records<T: Serialize>(file: File, records: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(file);
    for record in records {
        writer.write_all(to_line(record)?.as_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Number of non-blank lines in a file; 0 if it does not exist.
pub fn count_records(path: &Path) -> Result<usize> {
    if !path.is_file() {
        return Ok(0);
    }
    let file = File::open(path)?;
    let mut n = 0;
    for line in BufReader::new(file).lines() {
        if !line?.trim().is_empty() {
            n += 1;
        }
    }
    Ok(n)
}
