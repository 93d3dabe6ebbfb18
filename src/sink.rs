use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::record::Record;

/// Local timestamp for output filenames, colons replaced so the name is
/// valid everywhere: `2026-08-28 14-03-07.123456`.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H-%M-%S%.6f").to_string()
}

/// Fresh-per-run text sink: the concatenated one-line renderings, trimmed of
/// leading and trailing newlines.
pub fn write_txt(records: &[Record], path: &Path) -> Result<()> {
    let text: String = records.iter().map(Record::to_string).collect();
    fs::write(path, text.trim_matches('\n'))
        .with_context(|| format!("writing text sink {}", path.display()))
}

/// Append-merge JSON sink: load whatever array already sits at `path`,
/// extend it with the new records, rewrite the whole array pretty-printed.
/// With per-run timestamped filenames the load always sees an empty file,
/// but a fixed shared path keeps prior entries intact.
pub fn write_json(records: &[Record], path: &Path) -> Result<()> {
    let mut entries: Vec<serde_json::Value> = match fs::read_to_string(path) {
        Ok(existing) if !existing.trim().is_empty() => serde_json::from_str(&existing)
            .with_context(|| format!("existing {} is not a JSON array", path.display()))?,
        _ => Vec::new(),
    };

    for record in records {
        entries.push(serde_json::to_value(record)?);
    }

    let body = serde_json::to_string_pretty(&entries)?;
    fs::write(path, body).with_context(|| format!("writing json sink {}", path.display()))
}
