use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{PlayerRecord, RecordSource};

/// Reads players from a JSON array of
/// `{ "id", "name", "position", "photo_path" }` objects.
pub struct JsonSource {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    id: RawId,
    name: String,
    position: String,
    photo_path: String,
}

impl JsonSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl RecordSource for JsonSource {
    fn fetch_all(&self) -> Result<Vec<PlayerRecord>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read records: {}", self.path.display()))?;
        let raw: Vec<RawRecord> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse records: {}", self.path.display()))?;
        Ok(raw
            .into_iter()
            .map(|record| PlayerRecord {
                id: match record.id {
                    RawId::Int(value) => value.to_string(),
                    RawId::Text(value) => value,
                },
                name: record.name,
                position: record.position,
                photo_path: PathBuf::from(record.photo_path),
            })
            .collect())
    }
}
