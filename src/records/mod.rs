mod json;
mod sqlite;

use anyhow::Result;
use std::path::PathBuf;

pub use json::JsonSource;
pub use sqlite::{DEFAULT_QUERY, SqliteSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    pub position: String,
    pub photo_path: PathBuf,
}

impl PlayerRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        position: impl Into<String>,
        photo_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position: position.into(),
            photo_path: photo_path.into(),
        }
    }

    /// File name for the annotated card, `<id>.png` with unsafe characters
    /// replaced.
    pub fn output_file_name(&self) -> String {
        format!("{}.png", sanitize_filename_component(&self.id))
    }
}

/// Anything that can hand over the full list of players to annotate.
pub trait RecordSource {
    fn fetch_all(&self) -> Result<Vec<PlayerRecord>>;
}

impl RecordSource for Vec<PlayerRecord> {
    fn fetch_all(&self) -> Result<Vec<PlayerRecord>> {
        Ok(self.clone())
    }
}

fn sanitize_filename_component(value: &str) -> String {
    let mut out = String::new();
    for ch in value.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        "record".to_string()
    } else {
        out
    }
}
