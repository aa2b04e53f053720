use anyhow::{Context, Result, anyhow};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};

use super::{PlayerRecord, RecordSource};

pub const DEFAULT_QUERY: &str = "SELECT player_id, name, position, photo_path FROM players";

/// Reads players from a SQLite database. The query must yield the identifier,
/// name, position and photo path columns in that order.
pub struct SqliteSource {
    conn: Connection,
    query: String,
}

impl SqliteSource {
    pub fn open(path: &Path, query: Option<&str>) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!("database not found: {}", path.display()));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("failed to open database: {}", path.display()))?;
        Ok(Self::from_connection(conn, query))
    }

    pub fn from_connection(conn: Connection, query: Option<&str>) -> Self {
        let query = query
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_QUERY)
            .to_string();
        Self { conn, query }
    }
}

impl RecordSource for SqliteSource {
    fn fetch_all(&self) -> Result<Vec<PlayerRecord>> {
        let mut stmt = self
            .conn
            .prepare(&self.query)
            .with_context(|| format!("failed to prepare query: {}", self.query))?;
        if stmt.column_count() < 4 {
            return Err(anyhow!(
                "query must return 4 columns (id, name, position, photo path), got {}",
                stmt.column_count()
            ));
        }
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    read_id(row)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .with_context(|| "failed to query players")?;

        let mut records = Vec::new();
        for row in rows {
            let (id, name, position, photo_path) = row.with_context(|| "failed to read player row")?;
            let id = id.ok_or_else(|| anyhow!("player row with NULL identifier: {}", name))?;
            records.push(PlayerRecord {
                id,
                name,
                position,
                photo_path: PathBuf::from(photo_path),
            });
        }
        Ok(records)
    }
}

fn read_id(row: &Row<'_>) -> rusqlite::Result<Option<String>> {
    let id = match row.get_ref(0)? {
        ValueRef::Null => None,
        ValueRef::Integer(value) => Some(value.to_string()),
        ValueRef::Real(value) => Some(value.to_string()),
        ValueRef::Text(value) | ValueRef::Blob(value) => {
            Some(String::from_utf8_lossy(value).to_string())
        }
    };
    Ok(id)
}
