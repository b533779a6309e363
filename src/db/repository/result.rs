use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db::DatabaseError;
use crate::models::{Entities, ResultRecord};

/// A stored result together with its SQLite rowid.
#[derive(Debug, Clone)]
pub struct StoredResult {
    pub rowid: i64,
    pub record: ResultRecord,
}

/// Append one result row. Returns the new rowid.
/// Rows are never updated or deleted through this module.
pub fn insert_result(conn: &Connection, record: &ResultRecord) -> Result<i64, DatabaseError> {
    let entities = json_column(record.entities.as_ref())?;

    conn.execute(
        "INSERT INTO results (filename, raw_text, translated_text, transliteration, meaning,
         entities, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.filename,
            record.raw_text,
            record.translated_text,
            record.transliteration,
            record.meaning,
            entities,
            record.timestamp.to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Encode an optional value for a JSON text column. `None` stays NULL.
fn json_column<T: Serialize>(value: Option<&T>) -> Result<Option<String>, DatabaseError> {
    value
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| DatabaseError::Serialization(format!("entities not serializable: {e}")))
}

/// Most recent results first, by insertion order.
pub fn list_recent_results(
    conn: &Connection,
    limit: usize,
) -> Result<Vec<StoredResult>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT rowid, filename, raw_text, translated_text, transliteration, meaning,
         entities, timestamp
         FROM results ORDER BY rowid DESC LIMIT ?1",
    )?;

    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut results = Vec::with_capacity(rows.len());
    for (rowid, filename, raw, translated, translit, meaning, entities, timestamp) in rows {
        let entities = match entities.filter(|e| !e.is_empty()) {
            Some(json) => Some(serde_json::from_str::<Entities>(&json).map_err(|e| {
                DatabaseError::CorruptRow {
                    rowid,
                    reason: format!("entities: {e}"),
                }
            })?),
            None => None,
        };

        let timestamp = timestamp.unwrap_or_default();
        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| DatabaseError::CorruptRow {
                rowid,
                reason: format!("timestamp '{timestamp}': {e}"),
            })?;

        results.push(StoredResult {
            rowid,
            record: ResultRecord {
                filename: filename.unwrap_or_default(),
                raw_text: raw.unwrap_or_default(),
                translated_text: translated.unwrap_or_default(),
                transliteration: translit.unwrap_or_default(),
                meaning: meaning.unwrap_or_default(),
                entities,
                timestamp,
            },
        });
    }

    Ok(results)
}

pub fn count_results(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;
    Ok(count)
}
