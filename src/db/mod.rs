pub mod sqlite;
pub mod repository;

pub use sqlite::*;
pub use repository::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Could not create database directory {path}: {reason}")]
    Directory { path: String, reason: String },

    #[error("Corrupt row {rowid}: {reason}")]
    CorruptRow { rowid: i64, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}
