//! Storage table contracts and implementations.
//!
//! # Responsibility
//! - Define the one query interface a resource service needs from storage.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Rows crossing [`StorageTable`] use storage column names; only
//!   [`TranslatingTable`] speaks external field names.
//! - By-id operations return every matched row, so an empty result is a
//!   distinct outcome from an error.

use crate::db::DbError;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod sqlite;
pub mod translated;

pub use sqlite::SqliteTable;
pub use translated::TranslatingTable;

/// One row or payload, keyed by field/column name.
pub type Record = Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure raised by a storage table.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingTable(String),
    MissingPrimaryKey(String),
    UnknownColumn {
        table: String,
        column: String,
    },
    UnsupportedValue {
        column: String,
    },
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingTable(table) => write!(f, "table `{table}` does not exist"),
            Self::MissingPrimaryKey(table) => {
                write!(f, "table `{table}` has no single-column primary key")
            }
            Self::UnknownColumn { table, column } => {
                write!(f, "table `{table}` has no column `{column}`")
            }
            Self::UnsupportedValue { column } => {
                write!(f, "column `{column}` only accepts scalar values")
            }
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query interface bound to one table, in storage naming.
pub trait StorageTable {
    fn select_all(&self) -> StoreResult<Vec<Record>>;
    fn select_by_id(&self, id: &str) -> StoreResult<Vec<Record>>;
    /// Inserts one row and returns it as stored, generated columns included.
    fn insert_returning(&self, values: &Record) -> StoreResult<Record>;
    fn update_by_id_returning(&self, id: &str, values: &Record) -> StoreResult<Vec<Record>>;
    fn delete_by_id_returning(&self, id: &str) -> StoreResult<Vec<Record>>;
}

impl<T: StorageTable + ?Sized> StorageTable for &T {
    fn select_all(&self) -> StoreResult<Vec<Record>> {
        (**self).select_all()
    }

    fn select_by_id(&self, id: &str) -> StoreResult<Vec<Record>> {
        (**self).select_by_id(id)
    }

    fn insert_returning(&self, values: &Record) -> StoreResult<Record> {
        (**self).insert_returning(values)
    }

    fn update_by_id_returning(&self, id: &str, values: &Record) -> StoreResult<Vec<Record>> {
        (**self).update_by_id_returning(id, values)
    }

    fn delete_by_id_returning(&self, id: &str) -> StoreResult<Vec<Record>> {
        (**self).delete_by_id_returning(id)
    }
}
