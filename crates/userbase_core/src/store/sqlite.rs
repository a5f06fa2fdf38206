//! SQLite implementation of [`StorageTable`].
//!
//! # Responsibility
//! - Build parameterized SQL for one table from storage column names.
//! - Convert between SQLite values and JSON scalars.
//!
//! # Invariants
//! - Column names are checked against the live table definition before any
//!   statement is prepared; values are always bound, never inlined.
//! - Write statements use `RETURNING *`, so the returned rows are exactly
//!   what the single atomic statement wrote or removed.

use super::{Record, StorageTable, StoreError, StoreResult};
use crate::db::migrations::{current_version, latest_version};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Number, Value};
use std::collections::BTreeSet;

/// SQLite-backed table handle.
pub struct SqliteTable<'conn> {
    conn: &'conn Connection,
    table: String,
    primary_key: String,
    columns: BTreeSet<String>,
}

impl<'conn> SqliteTable<'conn> {
    /// Binds to `table` on a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingTable` when `table` does not exist.
    /// - `MissingPrimaryKey` when the table lacks a single-column primary key.
    pub fn try_new(conn: &'conn Connection, table: &str) -> StoreResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_version(conn)?;
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        let mut stmt = conn.prepare("SELECT name, pk FROM pragma_table_info(?1);")?;
        let mut rows = stmt.query([table])?;
        let mut columns = BTreeSet::new();
        let mut key_columns = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            if row.get::<_, i64>(1)? > 0 {
                key_columns.push(name.clone());
            }
            columns.insert(name);
        }

        if columns.is_empty() {
            return Err(StoreError::MissingTable(table.to_string()));
        }
        let primary_key = match key_columns.as_slice() {
            [single] => single.clone(),
            _ => return Err(StoreError::MissingPrimaryKey(table.to_string())),
        };

        Ok(Self {
            conn,
            table: table.to_string(),
            primary_key,
            columns,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn checked_column<'a>(&self, column: &'a str) -> StoreResult<&'a str> {
        if self.columns.contains(column) {
            Ok(column)
        } else {
            Err(StoreError::UnknownColumn {
                table: self.table.clone(),
                column: column.to_string(),
            })
        }
    }

    fn query_rows(&self, sql: &str, params: Vec<SqlValue>) -> StoreResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.query(params_from_iter(params))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (index, name) in names.iter().enumerate() {
                let value = json_from_sql(row.get_ref(index)?, name)?;
                record.insert(name.clone(), value);
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Splits `values` into quoted column names and bound parameters.
    fn bind_columns(&self, values: &Record) -> StoreResult<(Vec<String>, Vec<SqlValue>)> {
        let mut columns = Vec::with_capacity(values.len());
        let mut params = Vec::with_capacity(values.len() + 1);
        for (column, value) in values {
            columns.push(quote_ident(self.checked_column(column)?));
            params.push(sql_from_json(value, column)?);
        }
        Ok((columns, params))
    }
}

impl StorageTable for SqliteTable<'_> {
    fn select_all(&self) -> StoreResult<Vec<Record>> {
        let sql = format!("SELECT * FROM {};", quote_ident(&self.table));
        self.query_rows(&sql, Vec::new())
    }

    fn select_by_id(&self, id: &str) -> StoreResult<Vec<Record>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1;",
            quote_ident(&self.table),
            quote_ident(&self.primary_key)
        );
        self.query_rows(&sql, vec![SqlValue::Text(id.to_string())])
    }

    fn insert_returning(&self, values: &Record) -> StoreResult<Record> {
        let (columns, params) = self.bind_columns(values)?;
        let sql = if columns.is_empty() {
            format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING *;",
                quote_ident(&self.table)
            )
        } else {
            let placeholders = (1..=columns.len())
                .map(|index| format!("?{index}"))
                .collect::<Vec<_>>();
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *;",
                quote_ident(&self.table),
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        self.query_rows(&sql, params)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                StoreError::InvalidData(format!("insert into `{}` returned no row", self.table))
            })
    }

    fn update_by_id_returning(&self, id: &str, values: &Record) -> StoreResult<Vec<Record>> {
        if values.is_empty() {
            return self.select_by_id(id);
        }

        let (columns, mut params) = self.bind_columns(values)?;
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>();
        params.push(SqlValue::Text(id.to_string()));

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{} RETURNING *;",
            quote_ident(&self.table),
            assignments.join(", "),
            quote_ident(&self.primary_key),
            params.len()
        );
        self.query_rows(&sql, params)
    }

    fn delete_by_id_returning(&self, id: &str) -> StoreResult<Vec<Record>> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1 RETURNING *;",
            quote_ident(&self.table),
            quote_ident(&self.primary_key)
        );
        self.query_rows(&sql, vec![SqlValue::Text(id.to_string())])
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_from_json(value: &Value, column: &str) -> StoreResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(*flag))),
        Value::Number(number) => match number.as_i64() {
            Some(int) => Ok(SqlValue::Integer(int)),
            None => number
                .as_f64()
                .map(SqlValue::Real)
                .ok_or_else(|| StoreError::UnsupportedValue {
                    column: column.to_string(),
                }),
        },
        Value::String(text) => Ok(SqlValue::Text(text.clone())),
        Value::Array(_) | Value::Object(_) => Err(StoreError::UnsupportedValue {
            column: column.to_string(),
        }),
    }
}

fn json_from_sql(value: ValueRef<'_>, column: &str) -> StoreResult<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(int) => Ok(Value::from(int)),
        ValueRef::Real(real) => Number::from_f64(real).map(Value::Number).ok_or_else(|| {
            StoreError::InvalidData(format!("non-finite real in column `{column}`"))
        }),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|text| Value::String(text.to_string()))
            .map_err(|_| StoreError::InvalidData(format!("non-utf8 text in column `{column}`"))),
        ValueRef::Blob(_) => Err(StoreError::InvalidData(format!(
            "blob in column `{column}` has no record representation"
        ))),
    }
}
