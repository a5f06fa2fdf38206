//! Generic CRUD service for one resource kind.
//!
//! # Responsibility
//! - Guard the storage boundary: id shape first, payload shape second, then
//!   exactly one storage round-trip per step.
//! - Map every failure to [`ServiceError`].
//!
//! # Invariants
//! - Malformed input never reaches storage.
//! - Storage is only reached through [`TranslatingTable`].
//! - Storage failures are logged once and returned as `Internal` with a
//!   stable code; engine messages never reach the caller.
//! - `update` and `patch` write with a single statement, so a failure leaves
//!   the stored row untouched.

use crate::logging::sanitize_message;
use crate::schema::{ConfigurationError, SchemaRegistry, Validator, Violation};
use crate::store::{Record, StorageTable, StoreError, TranslatingTable};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use log::{debug, error};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

const MAX_PAYLOAD_LOG_CHARS: usize = 256;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Closed set of failure kinds a resource service returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied id or payload is malformed.
    InvalidArgument,
    /// No row matches the id.
    NotFound,
    /// Storage failed unexpectedly.
    Internal,
}

/// Resource service error with its caller-facing detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    InvalidArgument {
        code: String,
        violations: Vec<Violation>,
    },
    NotFound {
        code: String,
        id: String,
    },
    Internal {
        code: String,
    },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code, e.g. `ARG_INVALID_USER_PAYLOAD`.
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidArgument { code, .. }
            | Self::NotFound { code, .. }
            | Self::Internal { code } => code,
        }
    }

    /// Field violations; empty unless the payload failed schema validation.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::InvalidArgument { violations, .. } => violations,
            _ => &[],
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument { code, violations } if violations.is_empty() => {
                write!(f, "{code}")
            }
            Self::InvalidArgument { code, violations } => {
                let details = violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "{code}: {details}")
            }
            Self::NotFound { code, id } => write!(f, "{code}: {id}"),
            Self::Internal { code } => write!(f, "{code}"),
        }
    }
}

impl Error for ServiceError {}

/// Static wiring for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Singular resource name used in error codes and log events.
    pub name: &'static str,
    /// External name of the storage-generated identifier.
    pub id_field: &'static str,
    /// External name of the modification timestamp stamped on writes.
    pub updated_at_field: &'static str,
    pub create_schema: &'static str,
    pub update_schema: &'static str,
    pub patch_schema: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Find,
    Get,
    Create,
    Update,
    Patch,
    Remove,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Patch => "patch",
            Self::Remove => "remove",
        }
    }
}

/// CRUD service composing validation, naming translation and storage.
pub struct ResourceService<S: StorageTable> {
    table: TranslatingTable<S>,
    descriptor: ResourceDescriptor,
    create_validator: Arc<Validator>,
    update_validator: Arc<Validator>,
    patch_validator: Arc<Validator>,
}

impl<S: StorageTable> ResourceService<S> {
    /// Wires a service over `table`, resolving its validators from
    /// `registry` up front.
    ///
    /// # Errors
    /// - `ConfigurationError` when any of the descriptor's schema keys is not
    ///   registered.
    pub fn new(
        table: S,
        registry: &SchemaRegistry,
        descriptor: ResourceDescriptor,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            table: TranslatingTable::new(table),
            create_validator: registry.lookup(descriptor.create_schema)?,
            update_validator: registry.lookup(descriptor.update_schema)?,
            patch_validator: registry.lookup(descriptor.patch_schema)?,
            descriptor,
        })
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// Returns the underlying storage table.
    pub fn storage(&self) -> &S {
        self.table.inner()
    }

    /// Lists every row of the resource table.
    pub fn find(&self) -> ServiceResult<Vec<Record>> {
        self.table
            .select_all()
            .map_err(|err| self.internal(Operation::Find, None, None, &err))
    }

    /// Returns the row identified by `id`.
    pub fn get(&self, id: &str) -> ServiceResult<Record> {
        self.check_id(id)?;
        self.fetch(Operation::Get, id)
    }

    /// Inserts a row from `payload` and returns it with generated fields.
    pub fn create(&self, payload: &Value) -> ServiceResult<Record> {
        let values = self.check_payload(&self.create_validator, payload)?;
        self.table
            .insert_returning(&values)
            .map_err(|err| self.internal(Operation::Create, None, Some(payload), &err))
    }

    /// Replaces the row identified by `id`.
    ///
    /// Every optional field of the update shape that `payload` omits is
    /// written as null.
    pub fn update(&self, id: &str, payload: &Value) -> ServiceResult<Record> {
        self.check_id(id)?;
        let values = self.check_payload(&self.update_validator, payload)?;
        let existing = self.fetch(Operation::Update, id)?;

        let stamp = self.next_updated_at(&existing);
        let mut merged = existing;
        for field in self.update_validator.optional_fields() {
            merged.insert(field.to_string(), Value::Null);
        }
        merged.extend(values);
        merged.insert(self.descriptor.updated_at_field.to_string(), stamp);
        merged.remove(self.descriptor.id_field);

        self.write(Operation::Update, id, &merged, payload)
    }

    /// Overwrites only the fields present in `payload` on the row identified
    /// by `id`.
    pub fn patch(&self, id: &str, payload: &Value) -> ServiceResult<Record> {
        self.check_id(id)?;
        let mut changes = self.check_payload(&self.patch_validator, payload)?;
        let existing = self.fetch(Operation::Patch, id)?;

        changes.insert(
            self.descriptor.updated_at_field.to_string(),
            self.next_updated_at(&existing),
        );

        self.write(Operation::Patch, id, &changes, payload)
    }

    /// Deletes the row identified by `id` and returns it.
    pub fn remove(&self, id: &str) -> ServiceResult<Record> {
        self.check_id(id)?;
        let rows = self
            .table
            .delete_by_id_returning(id)
            .map_err(|err| self.internal(Operation::Remove, Some(id), None, &err))?;
        self.first_or_not_found(rows, id)
    }

    fn fetch(&self, op: Operation, id: &str) -> ServiceResult<Record> {
        let rows = self
            .table
            .select_by_id(id)
            .map_err(|err| self.internal(op, Some(id), None, &err))?;
        self.first_or_not_found(rows, id)
    }

    fn write(
        &self,
        op: Operation,
        id: &str,
        values: &Record,
        payload: &Value,
    ) -> ServiceResult<Record> {
        let rows = self
            .table
            .update_by_id_returning(id, values)
            .map_err(|err| self.internal(op, Some(id), Some(payload), &err))?;
        self.first_or_not_found(rows, id)
    }

    fn first_or_not_found(&self, rows: Vec<Record>, id: &str) -> ServiceResult<Record> {
        rows.into_iter().next().ok_or_else(|| ServiceError::NotFound {
            code: format!("{}_NOT_FOUND", self.upper_name()),
            id: id.to_string(),
        })
    }

    fn check_id(&self, id: &str) -> ServiceResult<()> {
        if id.is_empty() {
            debug!(
                "event={}_id module=service status=rejected reason=empty_id",
                self.descriptor.name
            );
            return Err(ServiceError::InvalidArgument {
                code: format!("ARG_INVALID_{}_ID", self.upper_name()),
                violations: Vec::new(),
            });
        }
        Ok(())
    }

    fn check_payload(&self, validator: &Validator, payload: &Value) -> ServiceResult<Record> {
        let outcome = validator.validate(payload);
        if !outcome.valid {
            debug!(
                "event={}_payload module=service status=rejected schema={} violations={}",
                self.descriptor.name,
                validator.key(),
                outcome.errors.len()
            );
            return Err(ServiceError::InvalidArgument {
                code: format!("ARG_INVALID_{}_PAYLOAD", self.upper_name()),
                violations: outcome.errors,
            });
        }
        Ok(payload.as_object().cloned().unwrap_or_default())
    }

    /// Next modification stamp: now, but always strictly after the stored one.
    fn next_updated_at(&self, existing: &Record) -> Value {
        let now = Utc::now();
        let floor = existing
            .get(self.descriptor.updated_at_field)
            .and_then(Value::as_str)
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            .map(|prior| prior.with_timezone(&Utc) + Duration::milliseconds(1));
        let stamp = match floor {
            Some(floor) if floor > now => floor,
            _ => now,
        };
        Value::String(stamp.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    fn internal(
        &self,
        op: Operation,
        id: Option<&str>,
        payload: Option<&Value>,
        err: &StoreError,
    ) -> ServiceError {
        let code = format!(
            "DB_ERROR_{}_{}",
            op.as_str().to_ascii_uppercase(),
            self.upper_name()
        );
        let payload = payload
            .map(|value| sanitize_message(&value.to_string(), MAX_PAYLOAD_LOG_CHARS))
            .unwrap_or_else(|| "-".to_string());
        error!(
            "event={}_{} module=service status=error error_code={} id={} payload={} error={}",
            self.descriptor.name,
            op.as_str(),
            code,
            id.unwrap_or("-"),
            payload,
            sanitize_message(&err.to_string(), MAX_PAYLOAD_LOG_CHARS)
        );
        ServiceError::Internal { code }
    }

    fn upper_name(&self) -> String {
        self.descriptor.name.to_ascii_uppercase()
    }
}
