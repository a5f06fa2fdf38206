//! Named payload schemas and their validators.
//!
//! # Responsibility
//! - Hold one compiled validator per schema key (`UserCreate`, ...).
//! - Keep "is this key wired" separate from "does this payload conform".
//!
//! # Invariants
//! - Registration happens at startup; afterwards the registry is only read.
//! - A missing key is a wiring bug and surfaces as [`ConfigurationError`],
//!   never as a payload violation.

use log::{debug, error};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod shape;
pub mod validator;

pub use shape::{FieldSpec, FieldType, Format, Shape};
pub use validator::{Validation, Validator, Violation, ViolationKind};

/// Startup wiring failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    SchemaNotRegistered(String),
}

impl ConfigurationError {
    /// Stable identifier for logs and operator output.
    pub fn code(&self) -> String {
        match self {
            Self::SchemaNotRegistered(key) => format!("SCHEMA_KEY_INVALID_{key}"),
        }
    }
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SchemaNotRegistered(key) => write!(f, "schema key not registered: `{key}`"),
        }
    }
}

impl Error for ConfigurationError {}

/// Key to validator mapping built once per process.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    validators: BTreeMap<String, Arc<Validator>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `shape` and stores it under `key`, replacing any previous
    /// registration.
    pub fn register(&mut self, shape: Shape, key: &str) {
        let replaced = self
            .validators
            .insert(key.to_string(), Arc::new(Validator::compile(key, shape)))
            .is_some();
        debug!("event=schema_register module=schema status=ok key={key} replaced={replaced}");
    }

    /// Returns the validator registered under `key`.
    ///
    /// # Errors
    /// - `SchemaNotRegistered` when `key` was never registered.
    pub fn lookup(&self, key: &str) -> Result<Arc<Validator>, ConfigurationError> {
        match self.validators.get(key) {
            Some(validator) => Ok(Arc::clone(validator)),
            None => {
                error!(
                    "event=schema_lookup module=schema status=error error_code=schema_key_invalid key={key}"
                );
                Err(ConfigurationError::SchemaNotRegistered(key.to_string()))
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.validators.contains_key(key)
    }

    /// Returns registered keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.validators.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
