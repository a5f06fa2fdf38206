//! Resource service core for userbase.
//!
//! Validates payloads against registered schemas, translates field names
//! between the external camelCase and storage snake_case conventions, and
//! exposes a uniform CRUD contract over one SQLite table per resource.

pub mod db;
pub mod logging;
pub mod model;
pub mod naming;
pub mod schema;
pub mod service;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::user::{register_schemas, user_descriptor, User, USER_TABLE};
pub use schema::{ConfigurationError, SchemaRegistry, Validation, Violation, ViolationKind};
pub use service::{ErrorKind, ResourceDescriptor, ResourceService, ServiceError, ServiceResult};
pub use store::{Record, SqliteTable, StorageTable, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Registry holding every payload schema known to this crate.
pub fn default_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    register_schemas(&mut registry);
    registry
}
