//! User resource model.
//!
//! # Invariants
//! - `id` is generated by storage and never accepted in payloads.
//! - `email` is unique; uniqueness is enforced by storage only.
//! - `updated_at >= created_at`.
//! - Payload shapes reject undeclared fields, so `id`, `createdAt` and
//!   `updatedAt` can only be written by storage defaults or the service.

use crate::schema::{FieldSpec, Format, SchemaRegistry, Shape};
use crate::service::resource_service::ResourceDescriptor;
use crate::store::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Storage table holding users.
pub const USER_TABLE: &str = "users";

pub const USER_CREATE_SCHEMA: &str = "UserCreate";
pub const USER_UPDATE_SCHEMA: &str = "UserUpdate";
pub const USER_PATCH_SCHEMA: &str = "UserPatch";

/// Fields a caller may supply.
const WRITABLE_FIELDS: &[&str] = &["email", "firstName", "lastName"];

/// Typed view of one stored user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Parses a record returned by the resource service.
    pub fn from_record(record: Record) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(record))
    }
}

/// Full record shape as returned from storage.
pub fn user_shape() -> Shape {
    Shape::object()
        .field(FieldSpec::string("id").format(Format::Uuid))
        .field(FieldSpec::string("email").format(Format::Email))
        .field(FieldSpec::string("firstName").optional().nullable())
        .field(FieldSpec::string("lastName").optional().nullable())
        .field(FieldSpec::string("createdAt").format(Format::DateTime))
        .field(FieldSpec::string("updatedAt").format(Format::DateTime))
}

/// Payload accepted by `create`.
pub fn user_create_shape() -> Shape {
    user_shape().pick(WRITABLE_FIELDS)
}

/// Payload accepted by `update`; full replacement uses the create shape.
pub fn user_update_shape() -> Shape {
    user_create_shape()
}

/// Payload accepted by `patch`.
pub fn user_patch_shape() -> Shape {
    user_create_shape().partial()
}

/// Registers the user payload schemas.
pub fn register_schemas(registry: &mut SchemaRegistry) {
    registry.register(user_create_shape(), USER_CREATE_SCHEMA);
    registry.register(user_update_shape(), USER_UPDATE_SCHEMA);
    registry.register(user_patch_shape(), USER_PATCH_SCHEMA);
}

/// Resource descriptor wiring the user schemas into a resource service.
pub fn user_descriptor() -> ResourceDescriptor {
    ResourceDescriptor {
        name: "user",
        id_field: "id",
        updated_at_field: "updatedAt",
        create_schema: USER_CREATE_SCHEMA,
        update_schema: USER_UPDATE_SCHEMA,
        patch_schema: USER_PATCH_SCHEMA,
    }
}
