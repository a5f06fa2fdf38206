//! Resource use-case services.
//!
//! # Responsibility
//! - Expose the CRUD contract of each resource to transport layers.
//! - Keep callers decoupled from storage and naming details.

pub mod resource_service;

pub use resource_service::{
    ErrorKind, ResourceDescriptor, ResourceService, ServiceError, ServiceResult,
};
