//! Resource models and their payload shapes.
//!
//! # Responsibility
//! - Declare each resource's record shape and the payload shapes derived
//!   from it.
//! - Register those shapes with the schema registry at startup.

pub mod user;
