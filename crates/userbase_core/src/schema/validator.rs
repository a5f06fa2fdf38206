//! Compiled payload validators.

use super::shape::{FieldSpec, FieldType, Format, Shape};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Why one field failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    NotAnObject,
    MissingRequired,
    WrongType { expected: FieldType, nullable: bool },
    InvalidFormat(Format),
    AdditionalProperty,
}

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Offending field name; empty for payload-level failures.
    pub field: String,
    pub kind: ViolationKind,
}

impl Violation {
    fn new(field: &str, kind: ViolationKind) -> Self {
        Self {
            field: field.to_string(),
            kind,
        }
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ViolationKind::NotAnObject => write!(f, "payload must be an object"),
            ViolationKind::MissingRequired => write!(f, "{}: is required", self.field),
            ViolationKind::WrongType {
                expected,
                nullable: true,
            } => write!(f, "{}: must be {expected} or null", self.field),
            ViolationKind::WrongType { expected, .. } => {
                write!(f, "{}: must be {expected}", self.field)
            }
            ViolationKind::InvalidFormat(format) => {
                write!(f, "{}: must match format `{format}`", self.field)
            }
            ViolationKind::AdditionalProperty => write!(f, "{}: is not allowed", self.field),
        }
    }
}

/// Outcome of applying a validator to one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<Violation>,
}

impl Validation {
    fn from_errors(errors: Vec<Violation>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn into_result(self) -> Result<(), Vec<Violation>> {
        if self.valid {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Immutable validator compiled from a [`Shape`].
#[derive(Debug)]
pub struct Validator {
    key: String,
    shape: Shape,
    declared: BTreeSet<String>,
}

impl Validator {
    pub(crate) fn compile(key: &str, shape: Shape) -> Self {
        let declared = shape.fields().iter().map(|f| f.name().to_string()).collect();
        Self {
            key: key.to_string(),
            shape,
            declared,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Names of the fields a payload may omit.
    pub fn optional_fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.shape
            .fields()
            .iter()
            .filter(|f| !f.is_required())
            .map(FieldSpec::name)
    }

    /// Checks `payload` against the shape and collects every violation.
    pub fn validate(&self, payload: &Value) -> Validation {
        let Some(object) = payload.as_object() else {
            return Validation::from_errors(vec![Violation::new("", ViolationKind::NotAnObject)]);
        };

        let mut errors = Vec::new();
        for spec in self.shape.fields() {
            match object.get(spec.name()) {
                None if spec.is_required() => {
                    errors.push(Violation::new(spec.name(), ViolationKind::MissingRequired));
                }
                None => {}
                Some(value) => {
                    if let Some(kind) = check_value(spec, value) {
                        errors.push(Violation::new(spec.name(), kind));
                    }
                }
            }
        }

        if !self.shape.allows_additional() {
            errors.extend(
                object
                    .keys()
                    .filter(|key| !self.declared.contains(key.as_str()))
                    .map(|key| Violation::new(key, ViolationKind::AdditionalProperty)),
            );
        }

        Validation::from_errors(errors)
    }
}

fn check_value(spec: &FieldSpec, value: &Value) -> Option<ViolationKind> {
    let wrong_type = || ViolationKind::WrongType {
        expected: spec.kind(),
        nullable: spec.is_nullable(),
    };

    if value.is_null() {
        return (!spec.is_nullable()).then(wrong_type);
    }

    let type_ok = match spec.kind() {
        FieldType::String => value.is_string(),
        FieldType::Integer => value.is_i64() || value.is_u64(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
    };
    if !type_ok {
        return Some(wrong_type());
    }

    match (spec.format_constraint(), value.as_str()) {
        (Some(format), Some(text)) if !format.matches(text) => {
            Some(ViolationKind::InvalidFormat(format))
        }
        _ => None,
    }
}
