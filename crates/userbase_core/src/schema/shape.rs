//! Structural payload declarations.
//!
//! # Invariants
//! - Field names inside one shape are unique; declaring a name twice keeps
//!   the latest declaration in the original position.
//! - Derived shapes (`pick`, `partial`) never mutate their source.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$",
    )
    .expect("valid email regex")
});
static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:urn:uuid:)?[0-9a-f]{8}-(?:[0-9a-f]{4}-){3}[0-9a-f]{12}$")
        .expect("valid uuid regex")
});

/// JSON value type accepted by one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Format constraint applied to string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Email,
    Uuid,
    /// RFC 3339 timestamp.
    DateTime,
}

impl Format {
    pub fn name(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Uuid => "uuid",
            Self::DateTime => "date-time",
        }
    }

    pub fn matches(self, value: &str) -> bool {
        match self {
            Self::Email => EMAIL_RE.is_match(value),
            Self::Uuid => UUID_RE.is_match(value),
            Self::DateTime => chrono::DateTime::parse_from_rfc3339(value).is_ok(),
        }
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Declaration of one payload field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    name: String,
    kind: FieldType,
    format: Option<Format>,
    required: bool,
    nullable: bool,
}

impl FieldSpec {
    fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
            format: None,
            required: true,
            nullable: false,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    /// Adds a format check. Only string fields carry formats; the call is a
    /// no-op for other types.
    pub fn format(mut self, format: Format) -> Self {
        if self.kind == FieldType::String {
            self.format = Some(format);
        }
        self
    }

    /// Field may be omitted.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Field may be explicitly `null`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldType {
        self.kind
    }

    pub fn format_constraint(&self) -> Option<Format> {
        self.format
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Object-shaped payload declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    fields: Vec<FieldSpec>,
    additional_properties: bool,
}

impl Shape {
    /// Empty object shape that rejects undeclared properties.
    pub fn object() -> Self {
        Self {
            fields: Vec::new(),
            additional_properties: false,
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        match self.fields.iter_mut().find(|f| f.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.fields.push(spec),
        }
        self
    }

    /// Accepts properties that are not declared.
    pub fn allow_additional(mut self) -> Self {
        self.additional_properties = true;
        self
    }

    /// Shape restricted to `names`, in the given order. Unknown names are
    /// skipped.
    pub fn pick(&self, names: &[&str]) -> Self {
        let fields = names
            .iter()
            .filter_map(|name| self.get(name).cloned())
            .collect();
        Self {
            fields,
            additional_properties: self.additional_properties,
        }
    }

    /// Same shape with every field optional.
    pub fn partial(&self) -> Self {
        Self {
            fields: self.fields.iter().cloned().map(FieldSpec::optional).collect(),
            additional_properties: self.additional_properties,
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn allows_additional(&self) -> bool {
        self.additional_properties
    }
}
