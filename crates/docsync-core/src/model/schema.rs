//! Required-attribute schema and type checking
//!
//! A model type may declare a set of required attributes, each with a
//! [`TypeTag`]. Every attribute batch is checked against it before commit.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::errors::{DocSyncError, Result};

/// Closed set of attribute type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Boolean,
    /// RFC 3339 timestamp carried as a JSON string
    Date,
    Array,
    Number,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Boolean => "boolean",
            TypeTag::Date => "date",
            TypeTag::Array => "array",
            TypeTag::Number => "number",
        }
    }

    /// Whether `value` has the runtime type this tag names
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            TypeTag::String => value.is_string(),
            TypeTag::Boolean => value.is_boolean(),
            TypeTag::Date => value
                .as_str()
                .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok()),
            TypeTag::Array => value.is_array(),
            TypeTag::Number => value.is_number(),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = DocSyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(TypeTag::String),
            "boolean" => Ok(TypeTag::Boolean),
            "date" => Ok(TypeTag::Date),
            "array" => Ok(TypeTag::Array),
            "number" => Ok(TypeTag::Number),
            _ => Err(DocSyncError::UnknownTypeTag { tag: s.to_string() }),
        }
    }
}

/// Check one value against a type tag
///
/// `None` stands for an unset attribute and never matches.
///
/// # Errors
/// * `TypeMismatch` - naming the attribute, the expected tag and the value
pub fn validate(
    tag: TypeTag,
    value: Option<&Value>,
    attribute: &str,
    type_name: &str,
) -> Result<()> {
    if value.is_some_and(|v| tag.matches(v)) {
        return Ok(());
    }
    Err(DocSyncError::TypeMismatch {
        attribute: attribute.to_string(),
        type_name: type_name.to_string(),
        expected: tag,
        found: value.map_or_else(|| "undefined".to_string(), render_found),
    })
}

fn render_found(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
