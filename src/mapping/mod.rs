//! Mapping rule set and field mapper.
//!
//! A [`MappingRules`] value describes how to derive a node's id, name,
//! geometry, and data payload from a raw record. It is constructed once from
//! CLI/config input and treated as read-only for the whole run; the enum
//! shapes make conflicting rules (a fixed value *and* a field name for the
//! same target) unrepresentable.
//!
//! ## Example
//!
//! ```rust,ignore
//! use nodeload::mapping::{FieldSource, GeometrySource, MappingRules};
//!
//! let rules = MappingRules {
//!     id: Some(FieldSource::Field("id".into())),
//!     name: Some(FieldSource::Field("name".into())),
//!     geometry: Some(GeometrySource::LatLon {
//!         lon: "lon".into(),
//!         lat: "lat".into(),
//!     }),
//!     data: Default::default(),
//! };
//! rules.validate().unwrap();
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, ValidationError};
use crate::models::{Node, RawRecord};

// =============================================================================
// Rule Set
// =============================================================================

/// Where a textual node attribute comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// Every node receives the same literal.
    Value(String),
    /// The value of this field in the raw record, coerced to text.
    Field(String),
}

/// Where a node's geometry comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometrySource {
    /// Two named fields interpreted as longitude/latitude.
    LatLon { lon: String, lat: String },
    /// The native geometry attached by the format reader.
    Native,
}

/// Resolved mapping configuration for one import run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingRules {
    /// Rule for the node id. Required; validated before processing starts.
    #[serde(default)]
    pub id: Option<FieldSource>,

    /// Rule for the node name. Absent means nodes have no name.
    #[serde(default)]
    pub name: Option<FieldSource>,

    /// Rule for the node geometry. Absent means nodes have no geometry.
    #[serde(default)]
    pub geometry: Option<GeometrySource>,

    /// Literal key/value pairs injected into every node's data.
    /// Applied last, so they win on key collision.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl MappingRules {
    /// Check that the rule set can produce nodes at all.
    ///
    /// Called by the builder before any file I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_none() {
            return Err(ConfigError::MissingIdRule);
        }
        Ok(())
    }
}

// =============================================================================
// Field Mapper
// =============================================================================

/// Resolve id, name, and data for one record under the active rules.
///
/// The returned node has no geometry; geometry extraction is a separate
/// step (see [`crate::geometry::extract`]).
///
/// The data payload starts as a copy of the record's own fields, so fields
/// consumed as id/name sources stay visible in the payload alongside the
/// derived attributes. A fixed-value name is mirrored into `data["name"]`.
pub fn map_record(record: &RawRecord, rules: &MappingRules) -> Result<Node, ValidationError> {
    let id_source = rules
        .id
        .as_ref()
        .ok_or_else(|| ValidationError::MissingField("id".into()))?;
    let id = resolve(record, id_source)?;

    let name = match &rules.name {
        Some(source) => Some(resolve(record, source)?),
        None => None,
    };

    let mut data = record.fields.clone();
    if let Some(FieldSource::Value(literal)) = &rules.name {
        data.insert("name".to_string(), Value::String(literal.clone()));
    }
    for (key, value) in &rules.data {
        data.insert(key.clone(), value.clone());
    }

    Ok(Node {
        id,
        name,
        geometry: None,
        data,
    })
}

/// Resolve one field source against a record.
fn resolve(record: &RawRecord, source: &FieldSource) -> Result<String, ValidationError> {
    match source {
        FieldSource::Value(literal) => Ok(literal.clone()),
        FieldSource::Field(field) => match record.get(field) {
            None | Some(Value::Null) => Err(ValidationError::MissingField(field.clone())),
            Some(value) => value_to_text(field, value),
        },
    }
}

/// Coerce a scalar JSON value to text.
fn value_to_text(field: &str, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => {
            Err(ValidationError::NotText(field.to_string()))
        }
    }
}
