//! Domain models for the nodeload import pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Node`] - The canonical output entity (id, name, geometry, data)
//! - [`RawRecord`] - One parsed input element before mapping
//! - [`Geometry`] - Canonical point/line/polygon geometry

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

// =============================================================================
// Geometry
// =============================================================================

/// A longitude/latitude pair, in GeoJSON axis order.
pub type Position = [f64; 2];

/// Canonical geometry representation.
///
/// Serializes in GeoJSON shape (`{"type": "Point", "coordinates": [lon, lat]}`),
/// which is what the catalog service expects in node payloads.
///
/// Every constructor enforces the coordinate invariant:
/// longitude in [-180, 180], latitude in [-90, 90].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single position.
    Point(Position),
    /// An ordered sequence of positions.
    LineString(Vec<Position>),
    /// One outer ring, optionally followed by inner rings.
    Polygon(Vec<Vec<Position>>),
}

impl Geometry {
    /// Create a point, checking the coordinate range.
    pub fn point(lon: f64, lat: f64) -> Result<Self, ValidationError> {
        check_position(lon, lat)?;
        Ok(Geometry::Point([lon, lat]))
    }

    /// Create a line string, checking every position.
    pub fn line_string(positions: Vec<Position>) -> Result<Self, ValidationError> {
        for &[lon, lat] in &positions {
            check_position(lon, lat)?;
        }
        Ok(Geometry::LineString(positions))
    }

    /// Create a polygon from its rings, checking every position.
    pub fn polygon(rings: Vec<Vec<Position>>) -> Result<Self, ValidationError> {
        for ring in &rings {
            for &[lon, lat] in ring {
                check_position(lon, lat)?;
            }
        }
        Ok(Geometry::Polygon(rings))
    }

    /// Longitude of a point geometry.
    pub fn lon(&self) -> Option<f64> {
        match self {
            Geometry::Point([lon, _]) => Some(*lon),
            _ => None,
        }
    }

    /// Latitude of a point geometry.
    pub fn lat(&self) -> Option<f64> {
        match self {
            Geometry::Point([_, lat]) => Some(*lat),
            _ => None,
        }
    }

    /// A geometry with no positions at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(_) => false,
            Geometry::LineString(positions) => positions.is_empty(),
            Geometry::Polygon(rings) => rings.iter().all(|ring| ring.is_empty()),
        }
    }
}

fn check_position(lon: f64, lat: f64) -> Result<(), ValidationError> {
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(ValidationError::OutOfRange { lon, lat });
    }
    Ok(())
}

// =============================================================================
// Raw Record
// =============================================================================

/// One parsed input element, produced by a format reader.
///
/// Fields keep their input order. KML and archive inputs attach the
/// element's native geometry; JSON records never carry one (their geometry
/// is derived later from two named fields).
#[derive(Debug, Clone, Default, Serialize)]
pub struct RawRecord {
    /// Field name to value mapping.
    #[serde(flatten)]
    pub fields: Map<String, Value>,

    /// Native geometry from the source format, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
}

impl RawRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record from a field map, with no native geometry.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            geometry: None,
        }
    }

    /// Attach a native geometry.
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Look up a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Insert a field value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }
}

// =============================================================================
// Node
// =============================================================================

/// The unit of output: one entity ready for upload to a catalog layer.
///
/// Immutable once built. Uniqueness of `id` within a batch is the caller's
/// responsibility, not enforced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node identifier, unique within the destination layer.
    pub id: String,

    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Node location, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,

    /// Payload forwarded verbatim to the catalog service.
    pub data: Map<String, Value>,
}
