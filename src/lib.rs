//! # nodeload - dataset to catalog-layer import pipeline
//!
//! nodeload reads a geospatial/tabular dataset (JSON records, KML placemarks,
//! or a zipped shapefile), maps every element to a uniform node under a
//! declarative rule set, and uploads the nodes into a layer on a remote
//! catalog service.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐     ┌────────────┐     ┌─────────────────┐     ┌────────────┐
//! │ Input file │────▶│   Reader   │────▶│     Builder     │────▶│  Catalog   │
//! │ json/kml/  │     │ raw records│     │ mapper+geometry │     │ layer API  │
//! │    zip     │     │            │     │ ordered nodes   │     │  (upload)  │
//! └────────────┘     └────────────┘     └─────────────────┘     └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nodeload::{build_nodes, BuildOptions, FieldSource, Format, MappingRules};
//! use std::path::Path;
//!
//! let rules = MappingRules {
//!     id: Some(FieldSource::Field("id".into())),
//!     ..Default::default()
//! };
//! let report = build_nodes(Path::new("stops.json"), Format::Json, &rules,
//!     &BuildOptions::default())?;
//! println!("{}", report.summary());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (Node, RawRecord, Geometry)
//! - [`reader`] - Format readers (JSON, KML, zipped shapefile)
//! - [`mapping`] - Mapping rule set and field mapper
//! - [`geometry`] - Geometry extractor
//! - [`build`] - Node builder orchestration
//! - [`api`] - Catalog service client

// Core modules
pub mod error;
pub mod models;

// Reading
pub mod reader;

// Mapping
pub mod geometry;
pub mod mapping;

// Building
pub mod build;

// Catalog API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ApiError, ApiResult, BuildError, BuildResult, ConfigError, FormatError, ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Geometry, Node, Position, RawRecord};

// =============================================================================
// Re-exports - Reading
// =============================================================================

pub use reader::{read_records, Format};

// =============================================================================
// Re-exports - Mapping
// =============================================================================

pub use mapping::{map_record, FieldSource, GeometrySource, MappingRules};

// =============================================================================
// Re-exports - Building
// =============================================================================

pub use build::{build_nodes, build_records, BuildOptions, BuildReport, SkippedRecord};

// =============================================================================
// Re-exports - Catalog API
// =============================================================================

pub use api::{CatalogClient, LayerSpec};
