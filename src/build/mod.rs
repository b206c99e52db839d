//! Node builder: orchestrates reader, geometry extractor, and field mapper.
//!
//! # Example
//!
//! ```rust,ignore
//! use nodeload::build::{build_nodes, BuildOptions};
//! use nodeload::mapping::{FieldSource, GeometrySource, MappingRules};
//! use nodeload::reader::Format;
//! use std::path::Path;
//!
//! let rules = MappingRules {
//!     id: Some(FieldSource::Field("id".into())),
//!     ..Default::default()
//! };
//! let report = build_nodes(
//!     Path::new("stops.json"),
//!     Format::Json,
//!     &rules,
//!     &BuildOptions::default(),
//! )?;
//! println!("{}", report.summary());
//! ```

use std::path::Path;

use crate::error::{BuildResult, ValidationError};
use crate::geometry;
use crate::mapping::{self, MappingRules};
use crate::models::{Node, RawRecord};
use crate::reader::{read_records, Format};

/// Per-record failure policy.
///
/// Lenient (the default) collects per-record validation errors and skips the
/// offending records; strict aborts the whole batch on the first one.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Abort on the first per-record validation error.
    pub strict: bool,
}

/// A record that failed to map in lenient mode.
#[derive(Debug, Clone)]
pub struct SkippedRecord {
    /// Zero-based position in the input record sequence.
    pub index: usize,
    /// Why the record was skipped.
    pub error: ValidationError,
}

/// The outcome of a completed build.
///
/// `nodes` preserves input order, minus any skipped records; `skipped` lets
/// the caller enumerate which inputs failed and why.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Successfully built nodes, in input order.
    pub nodes: Vec<Node>,
    /// Records skipped in lenient mode.
    pub skipped: Vec<SkippedRecord>,
}

impl BuildReport {
    /// One-line statistics for status output.
    pub fn summary(&self) -> String {
        format!(
            "Built {} nodes, {} records skipped",
            self.nodes.len(),
            self.skipped.len()
        )
    }
}

/// Build the full node sequence from a dataset file.
///
/// The mapping rules are validated before any file I/O; reader-level errors
/// abort with no partial output. Per-record validation failures follow the
/// strict/lenient policy in `options`.
pub fn build_nodes(
    path: &Path,
    format: Format,
    rules: &MappingRules,
    options: &BuildOptions,
) -> BuildResult<BuildReport> {
    rules.validate()?;
    let records = read_records(path, format)?;
    build_records(records, rules, options)
}

/// Build nodes from already-read records.
pub fn build_records(
    records: Vec<RawRecord>,
    rules: &MappingRules,
    options: &BuildOptions,
) -> BuildResult<BuildReport> {
    rules.validate()?;

    let mut report = BuildReport::default();
    for (index, record) in records.into_iter().enumerate() {
        match build_one(&record, rules) {
            Ok(node) => report.nodes.push(node),
            Err(error) => {
                if options.strict {
                    return Err(error.into());
                }
                report.skipped.push(SkippedRecord { index, error });
            }
        }
    }

    Ok(report)
}

/// Map one record to a node.
fn build_one(record: &RawRecord, rules: &MappingRules) -> Result<Node, ValidationError> {
    let mut node = mapping::map_record(record, rules)?;
    node.geometry = geometry::extract(record, rules.geometry.as_ref())?;
    Ok(node)
}
