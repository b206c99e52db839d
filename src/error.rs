//! Error types for the nodeload import pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ConfigError`] - Bad or missing mapping configuration
//! - [`FormatError`] - Malformed input files
//! - [`ValidationError`] - Per-record mapping failures
//! - [`ApiError`] - Catalog service errors
//! - [`BuildError`] - Top-level build orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in the mapping configuration, raised before any record is read.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown dataset type tag.
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    /// No rule configured for deriving node ids.
    #[error("No id rule configured (set an id field or a fixed id value)")]
    MissingIdRule,

    /// A malformed option value (e.g. a `--set` pair without '=').
    #[error("Invalid value for {option}: {message}")]
    InvalidOption { option: String, message: String },
}

// =============================================================================
// Format Errors
// =============================================================================

/// Malformed input structure, fatal for the whole file.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Invalid JSON input.
    #[error("Invalid JSON input: {0}")]
    Json(String),

    /// Malformed KML markup.
    #[error("Invalid KML input: {0}")]
    Kml(String),

    /// Archive is not readable or contains unusable data.
    #[error("Invalid archive: {0}")]
    Archive(String),

    /// The archive does not contain an expected inner file.
    #[error("Archive is missing inner file: {0}")]
    MissingEntry(String),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// A single record that cannot be mapped to a node.
///
/// Non-fatal in lenient mode (the record is skipped and the error recorded),
/// fatal in strict mode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A field named by the mapping rules is absent from the record.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// A field value cannot be coerced to text.
    #[error("Field '{0}' has no text representation")]
    NotText(String),

    /// A coordinate field value is not numeric.
    #[error("Field '{field}' is not a valid coordinate: '{value}'")]
    NonNumeric { field: String, value: String },

    /// A coordinate pair is outside the valid longitude/latitude range.
    #[error("Coordinates out of range: longitude {lon}, latitude {lat}")]
    OutOfRange { lon: f64, lat: f64 },

    /// A geometry was required but the record has none.
    #[error("Record has no usable geometry")]
    EmptyGeometry,
}

// =============================================================================
// Catalog API Errors
// =============================================================================

/// Errors from the remote catalog service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// The service rejected the credentials.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// A call requiring a session was made before authenticating.
    #[error("Not authenticated (call authenticate first)")]
    NotAuthenticated,

    /// The service answered with an error status.
    #[error("Catalog API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Build Errors (top-level)
// =============================================================================

/// Top-level build orchestration errors.
///
/// This is the main error type returned by [`crate::build::build_nodes`].
/// It wraps all lower-level errors and adds build-specific variants.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Mapping configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input path does not exist.
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),

    /// Read or extraction failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input file.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// A record failed to map in strict mode.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Result type for catalog API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // ConfigError -> BuildError
        let config_err = ConfigError::UnsupportedFormat("csv".into());
        let build_err: BuildError = config_err.into();
        assert!(build_err.to_string().contains("csv"));

        // ValidationError -> BuildError
        let validation_err = ValidationError::MissingField("id".into());
        let build_err: BuildError = validation_err.into();
        assert!(build_err.to_string().contains("id"));
    }

    #[test]
    fn test_validation_error_format() {
        let err = ValidationError::NonNumeric {
            field: "lat".into(),
            value: "north".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lat"));
        assert!(msg.contains("north"));
    }

    #[test]
    fn test_not_found_shows_path() {
        let err = BuildError::NotFound(PathBuf::from("/tmp/missing.json"));
        assert!(err.to_string().contains("missing.json"));
    }
}
