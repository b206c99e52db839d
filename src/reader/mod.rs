//! Format readers: one input encoding each, one shared record shape.
//!
//! Every reader turns a file into a finite, ordered `Vec<RawRecord>`:
//!
//! - [`json`] - flat JSON records (array of objects, no native geometry)
//! - [`kml`] - KML placemarks (extended data fields + native geometry)
//! - [`archive`] - zipped shapefile (attribute table + native geometry)
//!
//! The declared type tag is a closed enum; unknown tags are rejected with a
//! [`ConfigError`](crate::error::ConfigError) before any file I/O happens.

pub mod archive;
pub mod json;
pub mod kml;

use std::fmt;
use std::path::Path;

use crate::error::{BuildError, BuildResult, ConfigError};
use crate::models::RawRecord;

/// Supported input encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// A JSON array of flat objects.
    Json,
    /// KML placemark markup.
    Kml,
    /// A zip archive containing a shapefile.
    Archive,
}

impl Format {
    /// Parse a declared type tag (`json`, `kml`, `zip`, `shp`).
    pub fn from_tag(tag: &str) -> Result<Self, ConfigError> {
        match tag.trim().to_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "kml" => Ok(Format::Kml),
            "zip" | "shp" => Ok(Format::Archive),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        if extension.is_empty() {
            return Err(ConfigError::UnsupportedFormat(format!(
                "{} (no file extension, pass --format)",
                path.display()
            )));
        }
        Self::from_tag(extension)
    }

    /// Canonical tag for this format.
    pub fn tag(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Kml => "kml",
            Format::Archive => "zip",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Read every record from a dataset file.
///
/// The whole file is consumed in one pass; the file handle is released
/// before this returns, on success and on failure alike.
pub fn read_records(path: &Path, format: Format) -> BuildResult<Vec<RawRecord>> {
    match format {
        Format::Json => json::read(path),
        Format::Kml => kml::read(path),
        Format::Archive => archive::read(path),
    }
}

/// Read a whole input file, mapping a missing path to [`BuildError::NotFound`].
pub(crate) fn read_bytes(path: &Path) -> BuildResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BuildError::NotFound(path.to_path_buf())
        } else {
            BuildError::Io(e)
        }
    })
}
