//! KML reader: placemark markup with named extended data.
//!
//! Each `<Placemark>` becomes one record. Its `<name>` and `<description>`
//! plus any `<ExtendedData>` entries (`<Data name=..><value>` and
//! `<SimpleData name=..>`) become fields; its `<Point>`, `<LineString>`, or
//! `<Polygon>` coordinates become the native geometry.
//!
//! Input bytes are decoded with encoding auto-detection before parsing,
//! since KML exports in the wild are not always UTF-8.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::error::{BuildResult, FormatError};
use crate::models::{Geometry, Position, RawRecord};

/// Read all placemarks from a KML file.
pub fn read(path: &Path) -> BuildResult<Vec<RawRecord>> {
    let bytes = super::read_bytes(path)?;
    Ok(parse(&decode(&bytes))?)
}

/// Decode raw bytes to a string using chardet detection.
fn decode(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;
    match charset.to_lowercase().as_str() {
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.to_string()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        _ => String::from_utf8_lossy(bytes).to_string(),
    }
}

/// One placemark being accumulated.
#[derive(Default)]
struct Placemark {
    fields: Map<String, Value>,
    geometry: Option<Geometry>,
    rings: Vec<Vec<Position>>,
}

impl Placemark {
    fn finish(self) -> Result<RawRecord, FormatError> {
        let geometry = match self.geometry {
            Some(geometry) => Some(geometry),
            None if !self.rings.is_empty() => {
                Some(Geometry::polygon(self.rings).map_err(invalid)?)
            }
            None => None,
        };
        Ok(RawRecord {
            fields: self.fields,
            geometry,
        })
    }
}

/// Parse KML markup into records.
pub fn parse(kml: &str) -> Result<Vec<RawRecord>, FormatError> {
    let mut reader = Reader::from_str(kml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut placemark: Option<Placemark> = None;
    let mut data_name: Option<String> = None;

    loop {
        match reader.read_event().map_err(markup)? {
            Event::Start(e) => {
                let name = local_name(&e);
                if name == "Placemark" && placemark.is_none() {
                    placemark = Some(Placemark::default());
                } else if placemark.is_some() && (name == "Data" || name == "SimpleData") {
                    data_name = attribute(&e, "name")?;
                }
                stack.push(name);
            }
            Event::Text(t) => {
                if let Some(mark) = placemark.as_mut() {
                    let text = t.unescape().map_err(markup)?;
                    collect_text(mark, &stack, data_name.as_deref(), &text)?;
                }
            }
            Event::End(e) => {
                let name = local_name_end(e.local_name().as_ref());
                stack.pop();
                match name.as_str() {
                    "Placemark" => {
                        if let Some(mark) = placemark.take() {
                            records.push(mark.finish()?);
                        }
                    }
                    "Data" | "SimpleData" => data_name = None,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

/// Route one text chunk into the right part of the current placemark.
fn collect_text(
    mark: &mut Placemark,
    stack: &[String],
    data_name: Option<&str>,
    text: &str,
) -> Result<(), FormatError> {
    let element = match stack.last() {
        Some(element) => element.as_str(),
        None => return Ok(()),
    };
    let parent = stack.len().checked_sub(2).map(|i| stack[i].as_str());

    match element {
        "name" | "description" if parent == Some("Placemark") => {
            mark.fields
                .insert(element.to_string(), Value::String(text.to_string()));
        }
        "value" | "SimpleData" => {
            if let Some(field) = data_name {
                mark.fields
                    .insert(field.to_string(), Value::String(text.to_string()));
            }
        }
        "coordinates" => {
            let positions = parse_coordinates(text)?;
            // The nearest geometry ancestor decides what the tuple list means.
            if let Some(kind) = stack.iter().rev().find(|name| {
                matches!(name.as_str(), "Point" | "LineString" | "LinearRing")
            }) {
                match kind.as_str() {
                    "Point" => {
                        let &[lon, lat] = positions.first().ok_or_else(|| {
                            FormatError::Kml("empty <coordinates> in Point".to_string())
                        })?;
                        mark.geometry = Some(Geometry::point(lon, lat).map_err(invalid)?);
                    }
                    "LineString" => {
                        mark.geometry =
                            Some(Geometry::line_string(positions).map_err(invalid)?);
                    }
                    // Polygon rings accumulate, outer boundary first in
                    // document order.
                    _ => mark.rings.push(positions),
                }
            }
        }
        _ => {}
    }
    Ok(())
}

/// Parse a KML coordinate list: whitespace-separated `lon,lat[,alt]` tuples.
fn parse_coordinates(text: &str) -> Result<Vec<Position>, FormatError> {
    text.split_whitespace()
        .map(|tuple| {
            let mut parts = tuple.split(',');
            let lon = parts.next().unwrap_or_default();
            let lat = parts
                .next()
                .ok_or_else(|| FormatError::Kml(format!("invalid coordinate tuple: '{tuple}'")))?;
            let lon: f64 = lon
                .trim()
                .parse()
                .map_err(|_| FormatError::Kml(format!("invalid longitude: '{lon}'")))?;
            let lat: f64 = lat
                .trim()
                .parse()
                .map_err(|_| FormatError::Kml(format!("invalid latitude: '{lat}'")))?;
            Ok([lon, lat])
        })
        .collect()
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn local_name_end(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn attribute(e: &BytesStart, name: &str) -> Result<Option<String>, FormatError> {
    match e.try_get_attribute(name).map_err(markup)? {
        Some(attr) => Ok(Some(attr.unescape_value().map_err(markup)?.into_owned())),
        None => Ok(None),
    }
}

fn markup(e: impl std::fmt::Display) -> FormatError {
    FormatError::Kml(e.to_string())
}

fn invalid(e: crate::error::ValidationError) -> FormatError {
    FormatError::Kml(e.to_string())
}
