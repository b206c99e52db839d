//! Archive reader: a zip container holding a shapefile.
//!
//! The reader locates the inner `.shp`/`.dbf` pair, extracts both into
//! memory, and yields one record per feature: the shape becomes the native
//! geometry, the dbase attribute row becomes the field map.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;

use serde_json::Value;
use shapefile::dbase::FieldValue;
use shapefile::Shape;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{BuildError, BuildResult, FormatError};
use crate::models::{Geometry, Position, RawRecord};

/// Read all features from a zipped shapefile.
pub fn read(path: &Path) -> BuildResult<Vec<RawRecord>> {
    let file = std::fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BuildError::NotFound(path.to_path_buf())
        } else {
            BuildError::Io(e)
        }
    })?;

    let mut archive = ZipArchive::new(file).map_err(container)?;

    let shp_name = find_entry(&archive, ".shp")
        .ok_or_else(|| FormatError::MissingEntry("*.shp".to_string()))?;
    let dbf_name = sibling(&archive, &shp_name, ".dbf")
        .ok_or_else(|| FormatError::MissingEntry(replace_extension(&shp_name, "dbf")))?;

    let shp = read_entry(&mut archive, &shp_name)?;
    let dbf = read_entry(&mut archive, &dbf_name)?;

    features(shp, dbf)
}

/// Parse an in-memory `.shp`/`.dbf` pair into records.
pub fn features(shp: Vec<u8>, dbf: Vec<u8>) -> BuildResult<Vec<RawRecord>> {
    let shape_reader =
        shapefile::ShapeReader::new(Cursor::new(shp)).map_err(|e| dataset(&e))?;
    let dbase_reader =
        shapefile::dbase::Reader::new(Cursor::new(dbf)).map_err(|e| dataset(&e))?;
    // Attribute rows hash their fields; fields keep the table's declared
    // order, like the other readers keep input order.
    let field_names: Vec<String> = dbase_reader
        .fields()
        .iter()
        .map(|field| field.name().to_string())
        .collect();
    let mut reader = shapefile::Reader::new(shape_reader, dbase_reader);

    let mut records = Vec::new();
    for feature in reader.iter_shapes_and_records() {
        let (shape, attributes) = feature.map_err(|e| dataset(&e))?;
        let mut values: HashMap<String, FieldValue> = attributes.into_iter().collect();

        let mut record = RawRecord::new();
        for name in &field_names {
            if let Some(value) = values.remove(name) {
                record.insert(name.clone(), field_to_json(value));
            }
        }
        record.geometry = shape_to_geometry(shape)?;
        records.push(record);
    }

    Ok(records)
}

/// Convert a shapefile shape into the canonical geometry.
///
/// Null shapes yield no geometry; measure/elevation variants are flattened
/// to their x/y positions.
pub fn shape_to_geometry(shape: Shape) -> Result<Option<Geometry>, FormatError> {
    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => Geometry::point(p.x, p.y).map_err(coordinates)?,
        Shape::PointM(p) => Geometry::point(p.x, p.y).map_err(coordinates)?,
        Shape::PointZ(p) => Geometry::point(p.x, p.y).map_err(coordinates)?,
        Shape::Polyline(line) => polyline(line.parts())?,
        Shape::PolylineM(line) => polyline(line.parts())?,
        Shape::PolylineZ(line) => polyline(line.parts())?,
        Shape::Polygon(polygon) => rings(polygon.rings())?,
        Shape::PolygonM(polygon) => rings(polygon.rings())?,
        Shape::PolygonZ(polygon) => rings(polygon.rings())?,
        other => {
            return Err(FormatError::Archive(format!(
                "unsupported shape type: {:?}",
                other.shapetype()
            )))
        }
    };
    Ok(Some(geometry))
}

fn polyline<P: HasXy>(parts: &[Vec<P>]) -> Result<Geometry, FormatError> {
    let positions: Vec<Position> = parts.iter().flatten().map(HasXy::xy).collect();
    Geometry::line_string(positions).map_err(coordinates)
}

fn rings<P: HasXy>(rings: &[shapefile::PolygonRing<P>]) -> Result<Geometry, FormatError> {
    let rings: Vec<Vec<Position>> = rings
        .iter()
        .map(|ring| ring.points().iter().map(HasXy::xy).collect())
        .collect();
    Geometry::polygon(rings).map_err(coordinates)
}

/// Planar position access shared by the point variants.
trait HasXy {
    fn xy(&self) -> Position;
}

impl HasXy for shapefile::Point {
    fn xy(&self) -> Position {
        [self.x, self.y]
    }
}

impl HasXy for shapefile::PointM {
    fn xy(&self) -> Position {
        [self.x, self.y]
    }
}

impl HasXy for shapefile::PointZ {
    fn xy(&self) -> Position {
        [self.x, self.y]
    }
}

/// Convert a dbase attribute value to JSON.
pub fn field_to_json(value: FieldValue) -> Value {
    match value {
        FieldValue::Character(s) => s.map(Value::String).unwrap_or(Value::Null),
        FieldValue::Memo(s) => Value::String(s),
        FieldValue::Numeric(n) => n.map(number).unwrap_or(Value::Null),
        FieldValue::Float(f) => f.map(|f| number(f64::from(f))).unwrap_or(Value::Null),
        FieldValue::Double(d) => number(d),
        FieldValue::Currency(c) => number(c),
        FieldValue::Integer(i) => Value::from(i),
        FieldValue::Logical(b) => b.map(Value::Bool).unwrap_or(Value::Null),
        FieldValue::Date(d) => d
            .map(|d| Value::String(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day())))
            .unwrap_or(Value::Null),
        other => Value::String(format!("{other:?}")),
    }
}

fn number(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// First archive entry with the given extension (case-insensitive).
fn find_entry<R: Read + std::io::Seek>(archive: &ZipArchive<R>, extension: &str) -> Option<String> {
    archive
        .file_names()
        .find(|name| name.to_lowercase().ends_with(extension))
        .map(str::to_string)
}

/// The entry sharing a stem with `name` but carrying another extension.
fn sibling<R: Read + std::io::Seek>(
    archive: &ZipArchive<R>,
    name: &str,
    extension: &str,
) -> Option<String> {
    let wanted = replace_extension(name, extension.trim_start_matches('.')).to_lowercase();
    archive
        .file_names()
        .find(|candidate| candidate.to_lowercase() == wanted)
        .map(str::to_string)
}

fn replace_extension(name: &str, extension: &str) -> String {
    match name.rfind('.') {
        Some(dot) => format!("{}.{}", &name[..dot], extension),
        None => format!("{name}.{extension}"),
    }
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> BuildResult<Vec<u8>> {
    let mut entry = archive.by_name(name).map_err(container)?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn container(e: ZipError) -> BuildError {
    match e {
        ZipError::Io(e) => BuildError::Io(e),
        other => FormatError::Archive(other.to_string()).into(),
    }
}

fn dataset(e: &dyn std::fmt::Display) -> BuildError {
    FormatError::Archive(e.to_string()).into()
}

fn coordinates(e: crate::error::ValidationError) -> FormatError {
    FormatError::Archive(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn zip_with(entries: &[(&str, &[u8])]) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut writer = ZipWriter::new(file.reopen().unwrap());
        for (name, bytes) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
        file
    }

    /// A one-record shapefile holding a single point at (4.0, 52.0).
    fn shp_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(9994i32.to_be_bytes());
        bytes.extend([0u8; 20]);
        // File length in 16-bit words: 100-byte header + one point record.
        let words: i32 = (100 + 8 + 4 + 16) / 2;
        bytes.extend(words.to_be_bytes());
        bytes.extend(1000i32.to_le_bytes());
        bytes.extend(1i32.to_le_bytes());
        for bound in [4.0f64, 52.0, 4.0, 52.0] {
            bytes.extend(bound.to_le_bytes());
        }
        bytes.extend([0u8; 32]);

        bytes.extend(1i32.to_be_bytes());
        bytes.extend(10i32.to_be_bytes());
        bytes.extend(1i32.to_le_bytes());
        bytes.extend(4.0f64.to_le_bytes());
        bytes.extend(52.0f64.to_le_bytes());
        bytes
    }

    /// A one-record dbf with one single-character field per name, all 'x'.
    fn dbf_bytes(names: &[&str]) -> Vec<u8> {
        let header_len = (32 + 32 * names.len() + 1) as u16;
        let record_len = (1 + names.len()) as u16;

        let mut bytes = vec![0x03, 95, 7, 26];
        bytes.extend(1u32.to_le_bytes());
        bytes.extend(header_len.to_le_bytes());
        bytes.extend(record_len.to_le_bytes());
        bytes.extend([0u8; 20]);
        for name in names {
            let mut descriptor = [0u8; 32];
            descriptor[..name.len()].copy_from_slice(name.as_bytes());
            descriptor[11] = b'C';
            descriptor[16] = 1;
            bytes.extend(descriptor);
        }
        bytes.push(0x0D);

        bytes.push(b' ');
        bytes.extend(std::iter::repeat(b'x').take(names.len()));
        bytes.push(0x1A);
        bytes
    }

    #[test]
    fn test_fields_keep_table_order() {
        let names = ["alpha", "bravo", "charlie", "delta", "echo"];
        let records = features(shp_bytes(), dbf_bytes(&names)).unwrap();
        assert_eq!(records.len(), 1);

        let fields: Vec<&str> = records[0].fields.keys().map(String::as_str).collect();
        assert_eq!(fields, names);
        assert_eq!(records[0].fields["alpha"], "x");
        assert_eq!(
            records[0].geometry,
            Some(Geometry::Point([4.0, 52.0]))
        );
    }

    #[test]
    fn test_point_shape_conversion() {
        let shape = Shape::Point(shapefile::Point::new(4.0, 52.0));
        let geometry = shape_to_geometry(shape).unwrap().unwrap();
        assert_eq!(geometry.lon(), Some(4.0));
        assert_eq!(geometry.lat(), Some(52.0));
    }

    #[test]
    fn test_point_z_flattened() {
        let shape = Shape::PointZ(shapefile::PointZ::new(4.0, 52.0, 11.5, 0.0));
        let geometry = shape_to_geometry(shape).unwrap().unwrap();
        assert_eq!(geometry, Geometry::Point([4.0, 52.0]));
    }

    #[test]
    fn test_null_shape_has_no_geometry() {
        assert_eq!(shape_to_geometry(Shape::NullShape).unwrap(), None);
    }

    #[test]
    fn test_polyline_conversion() {
        let line = shapefile::Polyline::new(vec![
            shapefile::Point::new(0.0, 0.0),
            shapefile::Point::new(1.0, 1.0),
        ]);
        let geometry = shape_to_geometry(Shape::Polyline(line)).unwrap().unwrap();
        assert_eq!(geometry, Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]]));
    }

    #[test]
    fn test_out_of_range_shape_rejected() {
        let shape = Shape::Point(shapefile::Point::new(200.0, 95.0));
        assert!(shape_to_geometry(shape).is_err());
    }

    #[test]
    fn test_field_value_conversion() {
        assert_eq!(
            field_to_json(FieldValue::Character(Some("A".into()))),
            Value::String("A".into())
        );
        assert_eq!(field_to_json(FieldValue::Character(None)), Value::Null);
        assert_eq!(field_to_json(FieldValue::Numeric(Some(4.5))), Value::from(4.5));
        assert_eq!(field_to_json(FieldValue::Integer(7)), Value::from(7));
        assert_eq!(
            field_to_json(FieldValue::Logical(Some(true))),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_archive_without_shp_is_missing_entry() {
        let file = zip_with(&[("readme.txt", b"hello")]);
        let err = read(file.path()).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Format(FormatError::MissingEntry(ref name)) if name.contains(".shp")
        ));
    }

    #[test]
    fn test_archive_without_dbf_is_missing_entry() {
        let file = zip_with(&[("stops.shp", b"")]);
        let err = read(file.path()).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Format(FormatError::MissingEntry(ref name)) if name.contains("stops.dbf")
        ));
    }

    #[test]
    fn test_not_a_zip_is_format_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not a zip archive").unwrap();
        let err = read(file.path()).unwrap_err();
        assert!(matches!(err, BuildError::Format(FormatError::Archive(_))));
    }

    #[test]
    fn test_missing_archive_is_not_found() {
        let err = read(Path::new("/nonexistent/stops.zip")).unwrap_err();
        assert!(matches!(err, BuildError::NotFound(_)));
    }

    #[test]
    fn test_truncated_shapefile_is_format_error() {
        let file = zip_with(&[("stops.shp", b"bad"), ("stops.dbf", b"bad")]);
        let err = read(file.path()).unwrap_err();
        assert!(matches!(err, BuildError::Format(FormatError::Archive(_))));
    }
}
