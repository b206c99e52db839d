//! Geometry extractor.
//!
//! Produces a [`Geometry`] for one record, either by parsing two named
//! longitude/latitude fields or by passing through the native geometry a
//! format reader attached. All failures here are per-record
//! [`ValidationError`]s, handled by the builder's strict/lenient policy.

use serde_json::Value;

use crate::error::ValidationError;
use crate::mapping::GeometrySource;
use crate::models::{Geometry, RawRecord};

/// Extract the geometry for one record under the active geometry rule.
///
/// With no rule configured the node simply has no geometry, even when the
/// record carries a native one.
pub fn extract(
    record: &RawRecord,
    source: Option<&GeometrySource>,
) -> Result<Option<Geometry>, ValidationError> {
    match source {
        None => Ok(None),
        Some(GeometrySource::LatLon { lon, lat }) => {
            let lon = coordinate(record, lon)?;
            let lat = coordinate(record, lat)?;
            Ok(Some(Geometry::point(lon, lat)?))
        }
        Some(GeometrySource::Native) => match &record.geometry {
            Some(geometry) if !geometry.is_empty() => Ok(Some(geometry.clone())),
            _ => Err(ValidationError::EmptyGeometry),
        },
    }
}

/// Parse one coordinate field as a floating point value.
fn coordinate(record: &RawRecord, field: &str) -> Result<f64, ValidationError> {
    match record.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field.to_string())),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| ValidationError::NonNumeric {
            field: field.to_string(),
            value: n.to_string(),
        }),
        Some(Value::String(s)) => {
            s.trim()
                .parse::<f64>()
                .map_err(|_| ValidationError::NonNumeric {
                    field: field.to_string(),
                    value: s.clone(),
                })
        }
        Some(other) => Err(ValidationError::NonNumeric {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(fields: serde_json::Value) -> RawRecord {
        match fields {
            Value::Object(map) => RawRecord::from_fields(map),
            _ => panic!("fixture must be an object"),
        }
    }

    fn lat_lon() -> GeometrySource {
        GeometrySource::LatLon {
            lon: "lon".into(),
            lat: "lat".into(),
        }
    }

    #[test]
    fn test_point_from_string_fields() {
        let record = record(json!({"lat": "52.0", "lon": "4.0"}));
        let geometry = extract(&record, Some(&lat_lon())).unwrap().unwrap();
        assert_eq!(geometry.lon(), Some(4.0));
        assert_eq!(geometry.lat(), Some(52.0));
    }

    #[test]
    fn test_point_from_numeric_fields() {
        let record = record(json!({"lat": 52.5, "lon": 4.25}));
        let geometry = extract(&record, Some(&lat_lon())).unwrap().unwrap();
        assert_eq!(geometry.lon(), Some(4.25));
        assert_eq!(geometry.lat(), Some(52.5));
    }

    #[test]
    fn test_missing_coordinate_field() {
        let record = record(json!({"lon": "4.0"}));
        let err = extract(&record, Some(&lat_lon())).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("lat".into()));
    }

    #[test]
    fn test_non_numeric_coordinate() {
        let record = record(json!({"lat": "north", "lon": "4.0"}));
        let err = extract(&record, Some(&lat_lon())).unwrap_err();
        assert!(matches!(err, ValidationError::NonNumeric { ref field, .. } if field == "lat"));
    }

    #[test]
    fn test_out_of_range_coordinate() {
        let record = record(json!({"lat": "95.0", "lon": "4.0"}));
        let err = extract(&record, Some(&lat_lon())).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
    }

    #[test]
    fn test_no_source_yields_no_geometry() {
        let record =
            record(json!({"lat": "52.0", "lon": "4.0"})).with_geometry(Geometry::Point([4.0, 52.0]));
        assert_eq!(extract(&record, None).unwrap(), None);
    }

    #[test]
    fn test_native_passthrough() {
        let native = Geometry::point(4.0, 52.0).unwrap();
        let record = RawRecord::new().with_geometry(native.clone());
        let geometry = extract(&record, Some(&GeometrySource::Native)).unwrap();
        assert_eq!(geometry, Some(native));
    }

    #[test]
    fn test_native_required_but_absent() {
        let record = RawRecord::new();
        let err = extract(&record, Some(&GeometrySource::Native)).unwrap_err();
        assert_eq!(err, ValidationError::EmptyGeometry);
    }

    #[test]
    fn test_native_required_but_empty() {
        let record = RawRecord::new().with_geometry(Geometry::LineString(vec![]));
        let err = extract(&record, Some(&GeometrySource::Native)).unwrap_err();
        assert_eq!(err, ValidationError::EmptyGeometry);
    }
}
