//! JSON reader: a top-level array of flat objects.
//!
//! Each object becomes one record with no native geometry; a geometry, if
//! wanted, is derived later from two named fields by the extractor.

use std::path::Path;

use serde_json::Value;

use crate::error::{BuildResult, FormatError};
use crate::models::RawRecord;

/// Read all records from a JSON file.
pub fn read(path: &Path) -> BuildResult<Vec<RawRecord>> {
    let bytes = super::read_bytes(path)?;
    Ok(parse(&bytes)?)
}

/// Parse JSON bytes into records.
pub fn parse(bytes: &[u8]) -> Result<Vec<RawRecord>, FormatError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| FormatError::Json(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(FormatError::Json(format!(
                "top-level value must be an array of objects, found {}",
                json_type(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => Ok(RawRecord::from_fields(fields)),
            other => Err(FormatError::Json(format!(
                "element {} is not an object, found {}",
                index,
                json_type(&other)
            ))),
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_array_of_objects() {
        let records = parse(br#"[{"id":"1","name":"A"},{"id":"2","name":"B"}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields["id"], "1");
        assert_eq!(records[1].fields["name"], "B");
        assert!(records[0].geometry.is_none());
    }

    #[test]
    fn test_parse_preserves_input_order() {
        let records = parse(br#"[{"b":"1","a":"2","c":"3"}]"#).unwrap();
        let keys: Vec<&str> = records[0].fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_top_level_object_rejected() {
        let err = parse(br#"{"id":"1"}"#).unwrap_err();
        assert!(err.to_string().contains("array of objects"));
    }

    #[test]
    fn test_non_object_element_rejected() {
        let err = parse(br#"[{"id":"1"}, 7]"#).unwrap_err();
        assert!(err.to_string().contains("element 1"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(parse(b"[{").is_err());
    }

    #[test]
    fn test_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"[{"id":"1"}]"#).unwrap();

        let records = read(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields["id"], "1");
    }
}
