//! File ingestion adapter
//!
//! Reads JSON or YAML documents into a `serde_json::Value` for the core to
//! validate. CSV belongs to a dedicated upload adapter and is refused here.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{CliError, Result};

/// Read and parse a batch file based on its extension
pub fn load_document(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CliError::file_error(format!("Failed to read '{}': {}", path.display(), e))
    })?;
    parse_document(path, &content)
}

/// Parse document content according to the path's extension
pub fn parse_document(path: &Path, content: &str) -> Result<serde_json::Value> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "json" => serde_json::from_str(content)
            .map_err(|e| CliError::parse_error(format!("Invalid JSON: {}", e))),
        "yaml" | "yml" => serde_yaml::from_str(content)
            .map_err(|e| CliError::parse_error(format!("Invalid YAML: {}", e))),
        "csv" => Err(CliError::invalid_input(
            "CSV files must be converted to JSON or YAML records before ingestion",
        )),
        _ => Err(CliError::invalid_input(format!(
            "Unsupported file format: '{}'. Supported formats: json, yaml, yml",
            extension
        ))),
    }
}

/// Load a district id to display name mapping
///
/// Accepts either an object (`{"d1": "Bellary"}`) or an array of
/// `{"id": .., "name": ..}` records.
pub fn load_names(path: &Path) -> Result<HashMap<String, String>> {
    let document = load_document(path)?;
    names_from_value(&document)
}

pub fn names_from_value(document: &serde_json::Value) -> Result<HashMap<String, String>> {
    match document {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(id, name)| match name.as_str() {
                Some(name) => Ok((id.clone(), name.to_string())),
                None => Err(CliError::invalid_input(format!(
                    "name for district '{}' must be a string",
                    id
                ))),
            })
            .collect(),
        serde_json::Value::Array(records) => records
            .iter()
            .map(|record| {
                let id = record.get("id").and_then(|v| v.as_str());
                let name = record.get("name").and_then(|v| v.as_str());
                match (id, name) {
                    (Some(id), Some(name)) => Ok((id.to_string(), name.to_string())),
                    _ => Err(CliError::invalid_input(
                        "district name records need string 'id' and 'name' fields",
                    )),
                }
            })
            .collect(),
        _ => Err(CliError::invalid_input(
            "district names must be an object or an array of records",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_parse_json_document() {
        let value = parse_document(&PathBuf::from("batch.json"), r#"[{"id": "d1"}]"#).unwrap();
        assert_eq!(value[0]["id"], "d1");
    }

    #[test]
    fn test_parse_yaml_document() {
        let value = parse_document(
            &PathBuf::from("batch.YAML"),
            "- id: d1\n  lfi: 0.85\n- id: d3\n  lfi: 0.72\n",
        )
        .unwrap();
        assert_eq!(value[1]["lfi"], 0.72);
    }

    #[test]
    fn test_csv_is_refused() {
        let err = parse_document(&PathBuf::from("upload.csv"), "a,b\n1,2").unwrap_err();
        assert!(matches!(err, CliError::InvalidInput(_)));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_document(&PathBuf::from("batch.json"), "[{").unwrap_err();
        assert!(matches!(err, CliError::ParseError(_)));
    }

    #[test]
    fn test_names_from_object_and_array() {
        let from_object = names_from_value(&json!({"d1": "Bellary"})).unwrap();
        assert_eq!(from_object["d1"], "Bellary");

        let from_array = names_from_value(&json!([{"id": "d11", "name": "Gaya"}])).unwrap();
        assert_eq!(from_array["d11"], "Gaya");

        assert!(names_from_value(&json!([{"id": "d11"}])).is_err());
        assert!(names_from_value(&json!("Gaya")).is_err());
    }
}
