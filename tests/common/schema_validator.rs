use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::fs;

/// Load and compile a draft 7 schema from tests/schemas
pub fn load_test_schema(schema_name: &str) -> JSONSchema {
    let schema_path = format!("{}/tests/schemas/{}.json", env!("CARGO_MANIFEST_DIR"), schema_name);
    let schema_content = fs::read_to_string(&schema_path)
        .unwrap_or_else(|_| panic!("Failed to read schema file: {}", schema_path));

    let schema_json: Value = serde_json::from_str(&schema_content)
        .unwrap_or_else(|_| panic!("Failed to parse schema JSON: {}", schema_path));

    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema_json)
        .expect("Failed to compile schema")
}

/// Validate a JSON value against a schema
pub fn validate_against_schema(data: &Value, schema: &JSONSchema) -> Result<(), Vec<String>> {
    match schema.validate(data) {
        Ok(_) => Ok(()),
        Err(errors) => Err(errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect()),
    }
}

/// Panic with every violation and the offending document
pub fn assert_matches_schema(data: &Value, schema_name: &str) {
    let schema = load_test_schema(schema_name);
    if let Err(errors) = validate_against_schema(data, &schema) {
        eprintln!("✗ {} schema validation failed:", schema_name);
        for error in &errors {
            eprintln!("  - {}", error);
        }
        eprintln!(
            "\nActual response:\n{}",
            serde_json::to_string_pretty(data).unwrap()
        );
        panic!("Schema validation failed with {} errors", errors.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_schema_validation() {
        let schema_json = json!({
            "type": "object",
            "properties": {
                "id": {"type": "string"},
                "name": {"type": "string"}
            },
            "required": ["id"]
        });

        let schema = JSONSchema::compile(&schema_json).expect("Invalid schema");

        assert!(validate_against_schema(&json!({"id": "123", "name": "Test"}), &schema).is_ok());
        assert!(validate_against_schema(&json!({"name": "Test"}), &schema).is_err());
    }
}
