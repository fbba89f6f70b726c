//! Declarative parameter schemas and validation.
//!
//! Tools declare the shape of their input and output as a [`Schema`]: an
//! ordered set of named fields with primitive, nested-object, or
//! array-of-object kinds. Validation rejects malformed input before a tool
//! handler runs and produces structured field errors rather than panics.
//!
//! Policy: unknown extra fields are ignored for forward compatibility, and
//! optional absent fields stay absent (no defaulting).

use serde::Serialize;
use serde_json::{Map, Value};

/// The kind of value a schema field accepts.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
    /// A nested object with its own schema.
    Object(Schema),
    /// An array of objects, each validated against the element schema.
    Array(Schema),
}

impl FieldKind {
    fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }
}

/// A single declared field.
#[derive(Debug, Clone)]
struct Field {
    name: String,
    kind: FieldKind,
    required: bool,
}

/// A field-level validation error.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path to the offending field (`"todos[0].title"` style).
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// An object shape: ordered named fields, each required or optional.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Create an empty schema (accepts any object, keeps no fields).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field.
    pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    /// Add an optional field.
    pub fn optional(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    /// Validate a value against this schema.
    ///
    /// On success returns the coerced value: declared fields only, in
    /// declaration order. On failure returns every field error found.
    pub fn validate(&self, value: &Value) -> Result<Value, Vec<FieldError>> {
        let mut errors = Vec::new();
        let coerced = self.validate_object("", value, &mut errors);
        if errors.is_empty() {
            Ok(coerced)
        } else {
            Err(errors)
        }
    }

    fn validate_object(&self, path: &str, value: &Value, errors: &mut Vec<FieldError>) -> Value {
        let empty = Map::new();
        let object = match value {
            Value::Object(map) => map,
            // Absent params are treated as an empty mapping.
            Value::Null => &empty,
            other => {
                errors.push(FieldError {
                    field: if path.is_empty() { "(root)".into() } else { path.into() },
                    message: format!("expected object, got {}", json_type_name(other)),
                });
                return Value::Object(Map::new());
            }
        };

        let mut coerced = Map::new();
        for field in &self.fields {
            let field_path = join_path(path, &field.name);
            match object.get(&field.name) {
                Some(Value::Null) | None => {
                    if field.required {
                        errors.push(FieldError {
                            field: field_path,
                            message: "required field is missing".into(),
                        });
                    }
                }
                Some(value) => {
                    if let Some(checked) =
                        self.validate_field(&field_path, &field.kind, value, errors)
                    {
                        coerced.insert(field.name.clone(), checked);
                    }
                }
            }
        }
        Value::Object(coerced)
    }

    fn validate_field(
        &self,
        path: &str,
        kind: &FieldKind,
        value: &Value,
        errors: &mut Vec<FieldError>,
    ) -> Option<Value> {
        match kind {
            FieldKind::String if value.is_string() => Some(value.clone()),
            FieldKind::Number if value.is_number() => Some(value.clone()),
            FieldKind::Boolean if value.is_boolean() => Some(value.clone()),
            FieldKind::Object(schema) => {
                if value.is_object() {
                    Some(schema.validate_object(path, value, errors))
                } else {
                    errors.push(type_error(path, kind, value));
                    None
                }
            }
            FieldKind::Array(element) => match value {
                Value::Array(items) => {
                    let coerced: Vec<Value> = items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| {
                            element.validate_object(&format!("{}[{}]", path, i), item, errors)
                        })
                        .collect();
                    Some(Value::Array(coerced))
                }
                _ => {
                    errors.push(type_error(path, kind, value));
                    None
                }
            },
            _ => {
                errors.push(type_error(path, kind, value));
                None
            }
        }
    }

    /// Render this schema as a JSON Schema object for tool discovery.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            properties.insert(field.name.clone(), kind_schema(&field.kind));
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }
        let mut schema = Map::new();
        schema.insert("type".into(), Value::String("object".into()));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        Value::Object(schema)
    }
}

fn kind_schema(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::String | FieldKind::Number | FieldKind::Boolean => {
            serde_json::json!({"type": kind.name()})
        }
        FieldKind::Object(schema) => schema.to_json_schema(),
        FieldKind::Array(element) => {
            serde_json::json!({"type": "array", "items": element.to_json_schema()})
        }
    }
}

fn type_error(path: &str, kind: &FieldKind, value: &Value) -> FieldError {
    FieldError {
        field: path.to_string(),
        message: format!("expected {}, got {}", kind.name(), json_type_name(value)),
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn todo_input() -> Schema {
        Schema::new()
            .required("title", FieldKind::String)
            .optional("description", FieldKind::String)
    }

    #[test]
    fn test_valid_input_preserves_declared_fields() {
        let value = json!({"title": "Buy milk", "description": "2 liters"});
        let coerced = todo_input().validate(&value).unwrap();
        assert_eq!(coerced["title"], "Buy milk");
        assert_eq!(coerced["description"], "2 liters");
    }

    #[test]
    fn test_missing_required_field() {
        let errors = todo_input().validate(&json!({"description": "x"})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "title");
        assert!(errors[0].message.contains("required"));
    }

    #[test]
    fn test_wrong_primitive_type() {
        let errors = todo_input().validate(&json!({"title": 42})).unwrap_err();
        assert_eq!(errors[0].field, "title");
        assert!(errors[0].message.contains("expected string"));
    }

    #[test]
    fn test_optional_absent_stays_absent() {
        let coerced = todo_input().validate(&json!({"title": "a"})).unwrap();
        assert!(coerced.get("description").is_none());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let value = json!({"title": "a", "color": "red"});
        let coerced = todo_input().validate(&value).unwrap();
        assert!(coerced.get("color").is_none());
    }

    #[test]
    fn test_null_params_as_empty_object() {
        let schema = Schema::new().optional("limit", FieldKind::Number);
        let coerced = schema.validate(&Value::Null).unwrap();
        assert_eq!(coerced, json!({}));
    }

    #[test]
    fn test_non_object_root_rejected() {
        let errors = todo_input().validate(&json!([1, 2])).unwrap_err();
        assert_eq!(errors[0].field, "(root)");
    }

    #[test]
    fn test_array_of_objects_validation() {
        let schema = Schema::new().required(
            "todos",
            FieldKind::Array(
                Schema::new()
                    .required("id", FieldKind::Number)
                    .required("title", FieldKind::String),
            ),
        );
        let ok = json!({"todos": [{"id": 1, "title": "a"}, {"id": 2, "title": "b"}]});
        assert!(schema.validate(&ok).is_ok());

        let bad = json!({"todos": [{"id": 1, "title": "a"}, {"id": "two", "title": "b"}]});
        let errors = schema.validate(&bad).unwrap_err();
        assert_eq!(errors[0].field, "todos[1].id");
    }

    #[test]
    fn test_nested_object_error_path() {
        let schema = Schema::new().required(
            "meta",
            FieldKind::Object(Schema::new().required("owner", FieldKind::String)),
        );
        let errors = schema.validate(&json!({"meta": {}})).unwrap_err();
        assert_eq!(errors[0].field, "meta.owner");
    }

    #[test]
    fn test_collects_multiple_errors() {
        let schema = Schema::new()
            .required("id", FieldKind::Number)
            .required("completed", FieldKind::Boolean);
        let errors = schema.validate(&json!({"id": "x"})).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_json_schema_rendering() {
        let rendered = todo_input().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["properties"]["title"]["type"], "string");
        assert_eq!(rendered["required"], json!(["title"]));
    }

    #[test]
    fn test_json_schema_array_items() {
        let schema = Schema::new().required(
            "todos",
            FieldKind::Array(Schema::new().required("id", FieldKind::Number)),
        );
        let rendered = schema.to_json_schema();
        assert_eq!(rendered["properties"]["todos"]["type"], "array");
        assert_eq!(
            rendered["properties"]["todos"]["items"]["properties"]["id"]["type"],
            "number"
        );
    }
}
