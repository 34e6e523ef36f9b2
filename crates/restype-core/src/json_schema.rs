//! JSON Schema backed [`Schema`] implementation

use std::fmt;
use std::sync::Arc;

use serde_json::{Number, Value};

use crate::error::ContractError;
use crate::schema::{Schema, SchemaRef, ValidationFailure, ValidationIssue};

/// A compiled JSON Schema document.
///
/// With [`coerce_primitives`](JsonSchema::coerce_primitives) enabled, string values in
/// positions the schema types as `integer`, `number` or `boolean` are parsed before
/// validation. This is what lets raw query strings and path parameters come out the
/// other side as numbers.
///
/// ```rust
/// use restype_core::{JsonSchema, Schema};
/// use serde_json::json;
///
/// let query = JsonSchema::compile(json!({
///     "type": "object",
///     "properties": { "limit": { "type": "integer" } },
///     "required": ["limit"]
/// }))
/// .unwrap()
/// .coerce_primitives();
///
/// assert_eq!(
///     query.validate(json!({"limit": "10"})).unwrap(),
///     json!({"limit": 10})
/// );
/// ```
pub struct JsonSchema {
    document: Value,
    validator: jsonschema::Validator,
    coerce: bool,
}

impl JsonSchema {
    /// Compile a schema document
    pub fn compile(document: Value) -> Result<Self, ContractError> {
        let validator = jsonschema::validator_for(&document)
            .map_err(|e| ContractError::InvalidSchema(e.to_string()))?;

        Ok(Self {
            document,
            validator,
            coerce: false,
        })
    }

    /// Parse primitive strings according to the declared types before validating
    pub fn coerce_primitives(mut self) -> Self {
        self.coerce = true;
        self
    }

    /// The schema document this validator was compiled from
    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn into_ref(self) -> SchemaRef {
        Arc::new(self)
    }
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema")
            .field("document", &self.document)
            .field("coerce", &self.coerce)
            .finish()
    }
}

impl From<JsonSchema> for SchemaRef {
    fn from(schema: JsonSchema) -> Self {
        schema.into_ref()
    }
}

impl Schema for JsonSchema {
    fn validate(&self, mut value: Value) -> Result<Value, ValidationFailure> {
        if self.coerce {
            coerce(&self.document, &mut value);
        }

        let issues: Vec<ValidationIssue> = self
            .validator
            .iter_errors(&value)
            .map(|error| ValidationIssue::new(error.instance_path.to_string(), error.to_string()))
            .collect();

        if issues.is_empty() {
            Ok(value)
        } else {
            Err(ValidationFailure::new(issues))
        }
    }
}

fn coerce(schema: &Value, value: &mut Value) {
    match value {
        Value::String(text) => {
            if let Some(coerced) = coerce_scalar(schema, text) {
                *value = coerced;
            }
        }
        Value::Object(fields) => {
            let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                return;
            };
            for (name, field) in fields.iter_mut() {
                if let Some(field_schema) = properties.get(name) {
                    coerce(field_schema, field);
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for item in items {
                    coerce(item_schema, item);
                }
            }
        }
        _ => {}
    }
}

fn coerce_scalar(schema: &Value, text: &str) -> Option<Value> {
    let declared: Vec<&str> = match schema.get("type") {
        Some(Value::String(kind)) => vec![kind.as_str()],
        Some(Value::Array(kinds)) => kinds.iter().filter_map(Value::as_str).collect(),
        _ => return None,
    };

    // A string is already acceptable, leave it alone
    if declared.contains(&"string") {
        return None;
    }

    declared.into_iter().find_map(|kind| match kind {
        "integer" => text.parse::<i64>().ok().map(Value::from),
        "number" => text
            .parse::<i64>()
            .ok()
            .map(Value::from)
            .or_else(|| text.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)),
        "boolean" => match text {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    })
}
