//! Validator gateway
//!
//! A [`Schema`] is an opaque validation capability: it checks a JSON value and may
//! coerce it (numeric strings to numbers, for instance). Callers must always continue
//! with the returned value, never with the input. A missing schema means
//! "no validation": [`validate`] passes the value through unchanged.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Validation capability for one request or response slot
pub trait Schema: Send + Sync + fmt::Debug {
    /// Validate `value`, returning the (possibly coerced) value to use downstream
    fn validate(&self, value: Value) -> Result<Value, ValidationFailure>;
}

/// Shared schema handle stored on routes
pub type SchemaRef = Arc<dyn Schema>;

/// Run `value` through `schema`, or pass it through unchanged when there is none
pub fn validate(schema: Option<&SchemaRef>, value: Value) -> Result<Value, ValidationFailure> {
    match schema {
        Some(schema) => schema.validate(value),
        None => Ok(value),
    }
}

/// One problem found while validating a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// JSON pointer to the offending value (empty for the root)
    pub path: String,
    /// Human-readable description
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Structured validation failure, passed through verbatim in 400 bodies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationFailure {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// Failure with a single issue
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![ValidationIssue::new(path, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, issue) in self.issues.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            let path = if issue.path.is_empty() {
                "(root)"
            } else {
                issue.path.as_str()
            };
            write!(f, "{}: {}", path, issue.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// A schema backed by a closure
pub struct FnSchema<F> {
    check: F,
}

impl<F> fmt::Debug for FnSchema<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSchema").finish_non_exhaustive()
    }
}

impl<F> Schema for FnSchema<F>
where
    F: Fn(Value) -> Result<Value, ValidationFailure> + Send + Sync,
{
    fn validate(&self, value: Value) -> Result<Value, ValidationFailure> {
        (self.check)(value)
    }
}

/// Build a schema from a closure
///
/// ```rust
/// use restype_core::{schema_fn, ValidationFailure};
/// use serde_json::{json, Value};
///
/// let non_empty = schema_fn(|value: Value| match value.as_str() {
///     Some(text) if !text.is_empty() => Ok(value),
///     _ => Err(ValidationFailure::single("", "expected a non-empty string")),
/// });
///
/// assert!(non_empty.validate(json!("ok")).is_ok());
/// assert!(non_empty.validate(json!("")).is_err());
/// ```
pub fn schema_fn<F>(check: F) -> SchemaRef
where
    F: Fn(Value) -> Result<Value, ValidationFailure> + Send + Sync + 'static,
{
    Arc::new(FnSchema { check })
}
