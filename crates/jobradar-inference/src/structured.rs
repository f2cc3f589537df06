//! Structured-output contract: shape validation over model JSON.
//!
//! The dispatcher asks the model for a single JSON value and validates it
//! against a caller-provided [`ResponseShape`] before handing it back.
//! Models routinely wrap JSON in markdown code fences and occasionally
//! return a list field as a comma-separated string; both are normalized
//! here. Anything else that deviates from the shape is a parse error,
//! never a silent default.

use serde_json::{Map, Value};

use jobradar_core::{Error, Result};

/// Scalar or list kind expected for a structured field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// JSON string.
    Text,
    /// JSON array of strings. A bare string is coerced by comma-splitting.
    TextList,
    /// Non-negative JSON integer.
    Integer,
}

#[derive(Debug, Clone)]
struct FieldSpec {
    name: &'static str,
    kind: FieldKind,
    required: bool,
}

/// Expected shape of a structured response: a set of field names with
/// scalar / list kinds.
#[derive(Debug, Clone, Default)]
pub struct ResponseShape {
    fields: Vec<FieldSpec>,
}

impl ResponseShape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field.
    pub fn field(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind,
            required: true,
        });
        self
    }

    /// Add an optional field. Missing or null values are dropped; present
    /// values are still validated against the kind.
    pub fn optional(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind,
            required: false,
        });
        self
    }

    /// Validate and normalize one JSON object against this shape.
    ///
    /// Returns the object with list coercions applied. Unknown fields are
    /// passed through untouched.
    fn apply(&self, value: Value) -> Result<Map<String, Value>> {
        let mut object = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::Parse(format!(
                    "Expected a JSON object, got {}",
                    kind_name(&other)
                )))
            }
        };

        for spec in &self.fields {
            let entry = object.get(spec.name).cloned();
            match entry {
                None | Some(Value::Null) => {
                    if spec.required {
                        return Err(Error::Parse(format!("Missing field: {}", spec.name)));
                    }
                    object.remove(spec.name);
                }
                Some(value) => {
                    let normalized = normalize_field(spec.name, spec.kind, value)?;
                    object.insert(spec.name.to_string(), normalized);
                }
            }
        }

        Ok(object)
    }
}

/// Strip surrounding markdown code-fence markup from a model reply.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse a model reply into a single shape-validated JSON object.
pub fn parse_object(raw: &str, shape: &ResponseShape) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| Error::Parse(format!("Model returned invalid JSON: {e}")))?;
    shape.apply(value)
}

/// Parse a model reply into a JSON array of shape-validated objects.
///
/// Used for batched prompts (combined gap analysis) where one call
/// returns one object per input item, in input order.
pub fn parse_array(raw: &str, shape: &ResponseShape) -> Result<Vec<Map<String, Value>>> {
    let value: Value = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| Error::Parse(format!("Model returned invalid JSON: {e}")))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(Error::Parse(format!(
                "Expected a JSON array, got {}",
                kind_name(&other)
            )))
        }
    };

    items.into_iter().map(|item| shape.apply(item)).collect()
}

fn normalize_field(name: &str, kind: FieldKind, value: Value) -> Result<Value> {
    match kind {
        FieldKind::Text => match value {
            Value::String(_) => Ok(value),
            other => Err(mistyped(name, "string", &other)),
        },
        FieldKind::TextList => match value {
            Value::Array(items) => {
                if items.iter().all(Value::is_string) {
                    Ok(Value::Array(items))
                } else {
                    Err(Error::Parse(format!(
                        "Mistyped field {name}: expected an array of strings"
                    )))
                }
            }
            // Models sometimes flatten a list into "a, b, c".
            Value::String(s) => Ok(Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            )),
            other => Err(mistyped(name, "array of strings", &other)),
        },
        FieldKind::Integer => match value {
            Value::Number(ref n) if n.as_u64().is_some() => Ok(value),
            other => Err(mistyped(name, "non-negative integer", &other)),
        },
    }
}

fn mistyped(name: &str, expected: &str, got: &Value) -> Error {
    Error::Parse(format!(
        "Mistyped field {name}: expected {expected}, got {}",
        kind_name(got)
    ))
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
