//! Dotted-path field mutation.
//!
//! Every form change arrives as a dotted path (`endereco.bairro`, `formsFilled.incendio`,
//! `guarnicao.0`) and a value. [`set_path`] writes the value into a JSON tree and returns
//! the new tree. It takes the root by value, so no caller can observe a half-applied
//! change or a shared level being rewritten underneath it.
//!
//! Walking rules:
//! - intermediate segments that are missing or `null` become empty objects;
//! - a decimal segment addressing an array sets that element, or appends when it equals
//!   the length; an index past that is rejected with [`FieldPathError`];
//! - a segment that meets a scalar (or a non-index segment meeting an array) overwrites
//!   it with an object. The previous value is discarded.
//!
//! The last rule only concerns the untyped tree. The wizard re-reads the result into
//! the typed draft, which rejects shapes the schema does not allow.

use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FieldPathError {
    #[error("index {index} is past the end of a list of {len} items")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A value coming from a form input.
///
/// Checkboxes produce `Bool`; text inputs and selects produce `Text`; numeric inputs may
/// produce `Number`.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldInput {
    Bool(bool),
    Text(String),
    Number(f64),
}

impl FieldInput {
    pub fn into_value(self) -> Value {
        match self {
            FieldInput::Bool(b) => Value::Bool(b),
            FieldInput::Text(s) => Value::String(s),
            // Integral values stay integers so they fit count fields.
            FieldInput::Number(n) if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 => {
                Value::from(n as i64)
            }
            FieldInput::Number(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}

impl From<bool> for FieldInput {
    fn from(value: bool) -> Self {
        FieldInput::Bool(value)
    }
}

impl From<&str> for FieldInput {
    fn from(value: &str) -> Self {
        FieldInput::Text(value.to_string())
    }
}

impl From<String> for FieldInput {
    fn from(value: String) -> Self {
        FieldInput::Text(value)
    }
}

impl From<f64> for FieldInput {
    fn from(value: f64) -> Self {
        FieldInput::Number(value)
    }
}

impl From<i64> for FieldInput {
    fn from(value: i64) -> Self {
        FieldInput::Number(value as f64)
    }
}

/// Sets `value` at `dotted_path` inside `root` and returns the new root.
///
/// An empty path returns `root` unchanged.
///
/// # Errors
///
/// Returns [`FieldPathError::IndexOutOfRange`] when an index segment addresses an array
/// element past its end.
pub fn set_path(root: Value, dotted_path: &str, value: Value) -> Result<Value, FieldPathError> {
    if dotted_path.is_empty() {
        return Ok(root);
    }
    let segments: Vec<&str> = dotted_path.split('.').collect();
    set_segments(root, &segments, value)
}

fn set_segments(node: Value, segments: &[&str], value: Value) -> Result<Value, FieldPathError> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(value);
    };

    match node {
        Value::Object(map) => set_in_object(map, head, rest, value),
        Value::Array(mut items) => match head.parse::<usize>() {
            Ok(index) if index < items.len() => {
                let child = std::mem::take(&mut items[index]);
                items[index] = set_segments(child, rest, value)?;
                Ok(Value::Array(items))
            }
            Ok(index) if index == items.len() => {
                items.push(set_segments(Value::Null, rest, value)?);
                Ok(Value::Array(items))
            }
            Ok(index) => Err(FieldPathError::IndexOutOfRange {
                index,
                len: items.len(),
            }),
            Err(_) => set_in_object(Map::new(), head, rest, value),
        },
        _ => set_in_object(Map::new(), head, rest, value),
    }
}

fn set_in_object(
    mut map: Map<String, Value>,
    head: &str,
    rest: &[&str],
    value: Value,
) -> Result<Value, FieldPathError> {
    let slot = map.entry(head.to_string()).or_insert(Value::Null);
    let child = std::mem::take(slot);
    *slot = set_segments(child, rest, value)?;
    Ok(Value::Object(map))
}

/// Reads the value at `dotted_path`, if every segment exists.
///
/// An empty path addresses the root itself.
pub fn get_path<'a>(root: &'a Value, dotted_path: &str) -> Option<&'a Value> {
    if dotted_path.is_empty() {
        return Some(root);
    }
    dotted_path
        .split('.')
        .try_fold(root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// First segment of a dotted path.
pub fn root_segment(dotted_path: &str) -> &str {
    dotted_path.split('.').next().unwrap_or_default()
}
