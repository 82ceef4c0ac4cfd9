use serde::Serialize;
use serde_json::Value;

/// Positional metadata exposed as `forloop` while iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForLoop {
    pub first: bool,
    pub index: usize,
    pub index0: usize,
    pub last: bool,
    pub length: usize,
    pub rindex: usize,
    pub rindex0: usize,
}

impl ForLoop {
    /// Metadata for position `index0` of a collection of `length` elements.
    pub fn new(index0: usize, length: usize) -> Self {
        Self {
            first: index0 == 0,
            index: index0 + 1,
            index0,
            last: index0 + 1 == length,
            length,
            rindex: length - index0,
            rindex0: length - index0 - 1,
        }
    }

    pub fn to_value(self) -> Value {
        serde_json::json!(self)
    }
}

/// Elements of a value that supports element-wise iteration. Objects yield
/// `[key, value]` pairs; scalars and nil are not iterable.
pub fn iterable(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::Object(map) => Some(
            map.iter()
                .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
                .collect(),
        ),
        _ => None,
    }
}
