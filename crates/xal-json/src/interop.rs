//! Bridging between [`Value`] and `serde_json::Value`.

use serde_json::Value as JsonValue;

use crate::error::CoderError;
use crate::options::CoderOptions;
use crate::value::{Map, Number, Value};

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::from(i),
                None => n.as_f64().map_or(Value::Null, Value::from),
            },
            JsonValue::String(s) => Value::from(s),
            JsonValue::Array(items) => Value::array(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => Value::from(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect::<Map>(),
            ),
        }
    }
}

impl Value {
    /// Converts to plain JSON, expanding every alias into a copy.
    ///
    /// Typed arrays become arrays and non-finite floats become `null`.
    /// Extensions and serialized payloads have no plain form and fail with
    /// [`CoderError::UnsupportedType`]; a cyclic graph fails with
    /// [`CoderError::DepthLimit`].
    pub fn to_plain_json(&self) -> Result<JsonValue, CoderError> {
        self.to_plain_json_with(&CoderOptions::default())
    }

    /// [`Value::to_plain_json`] with the nesting limit taken from `options`.
    pub fn to_plain_json_with(&self, options: &CoderOptions) -> Result<JsonValue, CoderError> {
        to_plain(self, 0, options.max_depth)
    }
}

fn to_plain(value: &Value, depth: usize, max_depth: usize) -> Result<JsonValue, CoderError> {
    if depth > max_depth {
        return Err(CoderError::DepthLimit(max_depth));
    }
    let json = match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(Number::Integer(i)) => JsonValue::from(*i),
        Value::Number(Number::Float(f)) => {
            serde_json::Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number)
        }
        Value::String(s) => JsonValue::String(s.to_string()),
        Value::Array(items) => plain_array(&items.borrow(), depth, max_depth)?,
        Value::Map(map) => JsonValue::Object(
            map.borrow()
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_plain(v, depth + 1, max_depth)?)))
                .collect::<Result<_, CoderError>>()?,
        ),
        Value::TypedArray(array) => {
            let items: Vec<Value> = (&*array.borrow()).into();
            plain_array(&items, depth, max_depth)?
        }
        Value::Extension(ext) => {
            return Err(CoderError::UnsupportedType(ext.type_name().to_string()))
        }
        Value::Serialized(_) => {
            return Err(CoderError::UnsupportedType(value.kind().to_string()))
        }
    };
    Ok(json)
}

fn plain_array(items: &[Value], depth: usize, max_depth: usize) -> Result<JsonValue, CoderError> {
    items
        .iter()
        .map(|item| to_plain(item, depth + 1, max_depth))
        .collect::<Result<Vec<_>, _>>()
        .map(JsonValue::Array)
}
