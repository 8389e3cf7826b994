use std::collections::HashMap;

use super::census::{tracked_identity, ExtensionForm, ReferenceCensus};
use super::{
    ARRAY_KEY, ID_KEY, ITEM_TYPE_KEY, REF_KEY, SERIALIZATION_KEY, TYPE_KEY, VALUE_KEY,
};
use crate::adaptor::AdaptorRegistry;
use crate::error::CoderError;
use crate::options::CoderOptions;
use crate::value::{Extension, Map, Number, TypedArray, Value};

/// Writes a [`Value`] graph as reference-preserving JSON.
///
/// Encoding runs in two passes. The first counts how often each shared
/// allocation is reached; the second writes the text, wrapping the first
/// occurrence of every multiply-reached allocation in a definition and
/// replacing later occurrences with references. Reference ids are assigned
/// in output order starting at 0.
///
/// The encoder can be reused; each call to [`JsonEncoder::encode`] starts
/// from a clean state.
pub struct JsonEncoder<'a> {
    registry: &'a AdaptorRegistry,
    options: &'a CoderOptions,
    out: String,
    census: ReferenceCensus,
    assigned: HashMap<usize, u64>,
}

impl<'a> JsonEncoder<'a> {
    pub fn new(registry: &'a AdaptorRegistry, options: &'a CoderOptions) -> Self {
        Self {
            registry,
            options,
            out: String::new(),
            census: ReferenceCensus::default(),
            assigned: HashMap::new(),
        }
    }

    pub fn encode(&mut self, value: &Value) -> Result<String, CoderError> {
        self.out.clear();
        self.assigned.clear();
        self.census = ReferenceCensus::take(value, self.registry, self.options)?;
        let result = self.write_any(value);
        // Drop cached representations before returning.
        let shared = self.census.shared_count();
        self.census = ReferenceCensus::default();
        result?;
        let text = std::mem::take(&mut self.out);
        tracing::debug!(bytes = text.len(), shared, "encoded value graph");
        Ok(text)
    }

    fn write_any(&mut self, value: &Value) -> Result<(), CoderError> {
        if let Some(identity) = tracked_identity(value, self.options) {
            if self.census.is_shared(identity) {
                if let Some(&id) = self.assigned.get(&identity) {
                    self.write_reference(id);
                    return Ok(());
                }
                // Registered before the contents so a cycle back to this value
                // becomes a reference.
                let id = self.assigned.len() as u64;
                self.assigned.insert(identity, id);
                self.out.push('{');
                self.write_key(ID_KEY);
                self.out.push_str(&id.to_string());
                self.out.push(',');
                self.write_key(VALUE_KEY);
                self.write_inline(value)?;
                self.out.push('}');
                return Ok(());
            }
        }
        self.write_inline(value)
    }

    fn write_inline(&mut self, value: &Value) -> Result<(), CoderError> {
        match value {
            Value::Null => self.write_null(),
            Value::Bool(b) => self.write_boolean(*b),
            Value::Number(n) => self.write_number(n),
            Value::String(s) => self.write_str(s),
            Value::Array(items) => self.write_arr(&items.borrow())?,
            Value::Map(map) => self.write_obj(&map.borrow())?,
            Value::TypedArray(array) => self.write_typed_arr(&array.borrow())?,
            Value::Extension(ext) => self.write_extension(ext)?,
            Value::Serialized(obj) => self.write_serialized(obj.bytes()),
        }
        Ok(())
    }

    fn write_null(&mut self) {
        self.out.push_str("null");
    }

    fn write_boolean(&mut self, b: bool) {
        self.out.push_str(if b { "true" } else { "false" });
    }

    fn write_number(&mut self, n: &Number) {
        self.out.push_str(&n.to_string());
    }

    /// Only `"` and `\` are escaped; every other character is written as is.
    fn write_str(&mut self, s: &str) {
        self.out.reserve(s.len() + 2);
        self.out.push('"');
        if !s.bytes().any(|b| b == b'"' || b == b'\\') {
            self.out.push_str(s);
        } else {
            for ch in s.chars() {
                if ch == '"' || ch == '\\' {
                    self.out.push('\\');
                }
                self.out.push(ch);
            }
        }
        self.out.push('"');
    }

    fn write_key(&mut self, key: &str) {
        self.write_str(key);
        self.out.push(':');
    }

    fn write_reference(&mut self, id: u64) {
        self.out.push('{');
        self.write_key(REF_KEY);
        self.out.push_str(&id.to_string());
        self.out.push('}');
    }

    fn write_arr(&mut self, items: &[Value]) -> Result<(), CoderError> {
        self.out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.write_any(item)?;
        }
        self.out.push(']');
        Ok(())
    }

    fn write_obj(&mut self, map: &Map) -> Result<(), CoderError> {
        self.out.push('{');
        for (i, (key, value)) in map.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.write_key(key);
            self.write_any(value)?;
        }
        self.out.push('}');
        Ok(())
    }

    fn write_typed_arr(&mut self, array: &TypedArray) -> Result<(), CoderError> {
        self.out.push('{');
        self.write_key(ITEM_TYPE_KEY);
        self.write_str(array.item_type_name());
        self.out.push(',');
        self.write_key(ARRAY_KEY);
        match array {
            TypedArray::Object { items, .. } => self.write_arr(items)?,
            primitive => {
                let items: Vec<Value> = primitive.into();
                self.write_arr(&items)?;
            }
        }
        self.out.push('}');
        Ok(())
    }

    fn write_extension(&mut self, ext: &Extension) -> Result<(), CoderError> {
        let form = self
            .census
            .extension_form(ext)
            .cloned()
            .ok_or_else(|| CoderError::UnsupportedType(ext.type_name().to_string()))?;
        match form {
            ExtensionForm::Adapted {
                type_name,
                representation,
            } => {
                self.out.push('{');
                self.write_key(TYPE_KEY);
                self.write_str(&type_name);
                self.out.push(',');
                self.write_key(VALUE_KEY);
                self.write_any(&representation)?;
                self.out.push('}');
            }
            ExtensionForm::Serialized(obj) => self.write_serialized(obj.bytes()),
        }
        Ok(())
    }

    /// Bytes are written as signed values, like a Java `byte[]`.
    fn write_serialized(&mut self, bytes: &[u8]) {
        self.out.push('{');
        self.write_key(SERIALIZATION_KEY);
        self.out.push('[');
        for (i, byte) in bytes.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.out.push_str(&(*byte as i8).to_string());
        }
        self.out.push_str("]}");
    }
}
