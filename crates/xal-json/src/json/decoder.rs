use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{ARRAY_KEY, ID_KEY, ITEM_TYPE_KEY, REF_KEY, SERIALIZATION_KEY, TYPE_KEY, VALUE_KEY};
use crate::adaptor::AdaptorRegistry;
use crate::error::CoderError;
use crate::options::CoderOptions;
use crate::value::{Map, Number, SerializedObject, Shared, TypedArray, Value};

type Members = Vec<(String, Value)>;

/// Recursive descent reader for reference-preserving JSON.
///
/// Any well-formed JSON document decodes to plain values. Maps with one of
/// the reserved shapes are turned back into shared values, extensions, typed
/// arrays or serialized payloads. The reference table lives for a single
/// call; ids never leak from one document into the next.
pub struct JsonDecoder<'a> {
    registry: &'a AdaptorRegistry,
    options: &'a CoderOptions,
    text: &'a str,
    x: usize,
    depth: usize,
    references: HashMap<i64, Value>,
}

impl<'a> JsonDecoder<'a> {
    pub fn new(registry: &'a AdaptorRegistry, options: &'a CoderOptions) -> Self {
        Self {
            registry,
            options,
            text: "",
            x: 0,
            depth: 0,
            references: HashMap::new(),
        }
    }

    /// Decodes `text`, which must hold exactly one value plus optional
    /// surrounding whitespace.
    pub fn decode(&mut self, text: &'a str) -> Result<Value, CoderError> {
        self.reset(text);
        let value = self.read_any()?;
        self.skip_whitespace();
        if self.x < self.text.len() {
            return Err(self.unexpected());
        }
        tracing::debug!(
            bytes = self.text.len(),
            references = self.references.len(),
            "decoded value graph"
        );
        Ok(value)
    }

    /// Decodes the first value in `text` and returns it together with the
    /// unconsumed rest of the input.
    pub fn decode_prefix(&mut self, text: &'a str) -> Result<(Value, &'a str), CoderError> {
        self.reset(text);
        let value = self.read_any()?;
        Ok((value, &self.text[self.x..]))
    }

    fn reset(&mut self, text: &'a str) {
        self.text = text;
        self.x = 0;
        self.depth = 0;
        self.references.clear();
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.x).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.x += 1;
        }
    }

    fn unexpected(&self) -> CoderError {
        match self.text.get(self.x..).and_then(|rest| rest.chars().next()) {
            Some(found) => CoderError::UnexpectedCharacter {
                found,
                position: self.x,
            },
            None => CoderError::UnexpectedEnd(self.x),
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), CoderError> {
        if self.peek() == Some(byte) {
            self.x += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn nested<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, CoderError>,
    ) -> Result<T, CoderError> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(CoderError::DepthLimit(self.options.max_depth));
        }
        let result = read(self);
        self.depth -= 1;
        result
    }

    fn read_any(&mut self) -> Result<Value, CoderError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(CoderError::UnexpectedEnd(self.x)),
            Some(b'"') => Ok(Value::String(Rc::from(self.read_str()?))),
            Some(b'[') => self.nested(|d| {
                let items: Shared<Vec<Value>> = Rc::default();
                d.read_arr_into(&items)?;
                Ok(Value::Array(items))
            }),
            Some(b'{') => self.nested(|d| d.read_obj()),
            Some(b't') => self.read_literal("true", Value::Bool(true)),
            Some(b'f') => self.read_literal("false", Value::Bool(false)),
            Some(b'n') => self.read_literal("null", Value::Null),
            Some(b'+' | b'-' | b'.' | b'0'..=b'9') => self.read_num(),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn read_literal(&mut self, word: &str, value: Value) -> Result<Value, CoderError> {
        let rest = &self.text.as_bytes()[self.x..];
        if rest.starts_with(word.as_bytes()) {
            self.x += word.len();
            return Ok(value);
        }
        let matched = word
            .bytes()
            .zip(rest.iter())
            .take_while(|(a, b)| a == *b)
            .count();
        self.x += matched;
        Err(self.unexpected())
    }

    /// Integers without a fraction or exponent decode as `i64`, falling back
    /// to `f64` when they do not fit.
    fn read_num(&mut self) -> Result<Value, CoderError> {
        let start = self.x;
        let bytes = self.text.as_bytes();
        let mut is_float = false;
        while let Some(&b) = bytes.get(self.x) {
            match b {
                b'0'..=b'9' | b'+' | b'-' => {}
                b'.' | b'e' | b'E' => is_float = true,
                _ => break,
            }
            self.x += 1;
        }
        let token = &self.text[start..self.x];
        if !is_float {
            if let Ok(i) = token.parse::<i64>() {
                return Ok(Value::Number(Number::Integer(i)));
            }
        }
        token
            .parse::<f64>()
            .map(|f| Value::Number(Number::Float(f)))
            .map_err(|_| CoderError::InvalidNumber {
                text: token.to_string(),
                position: start,
            })
    }

    fn read_str(&mut self) -> Result<String, CoderError> {
        self.expect(b'"')?;
        let text = self.text;
        let bytes = text.as_bytes();
        let mut out = String::new();
        let mut chunk = self.x;
        loop {
            match bytes.get(self.x) {
                None => return Err(CoderError::UnexpectedEnd(self.x)),
                Some(b'"') => {
                    out.push_str(&text[chunk..self.x]);
                    self.x += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    out.push_str(&text[chunk..self.x]);
                    out.push(self.read_escape()?);
                    chunk = self.x;
                }
                Some(_) => self.x += 1,
            }
        }
    }

    fn read_escape(&mut self) -> Result<char, CoderError> {
        let start = self.x;
        let code = self
            .text
            .as_bytes()
            .get(start + 1)
            .copied()
            .ok_or(CoderError::UnexpectedEnd(start + 1))?;
        self.x += 2;
        let ch = match code {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                let unit = self.read_hex4(start)?;
                if (0xD800..0xDC00).contains(&unit) {
                    if !self.text[self.x..].starts_with("\\u") {
                        return Err(CoderError::InvalidEscape(start));
                    }
                    self.x += 2;
                    let low = self.read_hex4(start)?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(CoderError::InvalidEscape(start));
                    }
                    let code_point = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                    char::from_u32(code_point).ok_or(CoderError::InvalidEscape(start))?
                } else {
                    char::from_u32(unit).ok_or(CoderError::InvalidEscape(start))?
                }
            }
            _ => return Err(CoderError::InvalidEscape(start)),
        };
        Ok(ch)
    }

    fn read_hex4(&mut self, escape_start: usize) -> Result<u32, CoderError> {
        let digits = self
            .text
            .get(self.x..self.x + 4)
            .filter(|d| d.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or(CoderError::InvalidEscape(escape_start))?;
        let unit =
            u32::from_str_radix(digits, 16).map_err(|_| CoderError::InvalidEscape(escape_start))?;
        self.x += 4;
        Ok(unit)
    }

    fn read_arr_into(&mut self, items: &Shared<Vec<Value>>) -> Result<(), CoderError> {
        self.expect(b'[')?;
        let mut first = true;
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(CoderError::UnexpectedEnd(self.x)),
                Some(b']') => {
                    self.x += 1;
                    return Ok(());
                }
                Some(b',') if !first => self.x += 1,
                Some(_) if first => {}
                Some(_) => return Err(self.unexpected()),
            }
            let item = self.read_any()?;
            items.borrow_mut().push(item);
            first = false;
        }
    }

    fn read_obj(&mut self) -> Result<Value, CoderError> {
        self.expect(b'{')?;
        self.skip_whitespace();
        if self.at_key(ID_KEY) {
            return self.read_definition();
        }
        let members = self.read_members(Vec::new())?;
        self.classify(members, None)
    }

    fn at_key(&self, key: &str) -> bool {
        let rest = &self.text.as_bytes()[self.x..];
        rest.first() == Some(&b'"')
            && rest[1..].starts_with(key.as_bytes())
            && rest.get(key.len() + 1) == Some(&b'"')
    }

    fn read_key(&mut self) -> Result<String, CoderError> {
        self.skip_whitespace();
        if self.peek() != Some(b'"') {
            return Err(self.unexpected());
        }
        let key = self.read_str()?;
        self.skip_whitespace();
        self.expect(b':')?;
        Ok(key)
    }

    /// Reads members up to and including the closing `}`.
    fn read_members(&mut self, mut members: Members) -> Result<Members, CoderError> {
        let mut first = members.is_empty();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(CoderError::UnexpectedEnd(self.x)),
                Some(b'}') => {
                    self.x += 1;
                    return Ok(members);
                }
                Some(b',') if !first => self.x += 1,
                Some(_) if first => {}
                Some(_) => return Err(self.unexpected()),
            }
            let key = self.read_key()?;
            let value = self.read_any()?;
            members.push((key, value));
            first = false;
        }
    }

    /// Positioned on an `__XALID` key that opens a map.
    ///
    /// When an integer id is followed directly by `value`, an array, plain
    /// map or typed array value is registered as an empty container before
    /// its contents are read, so references from inside it resolve to the
    /// container itself. If more members follow, the map is not a definition
    /// and decodes like any other map.
    fn read_definition(&mut self) -> Result<Value, CoderError> {
        let key = self.read_key()?;
        let id_value = self.read_any()?;
        self.skip_whitespace();
        if self.peek() == Some(b',') {
            let comma = self.x;
            self.x += 1;
            self.skip_whitespace();
            if let (true, Ok(id)) = (self.at_key(VALUE_KEY), reference_id(&id_value)) {
                let value_key = self.read_key()?;
                let value = self.read_defined_value(id)?;
                self.skip_whitespace();
                if self.peek() == Some(b'}') {
                    self.x += 1;
                    return Ok(value);
                }
                self.references.remove(&id);
                // Only a definition may be referenced from inside itself.
                if alias_count(&value) > 1 {
                    return Err(CoderError::UnresolvedReference(id));
                }
                let members = self.read_members(vec![(key, id_value), (value_key, value)])?;
                return self.classify(members, None);
            }
            self.x = comma;
        }
        let members = self.read_members(vec![(key, id_value)])?;
        self.classify(members, None)
    }

    fn read_defined_value(&mut self, id: i64) -> Result<Value, CoderError> {
        self.skip_whitespace();
        let value = match self.peek() {
            Some(b'[') => self.nested(|d| {
                let items: Shared<Vec<Value>> = Rc::default();
                d.define(id, Value::Array(items.clone()));
                d.read_arr_into(&items)?;
                Ok(Value::Array(items))
            })?,
            Some(b'{') => self.nested(|d| d.read_defined_obj(id))?,
            _ => self.read_any()?,
        };
        self.define(id, value.clone());
        Ok(value)
    }

    /// Reads the map holding the value of definition `id`.
    ///
    /// A placeholder that was handed out to a reference but does not become
    /// the final value is an error: the reference would point at the wrong
    /// allocation.
    fn read_defined_obj(&mut self, id: i64) -> Result<Value, CoderError> {
        self.expect(b'{')?;
        self.skip_whitespace();
        if self.at_key(ID_KEY) {
            return self.read_definition();
        }
        if self.at_key(ITEM_TYPE_KEY) {
            return self.read_defined_typed_array(id);
        }
        let map: Shared<Map> = Rc::default();
        self.define(id, Value::Map(map.clone()));
        let members = self.read_members(Vec::new())?;
        let value = self.classify(members, Some(map.clone()))?;
        match &value {
            Value::Map(result) if Rc::ptr_eq(result, &map) => Ok(value),
            _ => unused_placeholder(id, Rc::strong_count(&map), value),
        }
    }

    /// Positioned on an `__XALITEMTYPE` key. The typed array is registered
    /// before its items are read and filled in afterwards.
    fn read_defined_typed_array(&mut self, id: i64) -> Result<Value, CoderError> {
        let key = self.read_key()?;
        let item_type = self.read_any()?;
        let Some(name) = item_type.as_str().map(str::to_string) else {
            let members = self.read_members(vec![(key, item_type)])?;
            return self.classify(members, None);
        };
        let array: Shared<TypedArray> = Rc::new(RefCell::new(TypedArray::Object {
            item_type: name.clone(),
            items: Vec::new(),
        }));
        self.define(id, Value::TypedArray(array.clone()));
        let members = self.read_members(vec![(key, item_type)])?;
        if members.len() == 2 && members[1].0 == ARRAY_KEY {
            let filled = typed_array_from(&name, &members[1].1)?;
            *array.borrow_mut() = filled;
            return Ok(Value::TypedArray(array));
        }
        let value = self.classify(members, None)?;
        unused_placeholder(id, Rc::strong_count(&array), value)
    }

    fn define(&mut self, id: i64, value: Value) {
        tracing::trace!(id, kind = %value.kind(), "registered shared value");
        self.references.insert(id, value);
    }

    fn resolve(&self, id_value: &Value) -> Result<Value, CoderError> {
        let id = reference_id(id_value)?;
        self.references
            .get(&id)
            .cloned()
            .ok_or(CoderError::UnresolvedReference(id))
    }

    /// Turns the members of a finished map into the value they stand for.
    ///
    /// Reserved shapes are recognized only with exactly their own keys; a map
    /// carrying anything else is a plain map.
    fn classify(
        &mut self,
        members: Members,
        placeholder: Option<Shared<Map>>,
    ) -> Result<Value, CoderError> {
        let find = |key: &str| members.iter().find(|(k, _)| k == key).map(|(_, v)| v);
        match members.len() {
            1 if members[0].0 == REF_KEY => return self.resolve(&members[0].1),
            1 if members[0].0 == SERIALIZATION_KEY => {
                return read_serialized(&members[0].1).map(Value::Serialized)
            }
            2 => {
                if let (Some(id), Some(value)) = (find(ID_KEY), find(VALUE_KEY)) {
                    let id = reference_id(id)?;
                    let value = value.clone();
                    self.define(id, value.clone());
                    return Ok(value);
                }
                if let (Some(name), Some(value)) =
                    (find(TYPE_KEY).and_then(Value::as_str), find(VALUE_KEY))
                {
                    return self.read_extension(name, value);
                }
                if let (Some(item_type), Some(items)) =
                    (find(ITEM_TYPE_KEY).and_then(Value::as_str), find(ARRAY_KEY))
                {
                    return read_typed_array(item_type, items);
                }
            }
            _ => {}
        }
        let map = placeholder.unwrap_or_default();
        // Duplicate keys: the last one wins.
        map.borrow_mut().extend(members);
        Ok(Value::Map(map))
    }

    fn read_extension(&self, name: &str, representation: &Value) -> Result<Value, CoderError> {
        let entry = self
            .registry
            .lookup_name(name)
            .ok_or_else(|| CoderError::UnknownExtensionType(name.to_string()))?;
        let ext = entry
            .reconstruct(representation)
            .map_err(|source| CoderError::Adaptor {
                type_name: name.to_string(),
                source,
            })?;
        Ok(Value::Extension(ext))
    }
}

fn reference_id(value: &Value) -> Result<i64, CoderError> {
    match value {
        Value::Number(Number::Integer(id)) => Ok(*id),
        other => Err(CoderError::InvalidReference(format!(
            "expected an integer id, found {}",
            other.kind()
        ))),
    }
}

fn read_typed_array(item_type: &str, items: &Value) -> Result<Value, CoderError> {
    typed_array_from(item_type, items).map(Value::typed_array)
}

fn typed_array_from(item_type: &str, items: &Value) -> Result<TypedArray, CoderError> {
    let invalid = |reason: String| CoderError::InvalidTypedArray {
        item_type: item_type.to_string(),
        reason,
    };
    let items = items
        .as_array()
        .map(|items| items.to_vec())
        .ok_or_else(|| invalid(format!("expected an array, found {}", items.kind())))?;
    TypedArray::from_items(item_type, items).map_err(invalid)
}

/// Clones of a container held outside the reference table and the caller.
fn alias_count(value: &Value) -> usize {
    match value {
        Value::Array(items) => Rc::strong_count(items),
        Value::Map(map) => Rc::strong_count(map),
        Value::TypedArray(array) => Rc::strong_count(array),
        _ => 1,
    }
}

/// `holders` counts the caller's handle and the reference table entry.
fn unused_placeholder(id: i64, holders: usize, value: Value) -> Result<Value, CoderError> {
    if holders > 2 {
        return Err(CoderError::InvalidReference(format!(
            "definition {id} is referenced from inside its own {}",
            value.kind()
        )));
    }
    Ok(value)
}

/// Byte values may be written signed (-128..=-1) or unsigned (128..=255).
fn read_serialized(value: &Value) -> Result<SerializedObject, CoderError> {
    let items = value.as_array().ok_or_else(|| {
        CoderError::Serialization(format!("expected a byte array, found {}", value.kind()))
    })?;
    let bytes = items
        .iter()
        .map(|item| match item.as_i64() {
            Some(b @ -128..=255) => Ok(b as u8),
            _ => Err(CoderError::Serialization(format!(
                "{item:?} is not a byte value"
            ))),
        })
        .collect::<Result<Vec<u8>, _>>()?;
    Ok(SerializedObject::new(bytes))
}
