//! [`Value`]: the native value graph handled by the coder.
//!
//! Strings and compound values live behind `Rc` allocations. Cloning a
//! `Value` shares the allocation, and the coder preserves that sharing: a
//! value reachable from two places in a graph is written once and decodes
//! back into a single allocation.

mod extension;
mod number;
mod typed_array;

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

pub use extension::{Extension, SerializedObject};
pub use number::Number;
pub use typed_array::TypedArray;

/// Interior-mutable shared allocation used by compound values.
pub type Shared<T> = Rc<RefCell<T>>;

/// String-keyed map. Insertion order only affects output order.
pub type Map = IndexMap<String, Value>;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(Rc<str>),
    Array(Shared<Vec<Value>>),
    Map(Shared<Map>),
    TypedArray(Shared<TypedArray>),
    Extension(Extension),
    Serialized(SerializedObject),
}

/// Variant tag of a [`Value`], used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Map,
    TypedArray,
    Extension,
    Serialized,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Map => "map",
            ValueKind::TypedArray => "typed array",
            ValueKind::Extension => "extension",
            ValueKind::Serialized => "serialized object",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn map<K, V, I>(entries: I) -> Value
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let map: Map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Value::Map(Rc::new(RefCell::new(map)))
    }

    pub fn empty_map() -> Value {
        Value::Map(Rc::new(RefCell::new(Map::new())))
    }

    pub fn string(s: impl AsRef<str>) -> Value {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn typed_array(array: impl Into<TypedArray>) -> Value {
        Value::TypedArray(Rc::new(RefCell::new(array.into())))
    }

    /// Wraps an application value handled by a registered adaptor.
    pub fn extension<T: std::any::Any + PartialEq + fmt::Debug>(native: T) -> Value {
        Value::Extension(Extension::new(native))
    }

    /// Wraps an application value that falls back to serialization when no
    /// adaptor is registered for its type.
    pub fn serializable<T>(native: T) -> Value
    where
        T: std::any::Any + PartialEq + fmt::Debug + serde::Serialize,
    {
        Value::Extension(Extension::serializable(native))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
            Value::TypedArray(_) => ValueKind::TypedArray,
            Value::Extension(_) => ValueKind::Extension,
            Value::Serialized(_) => ValueKind::Serialized,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(|n| n.as_i64())
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().map(|n| n.as_f64())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<Ref<'_, Vec<Value>>> {
        match self {
            Value::Array(items) => Some(items.borrow()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<Ref<'_, Map>> {
        match self {
            Value::Map(map) => Some(map.borrow()),
            _ => None,
        }
    }

    pub fn as_typed_array(&self) -> Option<Ref<'_, TypedArray>> {
        match self {
            Value::TypedArray(array) => Some(array.borrow()),
            _ => None,
        }
    }

    pub fn as_extension(&self) -> Option<&Extension> {
        match self {
            Value::Extension(ext) => Some(ext),
            _ => None,
        }
    }

    pub fn as_serialized(&self) -> Option<&SerializedObject> {
        match self {
            Value::Serialized(obj) => Some(obj),
            _ => None,
        }
    }

    /// Map entry by key (a clone sharing the same allocation).
    pub fn get(&self, key: &str) -> Option<Value> {
        self.as_map().and_then(|map| map.get(key).cloned())
    }

    /// Array element by index (a clone sharing the same allocation).
    pub fn at(&self, index: usize) -> Option<Value> {
        self.as_array().and_then(|items| items.get(index).cloned())
    }

    /// Allocation address of identity-bearing values.
    ///
    /// Only meaningful while the allocation is alive; two live values with
    /// the same identity are the same object.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(Rc::as_ptr(s) as *const u8 as usize),
            Value::Array(items) => Some(Rc::as_ptr(items) as usize),
            Value::Map(map) => Some(Rc::as_ptr(map) as usize),
            Value::TypedArray(array) => Some(Rc::as_ptr(array) as usize),
            Value::Extension(ext) => Some(ext.identity()),
            _ => None,
        }
    }

    /// `true` when both values are the same allocation.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Deep structural equality.
///
/// Shared allocations short-circuit, but two distinct cyclic graphs recurse
/// without bound; compare those with [`Value::ptr_eq`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::TypedArray(a), Value::TypedArray(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Extension(a), Value::Extension(b)) => a == b,
            (Value::Serialized(a), Value::Serialized(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Array(items) => match items.try_borrow() {
                Ok(items) => f.debug_list().entries(items.iter()).finish(),
                Err(_) => f.write_str("Array(<borrowed>)"),
            },
            Value::Map(map) => match map.try_borrow() {
                Ok(map) => f.debug_map().entries(map.iter()).finish(),
                Err(_) => f.write_str("Map(<borrowed>)"),
            },
            Value::TypedArray(array) => match array.try_borrow() {
                Ok(array) => fmt::Debug::fmt(&*array, f),
                Err(_) => f.write_str("TypedArray(<borrowed>)"),
            },
            Value::Extension(ext) => fmt::Debug::fmt(ext, f),
            Value::Serialized(obj) => fmt::Debug::fmt(obj, f),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

macro_rules! number_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Number(Number::from(v))
                }
            }
        )*
    };
}

number_value_from!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(Rc::new(RefCell::new(map)))
    }
}

impl From<TypedArray> for Value {
    fn from(array: TypedArray) -> Self {
        Value::typed_array(array)
    }
}

impl From<Extension> for Value {
    fn from(ext: Extension) -> Self {
        Value::Extension(ext)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
