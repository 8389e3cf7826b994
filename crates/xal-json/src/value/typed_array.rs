//! [`TypedArray`]: homogeneous arrays written with their component type.

use super::Value;

/// An array whose component type is carried through encoding, so it decodes
/// back to the same element type instead of a plain `Vec<Value>`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Char(Vec<char>),
    /// Array of arbitrary values tagged with an application item type name.
    Object { item_type: String, items: Vec<Value> },
}

impl TypedArray {
    /// Component type name written under `__XALITEMTYPE`.
    pub fn item_type_name(&self) -> &str {
        match self {
            TypedArray::Bool(_) => "bool",
            TypedArray::I8(_) => "i8",
            TypedArray::I16(_) => "i16",
            TypedArray::I32(_) => "i32",
            TypedArray::I64(_) => "i64",
            TypedArray::F32(_) => "f32",
            TypedArray::F64(_) => "f64",
            TypedArray::Char(_) => "char",
            TypedArray::Object { item_type, .. } => item_type,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TypedArray::Bool(v) => v.len(),
            TypedArray::I8(v) => v.len(),
            TypedArray::I16(v) => v.len(),
            TypedArray::I32(v) => v.len(),
            TypedArray::I64(v) => v.len(),
            TypedArray::F32(v) => v.len(),
            TypedArray::F64(v) => v.len(),
            TypedArray::Char(v) => v.len(),
            TypedArray::Object { items, .. } => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `index` as a [`Value`].
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            TypedArray::Bool(v) => v.get(index).map(|b| Value::Bool(*b)),
            TypedArray::I8(v) => v.get(index).map(|n| Value::from(*n)),
            TypedArray::I16(v) => v.get(index).map(|n| Value::from(*n)),
            TypedArray::I32(v) => v.get(index).map(|n| Value::from(*n)),
            TypedArray::I64(v) => v.get(index).map(|n| Value::from(*n)),
            TypedArray::F32(v) => v.get(index).map(|n| Value::from(*n)),
            TypedArray::F64(v) => v.get(index).map(|n| Value::from(*n)),
            TypedArray::Char(v) => v.get(index).map(|c| Value::from(c.to_string())),
            TypedArray::Object { items, .. } => items.get(index).cloned(),
        }
    }

    /// Rebuilds a typed array from decoded items.
    ///
    /// Primitive component names from Java producers (`int`, `double`, ...)
    /// are accepted as aliases; any other name yields an object array.
    pub fn from_items(item_type: &str, items: Vec<Value>) -> Result<TypedArray, String> {
        let array = match item_type {
            "bool" | "boolean" => TypedArray::Bool(collect(items, |v| v.as_bool())?),
            "i8" | "byte" => TypedArray::I8(collect(items, |v| narrow(v))?),
            "i16" | "short" => TypedArray::I16(collect(items, |v| narrow(v))?),
            "i32" | "int" => TypedArray::I32(collect(items, |v| narrow(v))?),
            "i64" | "long" => TypedArray::I64(collect(items, |v| v.as_i64())?),
            "f32" | "float" => TypedArray::F32(collect(items, |v| float(v).map(|f| f as f32))?),
            "f64" | "double" => TypedArray::F64(collect(items, float)?),
            "char" => TypedArray::Char(collect(items, single_char)?),
            other => TypedArray::Object {
                item_type: other.to_string(),
                items,
            },
        };
        Ok(array)
    }
}

fn collect<T>(items: Vec<Value>, f: impl Fn(&Value) -> Option<T>) -> Result<Vec<T>, String> {
    items
        .iter()
        .enumerate()
        .map(|(i, v)| f(v).ok_or_else(|| format!("item {i} is an incompatible {}", v.kind())))
        .collect()
}

fn narrow<T: TryFrom<i64>>(value: &Value) -> Option<T> {
    value.as_i64().and_then(|i| T::try_from(i).ok())
}

/// NaN is written as `null`.
fn float(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(f64::NAN),
        other => other.as_f64(),
    }
}

fn single_char(value: &Value) -> Option<char> {
    let s = value.as_str()?;
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

macro_rules! typed_from {
    ($($ty:ty => $variant:ident),*) => {
        $(
            impl From<Vec<$ty>> for TypedArray {
                fn from(v: Vec<$ty>) -> Self {
                    TypedArray::$variant(v)
                }
            }
        )*
    };
}

typed_from!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    char => Char
);

impl From<&TypedArray> for Vec<Value> {
    fn from(array: &TypedArray) -> Self {
        (0..array.len()).filter_map(|i| array.get(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_component_names_are_aliases() {
        let items = vec![Value::from(1), Value::from(-2)];
        assert_eq!(
            TypedArray::from_items("int", items.clone()).unwrap(),
            TypedArray::I32(vec![1, -2])
        );
        assert_eq!(
            TypedArray::from_items("long", items).unwrap(),
            TypedArray::I64(vec![1, -2])
        );
    }

    #[test]
    fn narrowing_rejects_out_of_range() {
        let err = TypedArray::from_items("i8", vec![Value::from(300)]).unwrap_err();
        assert!(err.contains("item 0"));
    }

    #[test]
    fn unknown_component_is_object_array() {
        let array = TypedArray::from_items("demo.Point", vec![Value::Null]).unwrap();
        assert_eq!(array.item_type_name(), "demo.Point");
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn null_float_items_are_nan() {
        match TypedArray::from_items("double", vec![Value::Null, Value::from(2)]).unwrap() {
            TypedArray::F64(items) => {
                assert!(items[0].is_nan());
                assert_eq!(items[1], 2.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(TypedArray::from_items("i64", vec![Value::Null]).is_err());
    }

    #[test]
    fn char_items_must_be_single_characters() {
        assert!(TypedArray::from_items("char", vec![Value::from("ab")]).is_err());
        assert_eq!(
            TypedArray::from_items("char", vec![Value::from("é")]).unwrap(),
            TypedArray::Char(vec!['é'])
        );
    }
}
