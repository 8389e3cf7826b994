//! Application values carried through the coder as extensions, and the raw
//! payload of the serialization fallback.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoderError;

type SerializeFn = fn(&dyn Any) -> Result<Vec<u8>, CoderError>;

/// An application value of any Rust type.
///
/// The encoder converts it through the adaptor registered for its type. If
/// no adaptor exists and the extension was built with
/// [`Extension::serializable`], it is written as a CBOR payload instead;
/// otherwise encoding fails with [`CoderError::UnsupportedType`].
///
/// Clones share the same allocation and therefore the same identity.
#[derive(Clone)]
pub struct Extension {
    native: Rc<dyn Any>,
    type_name: &'static str,
    eq: fn(&dyn Any, &dyn Any) -> bool,
    debug: fn(&dyn Any, &mut fmt::Formatter<'_>) -> fmt::Result,
    serialize: Option<SerializeFn>,
}

impl Extension {
    pub fn new<T: Any + PartialEq + fmt::Debug>(native: T) -> Self {
        Self {
            native: Rc::new(native),
            type_name: std::any::type_name::<T>(),
            eq: eq_native::<T>,
            debug: debug_native::<T>,
            serialize: None,
        }
    }

    /// Like [`Extension::new`], but falls back to serialization when no
    /// adaptor is registered for `T`.
    pub fn serializable<T: Any + PartialEq + fmt::Debug + Serialize>(native: T) -> Self {
        Self {
            serialize: Some(serialize_native::<T>),
            ..Self::new(native)
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// `TypeId` of the wrapped native value.
    pub fn native_type_id(&self) -> TypeId {
        (*self.native).type_id()
    }

    pub fn native(&self) -> &dyn Any {
        &*self.native
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.native.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.native.is::<T>()
    }

    pub fn ptr_eq(&self, other: &Extension) -> bool {
        Rc::ptr_eq(&self.native, &other.native)
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.native) as *const () as usize
    }

    pub(crate) fn serialize(&self) -> Option<Result<Vec<u8>, CoderError>> {
        self.serialize.map(|f| f(&*self.native))
    }
}

impl PartialEq for Extension {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.eq)(&*self.native, &*other.native)
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extension<{}>(", self.type_name)?;
        (self.debug)(&*self.native, f)?;
        f.write_str(")")
    }
}

fn eq_native<T: Any + PartialEq>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn debug_native<T: Any + fmt::Debug>(native: &dyn Any, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match native.downcast_ref::<T>() {
        Some(v) => fmt::Debug::fmt(v, f),
        None => f.write_str("?"),
    }
}

fn serialize_native<T: Any + Serialize>(native: &dyn Any) -> Result<Vec<u8>, CoderError> {
    let value = native
        .downcast_ref::<T>()
        .ok_or_else(|| CoderError::Serialization(std::any::type_name::<T>().to_string()))?;
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| CoderError::Serialization(e.to_string()))?;
    Ok(bytes)
}

/// Opaque payload produced by the serialization fallback.
///
/// The payload is CBOR; [`SerializedObject::deserialize`] turns it back into
/// the caller's type.
#[derive(Clone, PartialEq)]
pub struct SerializedObject(Rc<[u8]>);

impl SerializedObject {
    pub fn new(bytes: Vec<u8>) -> Self {
        SerializedObject(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, CoderError> {
        ciborium::from_reader(&self.0[..]).map_err(|e| CoderError::Serialization(e.to_string()))
    }

    pub fn ptr_eq(&self, other: &SerializedObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SerializedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SerializedObject({} bytes)", self.0.len())
    }
}
