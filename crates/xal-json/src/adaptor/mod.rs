//! Conversion adaptors and the registry that maps type names to them.
//!
//! An adaptor is a pair of pure functions between an application type and a
//! [`Value`] representation. The encoder finds the adaptor by the native
//! `TypeId` of an [`Extension`]; the decoder finds it by the type name
//! written under `__XALTYPE`, which may be the primary name or any alternate.

mod standard;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::AdaptorError;
use crate::value::{Extension, Value};

pub use standard::register_standard_adaptors;

/// Bidirectional conversion between a native type and its JSON representation.
pub trait ConversionAdaptor: Send + Sync + 'static {
    type Native: Any + PartialEq + fmt::Debug;

    fn to_representation(&self, native: &Self::Native) -> Value;

    fn to_native(&self, representation: &Value) -> Result<Self::Native, AdaptorError>;
}

/// Adaptor assembled from two closures.
///
/// ```
/// use xal_json::{AdaptorError, FnAdaptor, JsonCoder, Value};
///
/// #[derive(Debug, PartialEq)]
/// struct Celsius(f64);
///
/// let mut coder = JsonCoder::new();
/// coder
///     .register_type(
///         "demo.Celsius",
///         FnAdaptor::new(
///             |c: &Celsius| Value::from(c.0),
///             |v: &Value| {
///                 v.as_f64()
///                     .map(Celsius)
///                     .ok_or_else(|| AdaptorError::unexpected("number", v.kind()))
///             },
///         ),
///         &[],
///     )
///     .unwrap();
/// let text = coder.encode(&Value::extension(Celsius(21.5))).unwrap();
/// assert_eq!(text, r#"{"__XALTYPE":"demo.Celsius","value":21.5}"#);
/// ```
pub struct FnAdaptor<T, E, D> {
    encode: E,
    decode: D,
    _native: PhantomData<fn() -> T>,
}

impl<T, E, D> FnAdaptor<T, E, D>
where
    E: Fn(&T) -> Value + Send + Sync + 'static,
    D: Fn(&Value) -> Result<T, AdaptorError> + Send + Sync + 'static,
{
    pub fn new(encode: E, decode: D) -> Self {
        Self {
            encode,
            decode,
            _native: PhantomData,
        }
    }
}

impl<T, E, D> ConversionAdaptor for FnAdaptor<T, E, D>
where
    T: Any + PartialEq + fmt::Debug,
    E: Fn(&T) -> Value + Send + Sync + 'static,
    D: Fn(&Value) -> Result<T, AdaptorError> + Send + Sync + 'static,
{
    type Native = T;

    fn to_representation(&self, native: &T) -> Value {
        (self.encode)(native)
    }

    fn to_native(&self, representation: &Value) -> Result<T, AdaptorError> {
        (self.decode)(representation)
    }
}

/// Type-erased view of a [`ConversionAdaptor`].
trait ErasedAdaptor: Send + Sync {
    fn native_type(&self) -> TypeId;

    fn native_type_name(&self) -> &'static str;

    /// `None` when `native` is not the adaptor's native type.
    fn represent(&self, native: &dyn Any) -> Option<Value>;

    fn reconstruct(&self, representation: &Value) -> Result<Extension, AdaptorError>;
}

impl<A: ConversionAdaptor> ErasedAdaptor for A {
    fn native_type(&self) -> TypeId {
        TypeId::of::<A::Native>()
    }

    fn native_type_name(&self) -> &'static str {
        std::any::type_name::<A::Native>()
    }

    fn represent(&self, native: &dyn Any) -> Option<Value> {
        native
            .downcast_ref::<A::Native>()
            .map(|n| ConversionAdaptor::to_representation(self, n))
    }

    fn reconstruct(&self, representation: &Value) -> Result<Extension, AdaptorError> {
        ConversionAdaptor::to_native(self, representation).map(Extension::new)
    }
}

/// One registered extension type.
#[derive(Clone)]
pub struct RegisteredType {
    name: String,
    alternate_names: Vec<String>,
    adaptor: Arc<dyn ErasedAdaptor>,
}

impl RegisteredType {
    /// Primary name, written under `__XALTYPE` when encoding.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Additional names accepted when decoding.
    pub fn alternate_names(&self) -> &[String] {
        &self.alternate_names
    }

    pub fn native_type_id(&self) -> TypeId {
        self.adaptor.native_type()
    }

    pub fn native_type_name(&self) -> &'static str {
        self.adaptor.native_type_name()
    }

    pub(crate) fn represent(&self, native: &dyn Any) -> Option<Value> {
        self.adaptor.represent(native)
    }

    pub(crate) fn reconstruct(&self, representation: &Value) -> Result<Extension, AdaptorError> {
        self.adaptor.reconstruct(representation)
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.alternate_names.iter().map(String::as_str))
    }
}

impl fmt::Debug for RegisteredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredType")
            .field("name", &self.name)
            .field("alternate_names", &self.alternate_names)
            .field("native", &self.native_type_name())
            .finish()
    }
}

/// Registry of extension types.
///
/// Cheap to clone; a coder keeps one behind an `Arc` and only reads it while
/// encoding or decoding.
#[derive(Clone, Default)]
pub struct AdaptorRegistry {
    by_name: HashMap<String, Arc<RegisteredType>>,
    by_type: HashMap<TypeId, Arc<RegisteredType>>,
}

impl AdaptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the standard adaptors.
    pub fn with_standard_adaptors() -> Self {
        let mut registry = Self::new();
        register_standard_adaptors(&mut registry);
        registry
    }

    /// Registers `adaptor` under `name` and `alternate_names`.
    ///
    /// An earlier registration for the same native type, or one owning any of
    /// the same names, is removed entirely.
    pub fn register<A: ConversionAdaptor>(
        &mut self,
        name: impl Into<String>,
        adaptor: A,
        alternate_names: &[&str],
    ) {
        let entry = Arc::new(RegisteredType {
            name: name.into(),
            alternate_names: alternate_names.iter().map(|s| s.to_string()).collect(),
            adaptor: Arc::new(adaptor),
        });

        let mut replaced: Vec<Arc<RegisteredType>> = Vec::new();
        if let Some(old) = self.by_type.get(&entry.native_type_id()) {
            replaced.push(old.clone());
        }
        for name in entry.names() {
            if let Some(old) = self.by_name.get(name) {
                if !replaced.iter().any(|r| Arc::ptr_eq(r, old)) {
                    replaced.push(old.clone());
                }
            }
        }
        for old in &replaced {
            tracing::warn!(
                replaced = old.name(),
                by = entry.name(),
                "replacing registered extension type"
            );
            self.remove(old);
        }

        for name in entry.names() {
            self.by_name.insert(name.to_string(), entry.clone());
        }
        self.by_type.insert(entry.native_type_id(), entry);
    }

    fn remove(&mut self, entry: &Arc<RegisteredType>) {
        for name in entry.names() {
            if self.by_name.get(name).is_some_and(|e| Arc::ptr_eq(e, entry)) {
                self.by_name.remove(name);
            }
        }
        if self
            .by_type
            .get(&entry.native_type_id())
            .is_some_and(|e| Arc::ptr_eq(e, entry))
        {
            self.by_type.remove(&entry.native_type_id());
        }
    }

    /// Lookup by primary or alternate name.
    pub fn lookup_name(&self, name: &str) -> Option<&RegisteredType> {
        self.by_name.get(name).map(|e| e.as_ref())
    }

    pub fn lookup_type(&self, type_id: TypeId) -> Option<&RegisteredType> {
        self.by_type.get(&type_id).map(|e| e.as_ref())
    }

    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.by_type.contains_key(&type_id)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Primary names of all registered types, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_type.values().map(|e| e.name()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl fmt::Debug for AdaptorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.type_names()).finish()
    }
}
