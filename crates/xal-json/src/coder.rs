//! [`JsonCoder`]: the public entry point.

use std::any::TypeId;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::adaptor::{AdaptorRegistry, ConversionAdaptor};
use crate::error::CoderError;
use crate::json::{JsonDecoder, JsonEncoder};
use crate::options::CoderOptions;
use crate::value::Value;

/// Encodes and decodes [`Value`] graphs with a set of registered extension
/// types.
///
/// A coder is either mutable, in which case new types can be registered, or
/// frozen. The registry sits behind an `Arc`, so cloning a coder is cheap and
/// registering on a clone never affects the original.
#[derive(Clone)]
pub struct JsonCoder {
    registry: Arc<AdaptorRegistry>,
    options: CoderOptions,
    immutable: bool,
}

impl JsonCoder {
    /// Mutable coder with the standard adaptors.
    pub fn new() -> Self {
        Self::with_registry(AdaptorRegistry::with_standard_adaptors())
    }

    /// Mutable coder without any extension types.
    pub fn empty() -> Self {
        Self::with_registry(AdaptorRegistry::new())
    }

    pub fn with_registry(registry: AdaptorRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            options: CoderOptions::default(),
            immutable: false,
        }
    }

    pub fn with_options(mut self, options: CoderOptions) -> Self {
        self.options = options;
        self
    }

    /// Process-wide frozen coder with the standard adaptors.
    pub fn default_coder() -> &'static JsonCoder {
        static DEFAULT: OnceLock<JsonCoder> = OnceLock::new();
        DEFAULT.get_or_init(|| {
            let mut coder = JsonCoder::new();
            coder.freeze();
            coder
        })
    }

    pub fn register_type<A: ConversionAdaptor>(
        &mut self,
        name: impl Into<String>,
        adaptor: A,
        alternate_names: &[&str],
    ) -> Result<(), CoderError> {
        if self.immutable {
            return Err(CoderError::ImmutableCoder);
        }
        Arc::make_mut(&mut self.registry).register(name, adaptor, alternate_names);
        Ok(())
    }

    /// Makes the coder read-only. There is no way back; use
    /// [`JsonCoder::mutable_copy`] to get a coder that accepts new types.
    pub fn freeze(&mut self) {
        self.immutable = true;
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Mutable coder with the same types and options.
    pub fn mutable_copy(&self) -> JsonCoder {
        JsonCoder {
            immutable: false,
            ..self.clone()
        }
    }

    pub fn options(&self) -> &CoderOptions {
        &self.options
    }

    pub fn registry(&self) -> &AdaptorRegistry {
        &self.registry
    }

    /// `true` when values of type `T` can be encoded as extensions.
    pub fn is_supported_type<T: 'static>(&self) -> bool {
        self.registry.contains_type(TypeId::of::<T>())
    }

    pub fn extension_type_names(&self) -> Vec<&str> {
        self.registry.type_names()
    }

    pub fn encode(&self, value: &Value) -> Result<String, CoderError> {
        JsonEncoder::new(&self.registry, &self.options).encode(value)
    }

    pub fn decode(&self, text: &str) -> Result<Value, CoderError> {
        JsonDecoder::new(&self.registry, &self.options).decode(text)
    }

    /// Decodes the first value of `text` and returns the rest of the input.
    pub fn decode_prefix<'t>(&self, text: &'t str) -> Result<(Value, &'t str), CoderError> {
        let (value, rest) = JsonDecoder::new(&self.registry, &self.options).decode_prefix(text)?;
        let consumed = text.len() - rest.len();
        Ok((value, &text[consumed..]))
    }
}

impl Default for JsonCoder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonCoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCoder")
            .field("types", &self.registry)
            .field("options", &self.options)
            .field("immutable", &self.immutable)
            .finish()
    }
}

/// Encodes with [`JsonCoder::default_coder`].
pub fn default_encode(value: &Value) -> Result<String, CoderError> {
    JsonCoder::default_coder().encode(value)
}

/// Decodes with [`JsonCoder::default_coder`].
pub fn default_decode(text: &str) -> Result<Value, CoderError> {
    JsonCoder::default_coder().decode(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptor::FnAdaptor;
    use crate::error::AdaptorError;

    #[derive(Debug, PartialEq)]
    struct Setpoint(f64);

    fn setpoint_adaptor() -> impl ConversionAdaptor<Native = Setpoint> {
        FnAdaptor::new(
            |s: &Setpoint| Value::from(s.0),
            |v: &Value| {
                v.as_f64()
                    .map(Setpoint)
                    .ok_or_else(|| AdaptorError::unexpected("number", v.kind()))
            },
        )
    }

    #[test]
    fn default_coder_is_frozen() {
        let coder = JsonCoder::default_coder();
        assert!(coder.is_immutable());
        assert!(coder.is_supported_type::<char>());
        let mut copy = coder.clone();
        assert_eq!(
            copy.register_type("demo.Setpoint", setpoint_adaptor(), &[]),
            Err(CoderError::ImmutableCoder)
        );
    }

    #[test]
    fn mutable_copy_does_not_touch_original() {
        let mut copy = JsonCoder::default_coder().mutable_copy();
        copy.register_type("demo.Setpoint", setpoint_adaptor(), &[])
            .unwrap();
        assert!(copy.is_supported_type::<Setpoint>());
        assert!(!JsonCoder::default_coder().is_supported_type::<Setpoint>());
        assert!(copy.extension_type_names().contains(&"demo.Setpoint"));
    }

    #[test]
    fn registered_type_round_trips() {
        let mut coder = JsonCoder::empty();
        coder
            .register_type("demo.Setpoint", setpoint_adaptor(), &["Setpoint"])
            .unwrap();
        let text = coder.encode(&Value::extension(Setpoint(0.5))).unwrap();
        assert_eq!(text, r#"{"__XALTYPE":"demo.Setpoint","value":0.5}"#);
        let value = coder.decode(&text).unwrap();
        assert_eq!(value, Value::extension(Setpoint(0.5)));
        let alias = coder.decode(r#"{"__XALTYPE":"Setpoint","value":2}"#).unwrap();
        assert_eq!(
            alias.as_extension().and_then(|e| e.downcast_ref::<Setpoint>()),
            Some(&Setpoint(2.0))
        );
    }

    #[test]
    fn options_reach_the_encoder() {
        let coder = JsonCoder::empty().with_options(CoderOptions {
            track_string_identity: false,
            ..CoderOptions::default()
        });
        let s = Value::from("bpm");
        let text = coder.encode(&Value::array(vec![s.clone(), s])).unwrap();
        assert_eq!(text, r#"["bpm","bpm"]"#);
    }

    #[test]
    fn decode_prefix_chains_values() {
        let coder = JsonCoder::empty();
        let (first, rest) = coder.decode_prefix("1 [2]").unwrap();
        let (second, rest) = coder.decode_prefix(rest).unwrap();
        assert_eq!(first, Value::from(1));
        assert_eq!(second, Value::array(vec![Value::from(2)]));
        assert_eq!(rest, "");
    }

    #[test]
    fn free_functions_use_default_coder() {
        let text = default_encode(&Value::extension('k')).unwrap();
        assert_eq!(text, r#"{"__XALTYPE":"char","value":"k"}"#);
        assert_eq!(default_decode(&text).unwrap(), Value::extension('k'));
    }
}
