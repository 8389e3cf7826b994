//! Reference-preserving JSON coder for XAL object graphs.
//!
//! Encodes a [`Value`] graph to JSON text and back without losing aliasing:
//! a value reachable from several places (or from itself) is written once
//! and decodes into a single shared allocation. Application types travel as
//! extensions through adaptors registered on a [`JsonCoder`].
//!
//! ```
//! use xal_json::{JsonCoder, Value};
//!
//! let shared = Value::array(vec![Value::from(1)]);
//! let root = Value::array(vec![shared.clone(), shared]);
//!
//! let coder = JsonCoder::new();
//! let text = coder.encode(&root).unwrap();
//! assert_eq!(text, r#"[{"__XALID":0,"value":[1]},{"__XALREF":0}]"#);
//!
//! let back = coder.decode(&text).unwrap();
//! assert!(back.at(0).unwrap().ptr_eq(&back.at(1).unwrap()));
//! ```

mod coder;
mod error;
mod interop;
mod options;

pub mod adaptor;
pub mod cli;
pub mod json;
pub mod value;

pub use adaptor::{AdaptorRegistry, ConversionAdaptor, FnAdaptor, RegisteredType};
pub use coder::{default_decode, default_encode, JsonCoder};
pub use error::{AdaptorError, CoderError};
pub use json::{JsonDecoder, JsonEncoder};
pub use options::{CoderOptions, DEFAULT_MAX_DEPTH};
pub use value::{
    Extension, Map, Number, SerializedObject, Shared, TypedArray, Value, ValueKind,
};
