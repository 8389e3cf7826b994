//! Error types for the coder and its conversion adaptors.

use thiserror::Error;

use crate::value::ValueKind;

/// Raised by a [`ConversionAdaptor`](crate::ConversionAdaptor) when a
/// representation cannot be turned back into its native type.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdaptorError {
    #[error("expected {expected}, found {found}")]
    UnexpectedRepresentation {
        expected: &'static str,
        found: ValueKind,
    },
    #[error("{value} is out of range for {target}")]
    OutOfRange { value: String, target: &'static str },
    #[error("{0}")]
    Custom(String),
}

impl AdaptorError {
    pub fn unexpected(expected: &'static str, found: ValueKind) -> Self {
        AdaptorError::UnexpectedRepresentation { expected, found }
    }

    pub fn out_of_range(value: impl ToString, target: &'static str) -> Self {
        AdaptorError::OutOfRange {
            value: value.to_string(),
            target,
        }
    }
}

/// Every failure the encoder, decoder or coder facade can report.
///
/// All of them are fatal for the call that raised them; no partial result is
/// ever returned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoderError {
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
    #[error("no adaptor registered for extension type \"{0}\"")]
    UnknownExtensionType(String),
    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { found: char, position: usize },
    #[error("unexpected end of input at position {0}")]
    UnexpectedEnd(usize),
    #[error("invalid number \"{text}\" at position {position}")]
    InvalidNumber { text: String, position: usize },
    #[error("invalid escape sequence at position {0}")]
    InvalidEscape(usize),
    #[error("reference {0} appears before its definition")]
    UnresolvedReference(i64),
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error("invalid typed array of {item_type}: {reason}")]
    InvalidTypedArray { item_type: String, reason: String },
    #[error("adaptor for \"{type_name}\" rejected its representation: {source}")]
    Adaptor {
        type_name: String,
        #[source]
        source: AdaptorError,
    },
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("nesting exceeds the maximum depth of {0}")]
    DepthLimit(usize),
    #[error("cannot register types on an immutable coder")]
    ImmutableCoder,
}
