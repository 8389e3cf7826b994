//! Coder configuration.

/// Default nesting limit shared by the encoder, decoder and plain-JSON export.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Options controlling a [`JsonCoder`](crate::JsonCoder).
///
/// The options travel with the coder's registry snapshot and are read-only
/// during an encode or decode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoderOptions {
    /// When `true` (default), a string allocation that appears more than once
    /// in a graph is written once and referenced elsewhere, like any other
    /// shared value. When `false`, strings are always written inline.
    pub track_string_identity: bool,
    /// Maximum nesting of arrays, maps and extension representations.
    pub max_depth: usize,
}

impl Default for CoderOptions {
    fn default() -> Self {
        Self {
            track_string_identity: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
