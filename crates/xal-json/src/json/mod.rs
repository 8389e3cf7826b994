//! Text encoder and decoder for the reference-preserving JSON dialect.
//!
//! Plain JSON is a subset of the dialect. On top of it, five reserved map
//! shapes carry what plain JSON cannot:
//!
//! | shape                                               | meaning                                |
//! |-----------------------------------------------------|----------------------------------------|
//! | `{"__XALID":<id>,"value":<v>}`                      | definition of a shared value           |
//! | `{"__XALREF":<id>}`                                 | another use of a defined shared value  |
//! | `{"__XALTYPE":"<name>","value":<v>}`                | extension value converted by an adaptor|
//! | `{"__XALITEMTYPE":"<component>","array":[...]}`     | typed array                            |
//! | `{"__XALSERIALIZATION":[<bytes>]}`                  | serialized fallback payload            |

mod census;
mod decoder;
mod encoder;

pub use decoder::JsonDecoder;
pub use encoder::JsonEncoder;

pub const ID_KEY: &str = "__XALID";
pub const REF_KEY: &str = "__XALREF";
pub const VALUE_KEY: &str = "value";
pub const TYPE_KEY: &str = "__XALTYPE";
pub const ITEM_TYPE_KEY: &str = "__XALITEMTYPE";
pub const ARRAY_KEY: &str = "array";
pub const SERIALIZATION_KEY: &str = "__XALSERIALIZATION";
