//! Adaptors installed in every coder created with [`JsonCoder::new`](crate::JsonCoder::new).
//!
//! Narrow numeric types, `char`, time values and string sets. The alternate
//! names accept documents written by the Java coder this format came from.

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{AdaptorRegistry, ConversionAdaptor};
use crate::error::AdaptorError;
use crate::value::{Number, Value};

pub fn register_standard_adaptors(registry: &mut AdaptorRegistry) {
    registry.register("char", CharAdaptor, &["java.lang.Character"]);
    registry.register("i8", I8Adaptor, &["java.lang.Byte"]);
    registry.register("i16", I16Adaptor, &["java.lang.Short"]);
    registry.register("i32", I32Adaptor, &["java.lang.Integer"]);
    registry.register("u8", U8Adaptor, &[]);
    registry.register("u16", U16Adaptor, &[]);
    registry.register("u32", U32Adaptor, &[]);
    registry.register("u64", U64Adaptor, &[]);
    registry.register("f32", F32Adaptor, &["java.lang.Float"]);
    registry.register("std::time::SystemTime", SystemTimeAdaptor, &["java.util.Date"]);
    registry.register("std::time::Duration", DurationAdaptor, &[]);
    registry.register(
        "std::collections::BTreeSet<String>",
        StringSetAdaptor,
        &["java.util.HashSet", "java.util.TreeSet"],
    );
}

fn expect_integer(representation: &Value) -> Result<i64, AdaptorError> {
    representation
        .as_i64()
        .ok_or_else(|| AdaptorError::unexpected("integer", representation.kind()))
}

fn expect_number(representation: &Value) -> Result<f64, AdaptorError> {
    representation
        .as_f64()
        .ok_or_else(|| AdaptorError::unexpected("number", representation.kind()))
}

macro_rules! narrow_integer_adaptor {
    ($($adaptor:ident => $ty:ty),*) => {
        $(
            #[derive(Debug, Default, Clone, Copy)]
            pub struct $adaptor;

            impl ConversionAdaptor for $adaptor {
                type Native = $ty;

                fn to_representation(&self, native: &$ty) -> Value {
                    Value::Number(Number::from(*native))
                }

                fn to_native(&self, representation: &Value) -> Result<$ty, AdaptorError> {
                    let n = expect_integer(representation)?;
                    <$ty>::try_from(n).map_err(|_| AdaptorError::out_of_range(n, stringify!($ty)))
                }
            }
        )*
    };
}

narrow_integer_adaptor!(
    I8Adaptor => i8,
    I16Adaptor => i16,
    I32Adaptor => i32,
    U8Adaptor => u8,
    U16Adaptor => u16,
    U32Adaptor => u32
);

/// `u64` values above `i64::MAX` are represented as decimal strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct U64Adaptor;

impl ConversionAdaptor for U64Adaptor {
    type Native = u64;

    fn to_representation(&self, native: &u64) -> Value {
        match i64::try_from(*native) {
            Ok(i) => Value::from(i),
            Err(_) => Value::from(native.to_string()),
        }
    }

    fn to_native(&self, representation: &Value) -> Result<u64, AdaptorError> {
        if let Some(s) = representation.as_str() {
            return s.parse().map_err(|_| AdaptorError::out_of_range(s, "u64"));
        }
        let n = expect_integer(representation)?;
        u64::try_from(n).map_err(|_| AdaptorError::out_of_range(n, "u64"))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct F32Adaptor;

impl ConversionAdaptor for F32Adaptor {
    type Native = f32;

    fn to_representation(&self, native: &f32) -> Value {
        Value::from(*native)
    }

    fn to_native(&self, representation: &Value) -> Result<f32, AdaptorError> {
        expect_number(representation).map(|f| f as f32)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CharAdaptor;

impl ConversionAdaptor for CharAdaptor {
    type Native = char;

    fn to_representation(&self, native: &char) -> Value {
        Value::from(native.to_string())
    }

    fn to_native(&self, representation: &Value) -> Result<char, AdaptorError> {
        let s = representation
            .as_str()
            .ok_or_else(|| AdaptorError::unexpected("string", representation.kind()))?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(AdaptorError::Custom(format!(
                "expected a single character, found {s:?}"
            ))),
        }
    }
}

const NANOS_PER_SEC: u32 = 1_000_000_000;
const NANOS_PER_MILLI: u32 = 1_000_000;

/// Whole seconds as an integer, or as a decimal string beyond the `i64` range.
fn seconds_value(secs: i128) -> Value {
    match i64::try_from(secs) {
        Ok(i) => Value::from(i),
        Err(_) => Value::from(secs.to_string()),
    }
}

fn seconds_and_nanos(secs: i128, nanos: u32) -> Value {
    Value::array(vec![seconds_value(secs), Value::from(nanos)])
}

/// Reads a `[secs, nanos]` pair; `nanos` must be below one second.
fn read_seconds_and_nanos(representation: &Value) -> Result<(i128, u32), AdaptorError> {
    let pair = representation
        .as_array()
        .filter(|items| items.len() == 2)
        .ok_or_else(|| AdaptorError::unexpected("[seconds, nanoseconds]", representation.kind()))?;
    let secs = match &pair[0] {
        Value::String(s) => s
            .parse::<i128>()
            .map_err(|_| AdaptorError::Custom(format!("invalid seconds {s:?}")))?,
        other => i128::from(expect_integer(other)?),
    };
    let nanos = expect_integer(&pair[1])?;
    let nanos = u32::try_from(nanos)
        .ok()
        .filter(|&n| n < NANOS_PER_SEC)
        .ok_or_else(|| AdaptorError::out_of_range(nanos, "nanoseconds"))?;
    Ok((secs, nanos))
}

/// Integer milliseconds since the Unix epoch (negative before it) when the
/// time has no finer part, otherwise `[secs, nanos]` with `nanos` counted
/// forward from `secs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeAdaptor;

impl ConversionAdaptor for SystemTimeAdaptor {
    type Native = SystemTime;

    fn to_representation(&self, native: &SystemTime) -> Value {
        let (negative, offset) = match native.duration_since(UNIX_EPOCH) {
            Ok(after) => (false, after),
            Err(before) => (true, before.duration()),
        };
        if offset.subsec_nanos() % NANOS_PER_MILLI == 0 {
            if let Ok(millis) = i64::try_from(offset.as_millis()) {
                return Value::from(if negative { -millis } else { millis });
            }
        }
        let secs = i128::from(offset.as_secs());
        let nanos = offset.subsec_nanos();
        match (negative, nanos) {
            (false, _) => seconds_and_nanos(secs, nanos),
            (true, 0) => seconds_and_nanos(-secs, 0),
            (true, _) => seconds_and_nanos(-secs - 1, NANOS_PER_SEC - nanos),
        }
    }

    fn to_native(&self, representation: &Value) -> Result<SystemTime, AdaptorError> {
        if let Some(millis) = representation.as_i64() {
            let offset = Duration::from_millis(millis.unsigned_abs());
            let time = if millis >= 0 {
                UNIX_EPOCH.checked_add(offset)
            } else {
                UNIX_EPOCH.checked_sub(offset)
            };
            return time.ok_or_else(|| AdaptorError::out_of_range(millis, "SystemTime"));
        }
        let (secs, nanos) = read_seconds_and_nanos(representation)?;
        let whole = u64::try_from(secs.unsigned_abs())
            .map_err(|_| AdaptorError::out_of_range(secs, "SystemTime"))?;
        let base = if secs >= 0 {
            UNIX_EPOCH.checked_add(Duration::from_secs(whole))
        } else {
            UNIX_EPOCH.checked_sub(Duration::from_secs(whole))
        };
        base.and_then(|t| t.checked_add(Duration::from_nanos(u64::from(nanos))))
            .ok_or_else(|| AdaptorError::out_of_range(secs, "SystemTime"))
    }
}

/// Float seconds when that is exact, otherwise `[secs, nanos]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DurationAdaptor;

impl ConversionAdaptor for DurationAdaptor {
    type Native = Duration;

    fn to_representation(&self, native: &Duration) -> Value {
        let secs = native.as_secs_f64();
        if Duration::try_from_secs_f64(secs).ok() == Some(*native) {
            return Value::from(secs);
        }
        seconds_and_nanos(i128::from(native.as_secs()), native.subsec_nanos())
    }

    fn to_native(&self, representation: &Value) -> Result<Duration, AdaptorError> {
        if let Some(secs) = representation.as_f64() {
            return Duration::try_from_secs_f64(secs)
                .map_err(|_| AdaptorError::out_of_range(secs, "Duration"));
        }
        let (secs, nanos) = read_seconds_and_nanos(representation)?;
        let secs = u64::try_from(secs).map_err(|_| AdaptorError::out_of_range(secs, "Duration"))?;
        Ok(Duration::new(secs, nanos))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StringSetAdaptor;

impl ConversionAdaptor for StringSetAdaptor {
    type Native = BTreeSet<String>;

    fn to_representation(&self, native: &BTreeSet<String>) -> Value {
        Value::array(native.iter().map(|s| Value::from(s.as_str())).collect())
    }

    fn to_native(&self, representation: &Value) -> Result<BTreeSet<String>, AdaptorError> {
        let items = representation
            .as_array()
            .ok_or_else(|| AdaptorError::unexpected("array", representation.kind()))?;
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| AdaptorError::unexpected("string", item.kind()))
            })
            .collect()
    }
}
