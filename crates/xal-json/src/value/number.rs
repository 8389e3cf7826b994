//! [`Number`]: the wrapped numeric value.

use std::fmt;

/// A JSON number.
///
/// Text without a fractional part or exponent decodes as [`Number::Integer`];
/// everything else decodes as [`Number::Float`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn is_integer(&self) -> bool {
        matches!(self, Number::Integer(_))
    }

    /// Integer value; floats with no fractional part inside the `i64` range
    /// are accepted too.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Number::Integer(i) => Some(i),
            Number::Float(f) => {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Some(f as i64)
                } else {
                    None
                }
            }
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Integer(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

/// Writes the number the way the encoder emits it.
///
/// Finite floats always carry a `.` or an exponent so they decode as floats
/// again. Infinities use an exponent that overflows back to infinity, and
/// NaN has no JSON spelling so it becomes `null`.
impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Integer(i) => write!(f, "{i}"),
            Number::Float(x) if x.is_nan() => f.write_str("null"),
            Number::Float(x) if x.is_infinite() => {
                f.write_str(if x > 0.0 { "1e999" } else { "-1e999" })
            }
            Number::Float(x) => write!(f, "{x:?}"),
        }
    }
}

macro_rules! integer_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Number {
                fn from(v: $ty) -> Self {
                    Number::Integer(v as i64)
                }
            }
        )*
    };
}

integer_from!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Number {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Number::Integer(i),
            Err(_) => Number::Float(v as f64),
        }
    }
}

impl From<usize> for Number {
    fn from(v: usize) -> Self {
        Number::from(v as u64)
    }
}

impl From<isize> for Number {
    fn from(v: isize) -> Self {
        Number::Integer(v as i64)
    }
}

impl From<f32> for Number {
    fn from(v: f32) -> Self {
        Number::Float(v as f64)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}
