//! Numeric weight of a cost-function term.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProblemError;

/// Integer or floating-point coefficient.
///
/// Fixed-width integers and floats are normalized into one of the two
/// variants on conversion. Integers that do not fit in `i64` and non-numeric
/// JSON values are rejected; non-finite floats are accepted here and rejected
/// when a [`Term`](crate::Term) is built.
///
/// Equality compares numeric values: `Int(1) == Float(1.0)`. The variant only
/// decides how the value is serialized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged, try_from = "serde_json::Value")]
pub enum Coefficient {
    Int(i64),
    Float(f64),
}

impl Coefficient {
    /// The value as a float.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    /// Whether the value is a finite number.
    pub fn is_finite(self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Float(f) => f.is_finite(),
        }
    }
}

impl PartialEq for Coefficient {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(i), Self::Float(x)) | (Self::Float(x), Self::Int(i)) => int_equals_float(i, x),
        }
    }
}

/// Exact comparison; `i as f64` alone would equate neighbouring large ints.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn int_equals_float(i: i64, x: f64) -> bool {
    // 2^63, the first float past i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    x.fract() == 0.0 && (-LIMIT..LIMIT).contains(&x) && x as i64 == i
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
        }
    }
}

macro_rules! from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Coefficient {
            fn from(value: $t) -> Self {
                Self::Int(i64::from(value))
            }
        })*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! try_from_wide_int {
    ($($t:ty),*) => {
        $(impl TryFrom<$t> for Coefficient {
            type Error = ProblemError;

            fn try_from(value: $t) -> Result<Self, Self::Error> {
                i64::try_from(value).map(Self::Int).map_err(|_| {
                    ProblemError::Validation(format!(
                        "coefficient {value} does not fit in a 64-bit signed integer"
                    ))
                })
            }
        })*
    };
}

try_from_wide_int!(u64, usize, i128, u128, isize);

impl From<f32> for Coefficient {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for Coefficient {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl TryFrom<&serde_json::Value> for Coefficient {
    type Error = ProblemError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        let serde_json::Value::Number(number) = value else {
            return Err(ProblemError::Validation(format!(
                "coefficient must be a number, got {value}"
            )));
        };

        if let Some(i) = number.as_i64() {
            Ok(Self::Int(i))
        } else if let Some(u) = number.as_u64() {
            Self::try_from(u)
        } else {
            number.as_f64().map(Self::Float).ok_or_else(|| {
                ProblemError::Validation(format!("coefficient {number} is not representable"))
            })
        }
    }
}

impl TryFrom<serde_json::Value> for Coefficient {
    type Error = ProblemError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Self::try_from(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fixed_width_integers_normalize_to_int() {
        assert_eq!(Coefficient::from(3_i8), Coefficient::Int(3));
        assert_eq!(Coefficient::from(-7_i16), Coefficient::Int(-7));
        assert_eq!(Coefficient::from(u32::MAX), Coefficient::Int(i64::from(u32::MAX)));
        assert_eq!(Coefficient::try_from(42_u64).unwrap(), Coefficient::Int(42));
        assert_eq!(Coefficient::try_from(5_usize).unwrap(), Coefficient::Int(5));
    }

    #[test]
    fn test_out_of_range_integers_rejected() {
        assert!(matches!(
            Coefficient::try_from(u64::MAX),
            Err(ProblemError::Validation(_))
        ));
        assert!(Coefficient::try_from(i128::from(i64::MIN) - 1).is_err());
    }

    #[test]
    fn test_floats_normalize_to_float() {
        assert_eq!(Coefficient::from(0.5_f32), Coefficient::Float(0.5));
        assert_eq!(Coefficient::from(-1.25), Coefficient::Float(-1.25));
    }

    #[test]
    fn test_json_values() {
        assert_eq!(Coefficient::try_from(json!(2)).unwrap(), Coefficient::Int(2));
        assert!(matches!(
            Coefficient::try_from(json!(2.0)).unwrap(),
            Coefficient::Float(x) if x == 2.0
        ));
        assert!(Coefficient::try_from(json!("2")).is_err());
        assert!(Coefficient::try_from(json!(null)).is_err());
        assert!(Coefficient::try_from(json!(u64::MAX)).is_err());
    }

    #[test]
    fn test_serialize_keeps_variant() {
        assert_eq!(serde_json::to_string(&Coefficient::Int(1)).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Coefficient::Float(1.0)).unwrap(), "1.0");
        let parsed: Coefficient = serde_json::from_str("-3").unwrap();
        assert_eq!(parsed, Coefficient::Int(-3));
    }

    #[test]
    fn test_equality_compares_values() {
        assert_eq!(Coefficient::Int(1), Coefficient::Float(1.0));
        assert_eq!(Coefficient::Float(-4.0), Coefficient::Int(-4));
        assert_ne!(Coefficient::Int(1), Coefficient::Float(1.5));
        assert_ne!(Coefficient::Float(f64::NAN), Coefficient::Float(f64::NAN));

        // i64::MAX rounds to 2^63 as a float but is not equal to it.
        assert_ne!(Coefficient::Int(i64::MAX), Coefficient::Float(9_223_372_036_854_775_808.0));
        assert_ne!(Coefficient::Int(i64::MAX - 1), Coefficient::Float(i64::MAX as f64));
        assert_eq!(Coefficient::Int(i64::MIN), Coefficient::Float(i64::MIN as f64));
    }

    #[test]
    fn test_display() {
        assert_eq!(Coefficient::Int(4).to_string(), "4");
        assert_eq!(Coefficient::Float(1.0).to_string(), "1.0");
    }
}
