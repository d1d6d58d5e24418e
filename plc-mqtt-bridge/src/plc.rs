// Copyright 2025 The Drasi Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! PLC tag access: the value model and the [`PlcTags`] capability.

use std::fmt;
use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::PlcError;

/// Stream of decoded values for one tag.
pub type TagStream<T> = BoxStream<'static, Result<T, PlcError>>;

/// Access to the live values of named PLC tags.
///
/// Implementations own the connection to the PLC and whatever polling it
/// requires. Observing an unknown tag yields a [`PlcError::UnknownTag`] item
/// rather than failing the call.
pub trait PlcTags: Send + Sync {
    /// Open a stream of values for `variable`, decoded as `T`.
    fn observe<T: TagValue>(&self, variable: &str) -> TagStream<T>;
}

impl<P: PlcTags> PlcTags for Arc<P> {
    fn observe<T: TagValue>(&self, variable: &str) -> TagStream<T> {
        (**self).observe(variable)
    }
}

/// A single raw PLC datum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PlcValue {
    Bool(bool),
    Byte(u8),
    Word(u16),
    Int(i16),
    DWord(u32),
    DInt(i32),
    Real(f32),
    LReal(f64),
    String(String),
}

impl PlcValue {
    /// Name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            PlcValue::Bool(_) => "Bool",
            PlcValue::Byte(_) => "Byte",
            PlcValue::Word(_) => "Word",
            PlcValue::Int(_) => "Int",
            PlcValue::DWord(_) => "DWord",
            PlcValue::DInt(_) => "DInt",
            PlcValue::Real(_) => "Real",
            PlcValue::LReal(_) => "LReal",
            PlcValue::String(_) => "String",
        }
    }

    fn as_integer(&self) -> Option<i64> {
        match *self {
            PlcValue::Byte(v) => Some(v.into()),
            PlcValue::Word(v) => Some(v.into()),
            PlcValue::Int(v) => Some(v.into()),
            PlcValue::DWord(v) => Some(v.into()),
            PlcValue::DInt(v) => Some(v.into()),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match *self {
            PlcValue::Real(v) => Some(v.into()),
            PlcValue::LReal(v) => Some(v),
            _ => self.as_integer().map(|v| v as f64),
        }
    }
}

impl fmt::Display for PlcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlcValue::Bool(v) => v.fmt(f),
            PlcValue::Byte(v) => v.fmt(f),
            PlcValue::Word(v) => v.fmt(f),
            PlcValue::Int(v) => v.fmt(f),
            PlcValue::DWord(v) => v.fmt(f),
            PlcValue::DInt(v) => v.fmt(f),
            PlcValue::Real(v) => v.fmt(f),
            PlcValue::LReal(v) => v.fmt(f),
            PlcValue::String(v) => v.fmt(f),
        }
    }
}

/// A Rust type a tag can be read as.
///
/// The bridge only needs `Display`; decoding from [`PlcValue`] is what
/// [`PlcTags`] implementations use to produce typed streams.
pub trait TagValue: fmt::Display + Send + Sized + 'static {
    fn from_plc_value(value: PlcValue) -> Result<Self, PlcError>;
}

impl TagValue for PlcValue {
    fn from_plc_value(value: PlcValue) -> Result<Self, PlcError> {
        Ok(value)
    }
}

impl TagValue for bool {
    fn from_plc_value(value: PlcValue) -> Result<Self, PlcError> {
        match value {
            PlcValue::Bool(v) => Ok(v),
            other => Err(PlcError::TypeMismatch {
                expected: "bool",
                found: other.kind(),
            }),
        }
    }
}

impl TagValue for String {
    fn from_plc_value(value: PlcValue) -> Result<Self, PlcError> {
        match value {
            PlcValue::String(v) => Ok(v),
            other => Err(PlcError::TypeMismatch {
                expected: "String",
                found: other.kind(),
            }),
        }
    }
}

macro_rules! integer_tag_value {
    ($($ty:ty),*) => {
        $(
            impl TagValue for $ty {
                fn from_plc_value(value: PlcValue) -> Result<Self, PlcError> {
                    let raw = value.as_integer().ok_or(PlcError::TypeMismatch {
                        expected: stringify!($ty),
                        found: value.kind(),
                    })?;
                    <$ty>::try_from(raw).map_err(|_| PlcError::OutOfRange {
                        expected: stringify!($ty),
                        value: raw.to_string(),
                    })
                }
            }
        )*
    };
}

integer_tag_value!(u8, u16, i16, u32, i32, i64);

impl TagValue for f64 {
    fn from_plc_value(value: PlcValue) -> Result<Self, PlcError> {
        value.as_float().ok_or(PlcError::TypeMismatch {
            expected: "f64",
            found: value.kind(),
        })
    }
}

impl TagValue for f32 {
    fn from_plc_value(value: PlcValue) -> Result<Self, PlcError> {
        match value {
            PlcValue::Real(v) => Ok(v),
            other => other
                .as_float()
                .map(|v| v as f32)
                .ok_or(PlcError::TypeMismatch {
                    expected: "f32",
                    found: other.kind(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widening() {
        assert_eq!(u16::from_plc_value(PlcValue::Byte(7)).unwrap(), 7);
        assert_eq!(i64::from_plc_value(PlcValue::DWord(u32::MAX)).unwrap(), u32::MAX as i64);
        assert_eq!(i32::from_plc_value(PlcValue::Int(-5)).unwrap(), -5);
    }

    #[test]
    fn test_integer_out_of_range() {
        let err = u8::from_plc_value(PlcValue::Word(300)).unwrap_err();
        assert_eq!(
            err,
            PlcError::OutOfRange {
                expected: "u8",
                value: "300".into()
            }
        );
        assert!(u16::from_plc_value(PlcValue::Int(-1)).is_err());
    }

    #[test]
    fn test_type_mismatch() {
        let err = bool::from_plc_value(PlcValue::Word(1)).unwrap_err();
        assert_eq!(
            err,
            PlcError::TypeMismatch {
                expected: "bool",
                found: "Word"
            }
        );
        assert!(u16::from_plc_value(PlcValue::Real(1.0)).is_err());
        assert!(String::from_plc_value(PlcValue::Bool(true)).is_err());
    }

    #[test]
    fn test_float_accepts_numeric_variants() {
        assert_eq!(f64::from_plc_value(PlcValue::Word(3)).unwrap(), 3.0);
        assert_eq!(f32::from_plc_value(PlcValue::Real(1.5)).unwrap(), 1.5);
        assert_eq!(f32::from_plc_value(PlcValue::LReal(2.25)).unwrap(), 2.25);
    }

    #[test]
    fn test_display_matches_inner_value() {
        assert_eq!(PlcValue::Word(1).to_string(), "1");
        assert_eq!(PlcValue::Real(0.5).to_string(), "0.5");
        assert_eq!(PlcValue::Bool(false).to_string(), "false");
    }

    #[test]
    fn test_serde_representation() {
        let json = serde_json::to_value(PlcValue::Word(12)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Word", "value": 12}));

        let back: PlcValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, PlcValue::Word(12));
    }
}
