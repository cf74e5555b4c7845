//! Dynamically typed cache values.
//!
//! Backends only store bytes, so every value travels through the envelope
//! codec as a [`CacheValue`]. The serialized form keeps an explicit type tag,
//! which lets a reader rebuild the original variant without knowing it in
//! advance and then down-cast with `TryFrom`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::cache::CacheError;

/// A value stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CacheValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(#[serde(with = "float_repr")] f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<CacheValue>),
    Map(BTreeMap<String, CacheValue>),
}

impl CacheValue {
    /// Name of the variant, used in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            CacheValue::Null => "null",
            CacheValue::Bool(_) => "bool",
            CacheValue::Int(_) => "int",
            CacheValue::Float(_) => "float",
            CacheValue::String(_) => "string",
            CacheValue::Bytes(_) => "bytes",
            CacheValue::List(_) => "list",
            CacheValue::Map(_) => "map",
        }
    }

    /// Convert any serializable structure into a cache value.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, CacheError> {
        let json = serde_json::to_value(value).map_err(|e| CacheError::Codec(e.to_string()))?;
        Ok(Self::from_json(json))
    }

    /// Rebuild a structure previously stored with [`CacheValue::from_serialize`].
    pub fn deserialize_into<T: DeserializeOwned>(self) -> Result<T, CacheError> {
        serde_json::from_value(self.into_json()).map_err(|e| CacheError::Codec(e.to_string()))
    }

    /// Map an untagged JSON document onto the closest cache value.
    ///
    /// Integers that fit in `i64` become `Int`; anything else numeric becomes `Float`.
    pub fn from_json(json: Value) -> Self {
        match json {
            Value::Null => CacheValue::Null,
            Value::Bool(b) => CacheValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CacheValue::Int(i),
                None => CacheValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => CacheValue::String(s),
            Value::Array(items) => {
                CacheValue::List(items.into_iter().map(Self::from_json).collect())
            }
            Value::Object(map) => CacheValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Untagged JSON rendering. Bytes become an array of numbers and
    /// non-finite floats become `null`.
    pub fn into_json(self) -> Value {
        match self {
            CacheValue::Null => Value::Null,
            CacheValue::Bool(b) => Value::Bool(b),
            CacheValue::Int(i) => Value::Number(i.into()),
            CacheValue::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            CacheValue::String(s) => Value::String(s),
            CacheValue::Bytes(bytes) => {
                Value::Array(bytes.into_iter().map(|b| Value::Number(b.into())).collect())
            }
            CacheValue::List(items) => {
                Value::Array(items.into_iter().map(Self::into_json).collect())
            }
            CacheValue::Map(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect(),
            ),
        }
    }

    fn mismatch(&self, expected: &'static str) -> CacheError {
        CacheError::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }
}

/// JSON has no literal for infinities or NaN, so those are spelled as strings.
mod float_repr {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    const INF: &str = "inf";
    const NEG_INF: &str = "-inf";
    const NAN: &str = "nan";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_sign_positive() {
            serializer.serialize_str(INF)
        } else {
            serializer.serialize_str(NEG_INF)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Named(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Named(name) => match name.as_str() {
                INF => Ok(f64::INFINITY),
                NEG_INF => Ok(f64::NEG_INFINITY),
                NAN => Ok(f64::NAN),
                other => Err(D::Error::custom(format!("invalid float '{other}'"))),
            },
        }
    }
}

impl fmt::Display for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheValue::String(s) => f.write_str(s),
            other => write!(f, "{}", other.clone().into_json()),
        }
    }
}

// ============================================================================
// Conversions into CacheValue
// ============================================================================

impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        CacheValue::Bool(value)
    }
}

impl From<i32> for CacheValue {
    fn from(value: i32) -> Self {
        CacheValue::Int(value.into())
    }
}

impl From<u32> for CacheValue {
    fn from(value: u32) -> Self {
        CacheValue::Int(value.into())
    }
}

impl From<i64> for CacheValue {
    fn from(value: i64) -> Self {
        CacheValue::Int(value)
    }
}

impl From<f64> for CacheValue {
    fn from(value: f64) -> Self {
        CacheValue::Float(value)
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::String(value.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::String(value)
    }
}

impl<T: Into<CacheValue>> From<Vec<T>> for CacheValue {
    fn from(items: Vec<T>) -> Self {
        CacheValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, CacheValue>> for CacheValue {
    fn from(map: BTreeMap<String, CacheValue>) -> Self {
        CacheValue::Map(map)
    }
}

// ============================================================================
// Down-casts out of CacheValue
// ============================================================================

impl TryFrom<CacheValue> for bool {
    type Error = CacheError;

    fn try_from(value: CacheValue) -> Result<Self, Self::Error> {
        match value {
            CacheValue::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }
}

impl TryFrom<CacheValue> for i64 {
    type Error = CacheError;

    fn try_from(value: CacheValue) -> Result<Self, Self::Error> {
        match value {
            CacheValue::Int(i) => Ok(i),
            other => Err(other.mismatch("int")),
        }
    }
}

impl TryFrom<CacheValue> for f64 {
    type Error = CacheError;

    fn try_from(value: CacheValue) -> Result<Self, Self::Error> {
        match value {
            CacheValue::Float(f) => Ok(f),
            CacheValue::Int(i) => Ok(i as f64),
            other => Err(other.mismatch("float")),
        }
    }
}

impl TryFrom<CacheValue> for String {
    type Error = CacheError;

    fn try_from(value: CacheValue) -> Result<Self, Self::Error> {
        match value {
            CacheValue::String(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }
}

impl TryFrom<CacheValue> for Vec<u8> {
    type Error = CacheError;

    fn try_from(value: CacheValue) -> Result<Self, Self::Error> {
        match value {
            CacheValue::Bytes(bytes) => Ok(bytes),
            other => Err(other.mismatch("bytes")),
        }
    }
}

impl TryFrom<CacheValue> for Vec<CacheValue> {
    type Error = CacheError;

    fn try_from(value: CacheValue) -> Result<Self, Self::Error> {
        match value {
            CacheValue::List(items) => Ok(items),
            other => Err(other.mismatch("list")),
        }
    }
}

impl TryFrom<CacheValue> for Vec<String> {
    type Error = CacheError;

    fn try_from(value: CacheValue) -> Result<Self, Self::Error> {
        Vec::<CacheValue>::try_from(value)?
            .into_iter()
            .map(String::try_from)
            .collect()
    }
}

impl TryFrom<CacheValue> for BTreeMap<String, CacheValue> {
    type Error = CacheError;

    fn try_from(value: CacheValue) -> Result<Self, Self::Error> {
        match value {
            CacheValue::Map(map) => Ok(map),
            other => Err(other.mismatch("map")),
        }
    }
}
