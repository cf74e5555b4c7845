//! Value envelope codec.
//!
//! A stored value is always written together with the namespaced key it was
//! stored under. On read the key is checked against the one requested, which
//! catches records written by an incompatible codec or copied under the
//! wrong key.

use serde::{Deserialize, Serialize};

use crate::cache::{CacheError, CacheValue};

/// Current on-disk envelope format version.
pub const ENVELOPE_VERSION: u32 = 1;

/// A single key-value pair as persisted by the backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "v")]
    version: u32,
    key: String,
    value: CacheValue,
}

impl Envelope {
    pub fn new(key: impl Into<String>, value: CacheValue) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            key: key.into(),
            value,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &CacheValue {
        &self.value
    }

    /// Consume the envelope, returning its value if it was stored under `expected_key`.
    pub fn into_value_for(self, expected_key: &str) -> Result<CacheValue, CacheError> {
        if self.key != expected_key {
            return Err(CacheError::Integrity {
                expected: expected_key.to_string(),
                found: self.key,
            });
        }
        Ok(self.value)
    }
}

/// Serialize an envelope into an opaque byte payload.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, CacheError> {
    serde_json::to_vec(envelope).map_err(|e| CacheError::Codec(format!("encode failed: {e}")))
}

/// Parse a payload produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<Envelope, CacheError> {
    let envelope: Envelope = serde_json::from_slice(bytes)
        .map_err(|e| CacheError::Codec(format!("decode failed: {e}")))?;

    if envelope.version != ENVELOPE_VERSION {
        return Err(CacheError::Codec(format!(
            "unsupported envelope version {} (expected {})",
            envelope.version, ENVELOPE_VERSION
        )));
    }

    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_encode_decode() {
        let mut map = BTreeMap::new();
        map.insert("foo".to_string(), CacheValue::from("bar"));
        let envelope = Envelope::new("app:foo", CacheValue::Map(map));

        let bytes = encode(&envelope).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.key(), "app:foo");
    }

    #[test]
    fn test_infinite_float_round_trips() {
        let envelope = Envelope::new("app:f", CacheValue::Float(f64::INFINITY));
        let decoded = decode(&encode(&envelope).unwrap()).unwrap();
        assert_eq!(decoded.into_value_for("app:f").unwrap(), CacheValue::Float(f64::INFINITY));
    }

    #[test]
    fn test_decode_truncated() {
        let bytes = encode(&Envelope::new("app:k", CacheValue::from("value"))).unwrap();
        let err = decode(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, CacheError::Codec(_)));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode(b"\x00\x01not json"),
            Err(CacheError::Codec(_))
        ));
        assert!(matches!(decode(b""), Err(CacheError::Codec(_))));
    }

    #[test]
    fn test_decode_rejects_other_version() {
        let bytes = br#"{"v":2,"key":"app:k","value":{"type":"int","value":1}}"#;
        let err = decode(bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported envelope version 2"));
    }

    #[test]
    fn test_key_mismatch_is_integrity_error() {
        let envelope = Envelope::new("app:a", CacheValue::from(1i64));
        match envelope.into_value_for("app:b") {
            Err(CacheError::Integrity { expected, found }) => {
                assert_eq!(expected, "app:b");
                assert_eq!(found, "app:a");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
