//! Blob codec
//!
//! Records persist as one JSON object per blob: attribute names to wire
//! primitives. `BTreeMap` keeps field order stable, so encoding the same
//! field map twice yields identical bytes.
//!
//! Round-trip is exact for integers, strings, booleans, and null — the
//! only shapes `Value` admits.

use crate::error::Result;
use crate::value::Value;
use std::collections::BTreeMap;

/// A record's serialized field map: attribute name to wire primitive
pub type FieldMap = BTreeMap<String, Value>;

/// Encode a field map to blob bytes
pub fn encode(fields: &FieldMap) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(fields)?)
}

/// Decode blob bytes back into a field map
pub fn decode(bytes: &[u8]) -> Result<FieldMap> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let mut fields = FieldMap::new();
        fields.insert("active".to_string(), Value::Bool(true));
        fields.insert("started_at".to_string(), Value::Int(1_500_000_000));
        fields.insert("session_id".to_string(), Value::Str("abc-1".to_string()));
        fields.insert("note".to_string(), Value::Null);

        let bytes = encode(&fields).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, fields);
    }

    #[test]
    fn test_encoding_is_stable() {
        let mut fields = FieldMap::new();
        fields.insert("b".to_string(), Value::Int(2));
        fields.insert("a".to_string(), Value::Int(1));

        let first = encode(&fields).unwrap();
        let second = encode(&fields).unwrap();
        assert_eq!(first, second);
        // BTreeMap ordering: "a" serializes before "b"
        let text = String::from_utf8(first).unwrap();
        assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(b"not json").is_err());
        assert!(decode(b"[1,2,3]").is_err());
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            "[a-zA-Z0-9 _-]{0,24}".prop_map(Value::Str),
        ]
    }

    proptest! {
        #[test]
        fn prop_round_trip_exact(fields in prop::collection::btree_map(
            "[a-z][a-z0-9_]{0,12}",
            value_strategy(),
            0..8,
        )) {
            let bytes = encode(&fields).unwrap();
            let decoded = decode(&bytes).unwrap();
            prop_assert_eq!(decoded, fields);
        }
    }
}
