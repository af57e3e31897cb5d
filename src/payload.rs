//! Value marshaling and variadic hash-argument parsing.
//!
//! The cache stores opaque string payloads: a string value is stored
//! verbatim, any other value is JSON-marshaled before storage, and reads
//! always return the stored string form. Typed (de)serialization stays at
//! the call site via [`encode`] and [`decode`]; the backends only ever see
//! [`serde_json::Value`] and strings.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Marshal a dynamic value into its stored string form.
///
/// Strings are stored verbatim, `Null` is rejected with `ValueNull`,
/// everything else is JSON-marshaled.
pub fn marshal(value: &Value) -> Result<String> {
    match value {
        Value::Null => Err(Error::ValueNull),
        Value::String(s) => Ok(s.clone()),
        other => Ok(serde_json::to_string(other)?),
    }
}

/// Encode a typed value into its stored string form.
///
/// Call-site helper for typed writes: `set(key, &json!(payload), ttl)` and
/// `encode(&payload)?` produce the same stored representation.
pub fn encode<T: Serialize>(value: &T) -> Result<String> {
    marshal(&serde_json::to_value(value)?)
}

/// Decode a stored payload back into a typed value.
///
/// The backends never re-hydrate typed values; this is the caller's side of
/// the serialization rule.
pub fn decode<T: DeserializeOwned>(payload: &str) -> Result<T> {
    Ok(serde_json::from_str(payload)?)
}

/// Marshal a field map into field/payload pairs for a bulk hash write.
///
/// Empty fields are `FieldNull`, empty payloads `ValueNull`; nothing is
/// written if any entry fails.
pub fn pairs_from_map(map: &serde_json::Map<String, Value>) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(map.len());
    for (field, value) in map {
        if field.is_empty() {
            return Err(Error::FieldNull);
        }
        let payload = marshal(value)?;
        if payload.is_empty() {
            return Err(Error::ValueNull);
        }
        pairs.push((field.clone(), payload));
    }
    Ok(pairs)
}

/// Parsed form of a variadic `hset` argument list.
pub enum HsetArgs {
    /// Alternating field/value pairs, values already marshaled.
    Pairs(Vec<(String, String)>),
    /// Object shorthand: delegate to `hmset` with the backend default TTL.
    Map(serde_json::Map<String, Value>),
}

/// Parse the variadic `hset` argument list.
///
/// Arguments alternate field, value, field, value. A field must be a string
/// (`HashFieldType` otherwise) and non-empty (`FieldNull`); a field without a
/// trailing value is `FieldValueCount`. An object in field position is the
/// map shorthand and short-circuits the rest of the list. Everything is
/// validated here, before any store write.
pub fn parse_hset_args(args: &[Value]) -> Result<HsetArgs> {
    let mut pairs = Vec::with_capacity(args.len() / 2);

    let mut i = 0;
    while i < args.len() {
        let field = match &args[i] {
            Value::String(s) => s.clone(),
            Value::Object(map) => return Ok(HsetArgs::Map(map.clone())),
            _ => return Err(Error::HashFieldType),
        };
        if i + 1 >= args.len() {
            return Err(Error::FieldValueCount);
        }
        if field.is_empty() {
            return Err(Error::FieldNull);
        }
        let payload = marshal(&args[i + 1])?;
        if payload.is_empty() {
            return Err(Error::ValueNull);
        }
        pairs.push((field, payload));
        i += 2;
    }

    Ok(HsetArgs::Pairs(pairs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_marshal_string_verbatim() {
        let payload = marshal(&json!("plain")).expect("marshal failed");
        assert_eq!(payload, "plain");
    }

    #[test]
    fn test_marshal_non_string_is_json() {
        let payload = marshal(&json!({"id": 1})).expect("marshal failed");
        assert_eq!(payload, "{\"id\":1}");

        let payload = marshal(&json!(42)).expect("marshal failed");
        assert_eq!(payload, "42");
    }

    #[test]
    fn test_marshal_null_rejected() {
        assert_eq!(marshal(&Value::Null), Err(Error::ValueNull));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct User {
            id: u64,
            name: String,
        }

        let user = User {
            id: 7,
            name: "Alice".to_string(),
        };
        let payload = encode(&user).expect("encode failed");
        let back: User = decode(&payload).expect("decode failed");
        assert_eq!(back, user);
    }

    #[test]
    fn test_parse_pairs() {
        let args = vec![json!("f1"), json!("v1"), json!("f2"), json!({"n": 2})];
        let parsed = parse_hset_args(&args).expect("parse failed");
        match parsed {
            HsetArgs::Pairs(pairs) => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[0], ("f1".to_string(), "v1".to_string()));
                assert_eq!(pairs[1], ("f2".to_string(), "{\"n\":2}".to_string()));
            }
            HsetArgs::Map(_) => panic!("expected pairs"),
        }
    }

    #[test]
    fn test_parse_map_shorthand() {
        let args = vec![json!({"a": "1", "b": "2"})];
        let parsed = parse_hset_args(&args).expect("parse failed");
        match parsed {
            HsetArgs::Map(map) => assert_eq!(map.len(), 2),
            HsetArgs::Pairs(_) => panic!("expected map shorthand"),
        }
    }

    #[test]
    fn test_parse_non_string_field() {
        let args = vec![json!(1), json!("v1")];
        let err = parse_hset_args(&args).map(|_| ()).expect_err("must fail");
        assert_eq!(err, Error::HashFieldType);
    }

    #[test]
    fn test_parse_odd_count() {
        let args = vec![json!("f1"), json!("v1"), json!("dangling")];
        let err = parse_hset_args(&args).map(|_| ()).expect_err("must fail");
        assert_eq!(err, Error::FieldValueCount);
    }

    #[test]
    fn test_parse_empty_field() {
        let args = vec![json!(""), json!("v1")];
        let err = parse_hset_args(&args).map(|_| ()).expect_err("must fail");
        assert_eq!(err, Error::FieldNull);
    }

    #[test]
    fn test_parse_null_value() {
        let args = vec![json!("f1"), Value::Null];
        let err = parse_hset_args(&args).map(|_| ()).expect_err("must fail");
        assert_eq!(err, Error::ValueNull);
    }
}
