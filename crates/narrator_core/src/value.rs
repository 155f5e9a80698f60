//! Lenient field extraction over untyped JSON payloads.
//!
//! Push frames and manifests come from several backend versions, so every
//! lookup accepts a list of candidate keys and tolerates numbers encoded as
//! strings.

use serde_json::{Map, Value};

pub(crate) type Object = Map<String, Value>;

pub(crate) fn first<'a>(obj: &'a Object, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

/// Non-empty, trimmed string. Integers are accepted and rendered in decimal.
pub(crate) fn string(obj: &Object, keys: &[&str]) -> Option<String> {
    first(obj, keys).and_then(as_identifier)
}

pub(crate) fn as_identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) if number.is_i64() || number.is_u64() => Some(number.to_string()),
        _ => None,
    }
}

/// Free text; keeps inner whitespace but drops blank values.
pub(crate) fn text(obj: &Object, keys: &[&str]) -> Option<String> {
    match first(obj, keys)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        _ => None,
    }
}

pub(crate) fn number(obj: &Object, keys: &[&str]) -> Option<f64> {
    first(obj, keys).and_then(as_number)
}

/// Like `number`, but only a JSON number counts; numeric strings do not.
pub(crate) fn json_number(obj: &Object, keys: &[&str]) -> Option<f64> {
    first(obj, keys)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
}

pub(crate) fn as_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

pub(crate) fn count(obj: &Object, keys: &[&str]) -> Option<u32> {
    let value = number(obj, keys)?;
    if value < 0.0 {
        return None;
    }
    Some(value.floor().min(f64::from(u32::MAX)) as u32)
}

pub(crate) fn object<'a>(obj: &'a Object, keys: &[&str]) -> Option<&'a Object> {
    first(obj, keys).and_then(Value::as_object)
}

pub(crate) fn array<'a>(obj: &'a Object, keys: &[&str]) -> Option<&'a Vec<Value>> {
    first(obj, keys).and_then(Value::as_array)
}

/// Strings, or objects carrying the text under one of `keys`.
pub(crate) fn string_list(obj: &Object, list_keys: &[&str], keys: &[&str]) -> Vec<String> {
    array(obj, list_keys)
        .map(|values| {
            values
                .iter()
                .filter_map(|value| match value {
                    Value::String(text) => {
                        let trimmed = text.trim();
                        (!trimmed.is_empty()).then(|| trimmed.to_string())
                    }
                    Value::Object(inner) => string(inner, keys),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Clamp a confidence-like score into `[0, 1]`.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Object {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        let frame = obj(json!({"a": "0.25", "b": 3, "c": "nope"}));
        assert_eq!(number(&frame, &["a"]), Some(0.25));
        assert_eq!(number(&frame, &["b"]), Some(3.0));
        assert_eq!(number(&frame, &["c"]), None);
        assert_eq!(json_number(&frame, &["a"]), None);
        assert_eq!(json_number(&frame, &["b"]), Some(3.0));
    }

    #[test]
    fn first_key_wins_and_nulls_are_skipped() {
        let frame = obj(json!({"slide_id": null, "id": 7}));
        assert_eq!(string(&frame, &["slide_id", "id"]), Some("7".to_string()));
    }

    #[test]
    fn clamp_handles_nan_and_bounds() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(0.4), 0.4);
    }
}
