//! Conversion between plain JSON and the document store's typed values.
//!
//! The REST API wraps every field in a single-key object naming its type
//! (`{"stringValue": "x"}`, `{"integerValue": "42"}`, ...). Domain code works
//! with flat `serde_json` maps, so adapters encode on the way out and decode
//! on the way in.

use serde_json::{Map, Number, Value, json};

/// Encode a flat JSON object into a `fields` map.
pub fn encode_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

/// Encode one JSON value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(flag) => json!({ "booleanValue": flag }),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => json!({ "integerValue": integer.to_string() }),
            None => json!({ "doubleValue": number.as_f64() }),
        },
        Value::String(text) => json!({ "stringValue": text }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

/// Decode a `fields` map into a flat JSON object.
///
/// # Errors
///
/// Returns a description of the first value whose type is not recognised.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, String> {
    fields
        .iter()
        .map(|(key, value)| {
            decode_value(value)
                .map(|decoded| (key.clone(), decoded))
                .map_err(|error| format!("field `{key}`: {error}"))
        })
        .collect()
}

/// Decode one typed value.
///
/// Timestamps decode to RFC 3339 strings; references decode to their path.
pub fn decode_value(value: &Value) -> Result<Value, String> {
    let Some((kind, inner)) = value.as_object().and_then(|object| object.iter().next()) else {
        return Err("expected a typed value object".to_owned());
    };
    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| "booleanValue must be a boolean".to_owned()),
        "integerValue" => decode_integer(inner),
        "doubleValue" => decode_double(inner),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|text| Value::String(text.to_owned()))
            .ok_or_else(|| format!("{kind} must be a string")),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => inner
            .get("values")
            .and_then(Value::as_array)
            .map_or(Ok(Vec::new()), |items| {
                items.iter().map(decode_value).collect::<Result<Vec<_>, _>>()
            })
            .map(Value::Array),
        "mapValue" => inner
            .get("fields")
            .and_then(Value::as_object)
            .map_or(Ok(Map::new()), decode_fields)
            .map(Value::Object),
        other => Err(format!("unsupported value type `{other}`")),
    }
}

fn decode_integer(inner: &Value) -> Result<Value, String> {
    let parsed = match inner {
        Value::String(text) => text.parse::<i64>().ok(),
        Value::Number(number) => number.as_i64(),
        _ => None,
    };
    parsed
        .map(|integer| Value::Number(integer.into()))
        .ok_or_else(|| "integerValue must be a 64-bit integer".to_owned())
}

fn decode_double(inner: &Value) -> Result<Value, String> {
    let parsed = match inner {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| "doubleValue must be a finite number".to_owned())
}

/// Quote a field name for use in an update mask or field filter.
///
/// Simple names pass through; anything else is wrapped in backticks with
/// backticks and backslashes escaped.
pub fn field_path(name: &str) -> String {
    let mut chars = name.chars();
    let simple = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_owned()
    } else {
        format!("`{}`", name.replace('\\', r"\\").replace('`', r"\`"))
    }
}
