use crate::model::AttributeType;
use serde_json::Value;

/// Decode/encode rule pair for one declared attribute type, chosen once at
/// construction. Decoding turns a raw stored string into a typed JSON value;
/// encoding is the inverse path used on update.
#[derive(Clone, Copy)]
pub struct ValueCodec {
    ty: AttributeType,
    decode: fn(Option<&str>) -> Value,
    encode: fn(&Value) -> Option<String>,
}

impl ValueCodec {
    pub fn for_type(ty: AttributeType) -> Self {
        let (decode, encode): (fn(Option<&str>) -> Value, fn(&Value) -> Option<String>) =
            match ty.base() {
                AttributeType::Int => (decode_int, encode_scalar),
                AttributeType::Bool => (decode_bool, encode_bool),
                AttributeType::Float => (decode_float, encode_scalar),
                AttributeType::MultiEnum | AttributeType::Array => (decode_list, encode_json),
                // enum values pass through as strings; unknown types are a
                // pass-through so reads survive types introduced out of band
                _ => (decode_passthrough, encode_scalar),
            };
        Self { ty, decode, encode }
    }

    pub fn decode(&self, raw: Option<&str>) -> Value {
        (self.decode)(raw)
    }

    /// Locale-qualified fields: an absent value or the raw string "null"
    /// decodes to an empty list for enumerated multilingual types.
    pub fn decode_locale(&self, raw: Option<&str>) -> Value {
        let raw = raw.filter(|v| *v != "null");
        if raw.is_none() && self.ty.is_multilang() {
            return Value::Array(Vec::new());
        }
        (self.decode)(raw)
    }

    pub fn encode(&self, value: &Value) -> Option<String> {
        (self.encode)(value)
    }
}

fn decode_int(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(s) => match s.parse::<i64>() {
            Ok(n) => Value::Number(n.into()),
            // unparseable numerics pass through unchanged
            Err(_) => Value::String(s.to_string()),
        },
    }
}

fn decode_float(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(s) => match s.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            Some(n) => Value::Number(n),
            None => Value::String(s.to_string()),
        },
    }
}

fn decode_bool(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        // truthy coercion: empty string and "0" are false
        Some(s) => Value::Bool(!(s.is_empty() || s == "0")),
    }
}

fn decode_list(raw: Option<&str>) -> Value {
    match raw {
        None | Some("") => Value::Array(Vec::new()),
        Some(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Null) | Err(_) => Value::Array(Vec::new()),
            Ok(parsed) => parsed,
        },
    }
}

fn decode_passthrough(raw: Option<&str>) -> Value {
    match raw {
        None => Value::Null,
        Some(s) => Value::String(s.to_string()),
    }
}

fn encode_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        // objects and arrays are serialized to their JSON raw form
        other => serde_json::to_string(other).ok(),
    }
}

fn encode_bool(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        other => encode_scalar(other),
    }
}

fn encode_json(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        // already-raw JSON strings are stored as-is
        Value::String(s) => Some(s.clone()),
        other => serde_json::to_string(other).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_parses_and_null_stays_null() {
        let codec = ValueCodec::for_type(AttributeType::Int);
        assert_eq!(codec.decode(Some("42")), json!(42));
        assert_eq!(codec.decode(None), Value::Null);
    }

    #[test]
    fn unparseable_numeric_passes_through() {
        let codec = ValueCodec::for_type(AttributeType::Float);
        assert_eq!(codec.decode(Some("n/a")), json!("n/a"));
        assert_eq!(codec.decode(Some("2.5")), json!(2.5));
    }

    #[test]
    fn bool_uses_truthy_coercion() {
        let codec = ValueCodec::for_type(AttributeType::Bool);
        assert_eq!(codec.decode(Some("1")), json!(true));
        assert_eq!(codec.decode(Some("0")), json!(false));
        assert_eq!(codec.decode(Some("")), json!(false));
        assert_eq!(codec.decode(None), Value::Null);
    }

    #[test]
    fn bool_round_trips() {
        let codec = ValueCodec::for_type(AttributeType::Bool);
        let raw = codec.encode(&json!(true)).unwrap();
        assert_eq!(codec.decode(Some(&raw)), json!(true));
    }

    #[test]
    fn array_round_trips() {
        let codec = ValueCodec::for_type(AttributeType::Array);
        let raw = codec.encode(&json!(["x", "y"])).unwrap();
        assert_eq!(codec.decode(Some(&raw)), json!(["x", "y"]));
    }

    #[test]
    fn empty_multi_enum_decodes_to_empty_list_never_null() {
        let codec = ValueCodec::for_type(AttributeType::MultiEnum);
        assert_eq!(codec.decode(None), json!([]));
        assert_eq!(codec.decode(Some("")), json!([]));
        assert_eq!(codec.decode(Some("null")), json!([]));
    }

    #[test]
    fn enum_passes_through_as_string() {
        let codec = ValueCodec::for_type(AttributeType::Enum);
        assert_eq!(codec.decode(Some("red")), json!("red"));
    }

    #[test]
    fn unknown_type_passes_value_through() {
        let codec = ValueCodec::for_type(AttributeType::Unknown);
        assert_eq!(codec.decode(Some("whatever")), json!("whatever"));
        assert_eq!(codec.encode(&json!("whatever")).as_deref(), Some("whatever"));
    }

    #[test]
    fn multilang_locale_field_absent_or_null_decodes_to_empty_list() {
        let codec = ValueCodec::for_type(AttributeType::ArrayMultiLang);
        assert_eq!(codec.decode_locale(None), json!([]));
        assert_eq!(codec.decode_locale(Some("null")), json!([]));
        assert_eq!(codec.decode_locale(Some("[\"a\"]")), json!(["a"]));

        let codec = ValueCodec::for_type(AttributeType::EnumMultiLang);
        assert_eq!(codec.decode_locale(None), json!([]));
        assert_eq!(codec.decode_locale(Some("rot")), json!("rot"));
    }

    #[test]
    fn objects_are_serialized_on_encode() {
        let codec = ValueCodec::for_type(AttributeType::String);
        let raw = codec.encode(&json!({"k": "v"})).unwrap();
        assert_eq!(raw, "{\"k\":\"v\"}");
    }
}
