use serde_json::Value;

/// Sanitizes sensitive fields in JSON payloads for logging.
///
/// Masks sensitive keys, and the `Value` of `{"Name": .., "Value": ..}`
/// metadata items whose name is sensitive (callback phone numbers).
pub fn sanitize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sensitive_item = map
                .get("Name")
                .and_then(Value::as_str)
                .map(is_sensitive_field)
                .unwrap_or(false);

            let mut sanitized = serde_json::Map::new();
            for (key, val) in map {
                let sanitized_val = if is_sensitive_field(key) || (sensitive_item && key == "Value")
                {
                    mask_value(val)
                } else {
                    sanitize_json(val)
                };
                sanitized.insert(key.clone(), sanitized_val);
            }
            Value::Object(sanitized)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sanitize_json).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_field(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "phone"
            | "phonenumber"
            | "phoneno"
            | "msisdn"
            | "partya"
            | "password"
            | "passkey"
            | "secret"
            | "token"
            | "access_token"
            | "authorization"
    )
}

fn mask_value(value: &Value) -> Value {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Value::String("****".to_string()),
    };

    if text.len() > 8 && text.is_ascii() {
        let visible = &text[..4];
        let end = &text[text.len() - 3..];
        Value::String(format!("{}****{}", visible, end))
    } else {
        Value::String("****".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_phone_key() {
        let input = json!({
            "phone": "254712345678",
            "packageId": "p_sh19"
        });

        let sanitized = sanitize_json(&input);
        assert_eq!(sanitized["phone"], "2547****678");
        assert_eq!(sanitized["packageId"], "p_sh19");
    }

    #[test]
    fn test_sanitize_callback_metadata() {
        let input = json!({
            "Body": { "stkCallback": { "CallbackMetadata": { "Item": [
                { "Name": "Amount", "Value": 19 },
                { "Name": "PhoneNumber", "Value": 254712345678u64 }
            ]}}}
        });

        let sanitized = sanitize_json(&input);
        let items = &sanitized["Body"]["stkCallback"]["CallbackMetadata"]["Item"];
        assert_eq!(items[0]["Value"], 19);
        assert_eq!(items[1]["Value"], "2547****678");
        assert_eq!(items[1]["Name"], "PhoneNumber");
    }

    #[test]
    fn test_short_values_fully_masked() {
        let sanitized = sanitize_json(&json!({ "password": "abc" }));
        assert_eq!(sanitized["password"], "****");
    }
}
