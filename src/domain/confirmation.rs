//! Push-payment confirmation payload as delivered by the provider.
//!
//! The callback body is loosely shaped, so it is read from a
//! `serde_json::Value` rather than deserialized into a strict struct.

use serde_json::Value;

use super::phone::{self, PhoneNumber};

const AMOUNT_ITEM: &str = "amount";
const PHONE_ITEM_ALIASES: &[&str] = &["msisdn", "phoneno", "phonenumber", "phone"];

#[derive(Debug, Clone, PartialEq)]
pub struct CallbackItem {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StkCallback {
    pub checkout_request_id: Option<String>,
    pub result_code: Option<i64>,
    pub result_desc: Option<String>,
    pub items: Vec<CallbackItem>,
    /// The `stkCallback` object exactly as received.
    pub raw: Value,
}

impl StkCallback {
    /// Reads `Body.stkCallback`. `None` when the payload has another shape.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let callback = payload.get("Body")?.get("stkCallback")?;
        if !callback.is_object() {
            return None;
        }

        let items = callback
            .get("CallbackMetadata")
            .and_then(|m| m.get("Item"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let name = item.get("Name")?.as_str()?;
                        Some(CallbackItem {
                            name: name.to_string(),
                            value: item.get("Value").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            checkout_request_id: callback
                .get("CheckoutRequestID")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            result_code: callback.get("ResultCode").and_then(as_integer),
            result_desc: callback
                .get("ResultDesc")
                .and_then(Value::as_str)
                .map(str::to_string),
            items,
            raw: callback.clone(),
        })
    }

    pub fn amount(&self) -> Option<u32> {
        self.item(|name| name == AMOUNT_ITEM)
            .and_then(as_integer)
            .and_then(|n| u32::try_from(n).ok())
    }

    pub fn phone(&self) -> Option<PhoneNumber> {
        let value = self.item(|name| PHONE_ITEM_ALIASES.contains(&name))?;
        let raw = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(phone::normalize(&raw))
    }

    fn item(&self, matches: impl Fn(&str) -> bool) -> Option<&Value> {
        self.items
            .iter()
            .find(|item| matches(&item.name.to_lowercase()))
            .map(|item| &item.value)
    }
}

/// Integer from a JSON number (`19`, `19.0`) or numeric string (`"19"`).
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
