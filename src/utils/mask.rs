//! Masking of sensitive configuration values before they are printed or logged

use serde_json::Value;

const MASK: &str = "********";
const SENSITIVE_KEYS: &[&str] = &["password", "secret", "token", "key"];

fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|needle| key.contains(needle))
}

/// Replace every scalar stored under a sensitive key with a mask, recursively
pub fn mask_sensitive(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let masked = match value {
                        Value::Object(_) | Value::Array(_) => mask_sensitive(value),
                        _ if is_sensitive(&key) => Value::String(MASK.to_string()),
                        other => other,
                    };
                    (key, masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(mask_sensitive).collect()),
        other => other,
    }
}
