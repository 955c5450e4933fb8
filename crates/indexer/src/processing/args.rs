//! Argument rendering and per-call transforms.
//!
//! Most arguments are stringified verbatim. A small dispatch table keyed by
//! `(module, call)` applies the exceptions: data-submission payloads are
//! stored as a 64-character hex prefix only, and the messaging-bridge calls
//! re-encode their nested token amount as hex. New special cases are new
//! table rows, not new conditionals.

use serde_json::Value;

use super::codec::{json_number_string, strip_hex_prefix};

/// Stored prefix length for data-submission payloads; the full payload is
/// never persisted.
pub const PAYLOAD_PREFIX_CHARS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgTransform {
    /// Replace the hex payload at this position with its 64-char prefix.
    TruncatePayload { arg: usize },
    /// Re-encode the decimal token amount nested in the bridge message at
    /// this position as `0x` hex. `in_message` marks the extra nesting level
    /// of the execute-side call.
    BridgeAmountToHex { arg: usize, in_message: bool },
}

/// Transform applied to an extrinsic's arguments, if any.
pub fn extrinsic_transform(module: &str, call: &str) -> Option<ArgTransform> {
    match (module, call) {
        ("dataAvailability", "submitData") => Some(ArgTransform::TruncatePayload { arg: 0 }),
        ("vector", "execute") => Some(ArgTransform::BridgeAmountToHex {
            arg: 1,
            in_message: true,
        }),
        ("vector", "sendMessage") => Some(ArgTransform::BridgeAmountToHex {
            arg: 0,
            in_message: false,
        }),
        _ => None,
    }
}

/// Transform applied to an event's arguments, if any.
pub fn event_transform(module: &str, event: &str) -> Option<ArgTransform> {
    match (module, event) {
        ("dataAvailability", "DataSubmitted") => Some(ArgTransform::TruncatePayload { arg: 1 }),
        _ => None,
    }
}

/// Render every argument to its stored string form, applying the transform
/// at its position.
pub fn render_args(args: &[Value], transform: Option<ArgTransform>) -> Vec<String> {
    args.iter()
        .enumerate()
        .map(|(i, value)| match transform {
            Some(ArgTransform::TruncatePayload { arg }) if arg == i => truncate_payload(value),
            Some(ArgTransform::BridgeAmountToHex { arg, in_message }) if arg == i => {
                bridge_amount_to_hex(value, in_message)
            }
            _ => stringify(value),
        })
        .collect()
}

/// Verbatim stringification: JSON strings unquoted, everything else compact
/// JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate_payload(value: &Value) -> String {
    let rendered = stringify(value);
    let digits = strip_hex_prefix(&rendered);
    digits.chars().take(PAYLOAD_PREFIX_CHARS).collect()
}

/// Rewrite `fungibleToken.amount` (nested under `message` for the execute
/// call) from a decimal number to `0x` hex. Messages without a fungible
/// token, or with an already-hex amount, pass through verbatim.
fn bridge_amount_to_hex(value: &Value, in_message: bool) -> String {
    let mut message = value.clone();

    let token = if in_message {
        message.get_mut("message")
    } else {
        Some(&mut message)
    }
    .and_then(|m| m.get_mut("fungibleToken"))
    .and_then(|t| t.get_mut("amount"));

    let Some(amount) = token else {
        return stringify(value);
    };

    if amount.as_str().is_some_and(|s| s.starts_with("0x")) {
        return stringify(value);
    }

    let Some(parsed) = json_number_string(amount).and_then(|s| s.parse::<u128>().ok()) else {
        return stringify(value);
    };

    *amount = Value::String(format!("0x{parsed:x}"));
    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_rendering_is_verbatim() {
        let args = vec![json!("plain"), json!(42), json!({"a": 1})];
        let rendered = render_args(&args, None);
        assert_eq!(rendered, vec!["plain", "42", r#"{"a":1}"#]);
    }

    #[test]
    fn test_data_submission_payload_is_truncated() {
        let payload = format!("0x{}", "ab".repeat(100));
        let args = vec![json!(payload)];
        let transform = extrinsic_transform("dataAvailability", "submitData");
        let rendered = render_args(&args, transform);
        assert_eq!(rendered[0].len(), PAYLOAD_PREFIX_CHARS);
        assert!(rendered[0].starts_with("abab"));
    }

    #[test]
    fn test_short_payload_is_kept_whole() {
        let args = vec![json!("0xabcd")];
        let transform = extrinsic_transform("dataAvailability", "submitData");
        let rendered = render_args(&args, transform);
        assert_eq!(rendered[0], "abcd");
    }

    #[test]
    fn test_event_payload_truncates_second_arg() {
        let payload = format!("0x{}", "cd".repeat(100));
        let args = vec![json!("5Grwva"), json!(payload)];
        let transform = event_transform("dataAvailability", "DataSubmitted");
        let rendered = render_args(&args, transform);
        assert_eq!(rendered[0], "5Grwva");
        assert_eq!(rendered[1].len(), PAYLOAD_PREFIX_CHARS);
    }

    #[test]
    fn test_send_message_amount_re_encoded() {
        let args = vec![json!({
            "fungibleToken": {"assetId": "0x00", "amount": 1000000},
            "to": "0x11"
        })];
        let transform = extrinsic_transform("vector", "sendMessage");
        let rendered = render_args(&args, transform);
        let reparsed: Value = serde_json::from_str(&rendered[0]).unwrap();
        assert_eq!(reparsed["fungibleToken"]["amount"], json!("0xf4240"));
    }

    #[test]
    fn test_execute_amount_re_encoded_inside_message() {
        let args = vec![
            json!(123),
            json!({"message": {"fungibleToken": {"assetId": "0x00", "amount": "256"}}}),
        ];
        let transform = extrinsic_transform("vector", "execute");
        let rendered = render_args(&args, transform);
        let reparsed: Value = serde_json::from_str(&rendered[1]).unwrap();
        assert_eq!(
            reparsed["message"]["fungibleToken"]["amount"],
            json!("0x100")
        );
    }

    #[test]
    fn test_already_hex_amount_passes_through() {
        let message = json!({"fungibleToken": {"assetId": "0x00", "amount": "0xff"}});
        let args = vec![message.clone()];
        let transform = extrinsic_transform("vector", "sendMessage");
        let rendered = render_args(&args, transform);
        assert_eq!(rendered[0], stringify(&message));
    }

    #[test]
    fn test_message_without_token_passes_through() {
        let message = json!({"arbitraryMessage": "0xdead"});
        let args = vec![message.clone()];
        let transform = extrinsic_transform("vector", "sendMessage");
        let rendered = render_args(&args, transform);
        assert_eq!(rendered[0], stringify(&message));
    }

    #[test]
    fn test_unlisted_calls_have_no_transform() {
        assert_eq!(extrinsic_transform("balances", "transfer"), None);
        assert_eq!(event_transform("balances", "Transfer"), None);
    }
}
