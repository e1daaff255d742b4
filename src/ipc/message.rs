//! The dynamic message type exchanged with the compositor.
//!
//! Messages stay untyped JSON at this layer.  Only the routing
//! discriminators are inspected here:
//!
//! | Key      | Direction | Meaning                                  |
//! |----------|-----------|------------------------------------------|
//! | `method` | outbound  | the method being called                  |
//! | `event`  | inbound   | an asynchronous push, not a call result  |
//! | `error`  | inbound   | the call in flight failed                |
//!
//! Consumers that need specific fields deserialize them on their own (see
//! [`menu`](crate::menu)).

use serde_json::{json, Map, Value};

/// One decoded frame payload.
pub type Message = Value;

/// Build an outbound request `{"method": method, "data": {}}`.
pub fn request(method: &str) -> Message {
    json!({ "method": method, "data": {} })
}

/// Build an outbound request with the given `data` payload.
pub fn request_with(method: &str, data: Map<String, Value>) -> Message {
    json!({ "method": method, "data": Value::Object(data) })
}

/// The `method` of a message, if it carries a string one.
pub fn method(message: &Message) -> Option<&str> {
    message.get("method").and_then(Value::as_str)
}

/// The `event` name of an inbound push, if any.
pub fn event_name(message: &Message) -> Option<&str> {
    message.get("event").and_then(Value::as_str)
}

/// `true` when the message is an asynchronous push.
///
/// Any `event` key counts, whatever its value.
pub fn is_event(message: &Message) -> bool {
    message.get("event").is_some()
}

/// The error text of an inbound error reply.
///
/// Non-string error values are rendered as JSON so the caller still sees
/// what the compositor sent.
pub fn error_text(message: &Message) -> Option<String> {
    match message.get("error")? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_has_method_and_empty_data() {
        let msg = request("window-rules/events/watch");
        assert_eq!(method(&msg), Some("window-rules/events/watch"));
        assert_eq!(msg["data"], json!({}));
    }

    #[test]
    fn request_with_attaches_data() {
        let mut data = Map::new();
        data.insert("events".into(), json!(["view-focused"]));
        let msg = request_with("subscribe-events", data);
        assert_eq!(msg["data"]["events"], json!(["view-focused"]));
    }

    #[test]
    fn classifies_discriminators() {
        let event = json!({"event": "view-focused", "view": null});
        assert!(is_event(&event));
        assert_eq!(event_name(&event), Some("view-focused"));

        let reply = json!({"result": "ok"});
        assert!(!is_event(&reply));
        assert_eq!(error_text(&reply), None);

        let err = json!({"error": "No such method found!", "method": "x"});
        assert_eq!(error_text(&err).as_deref(), Some("No such method found!"));
        assert_eq!(method(&err), Some("x"));
    }

    #[test]
    fn non_string_error_is_rendered() {
        let err = json!({"error": {"code": 3}});
        assert_eq!(error_text(&err).as_deref(), Some(r#"{"code":3}"#));
    }
}
