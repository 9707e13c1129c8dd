//! Inbound push message shape.
//!
//! Both execution contexts receive the same payload shape. This module is
//! the only thing they share: how each of them reacts to a message is
//! decided separately by the foreground gateway and the background worker.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// A push message as delivered by the push service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Notification title.
    #[serde(default)]
    pub title: String,
    /// Notification body text.
    #[serde(default)]
    pub body: String,
    /// Icon URL, if the sender supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Free-form application data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

/// Envelope used by push services that nest the visible part.
#[derive(Debug, Deserialize)]
struct Envelope {
    notification: Map<String, Value>,
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

impl InboundMessage {
    /// Create a message with a title and body.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: None,
            data: None,
        }
    }

    /// Decode a raw push payload.
    ///
    /// Accepts the flat `{title, body, icon?, data?}` shape and the nested
    /// `{notification: {title, body, icon?}, data?}` envelope. Missing
    /// fields decode as empty; only a payload that is not an object fails.
    pub fn from_value(value: &Value) -> Result<Self, AppError> {
        if !value.is_object() {
            return Err(AppError::malformed_payload(format!(
                "push payload must be an object, got {}",
                kind_of(value)
            )));
        }

        if let Ok(envelope) = Envelope::deserialize(value) {
            let mut message = Self::from_fields(&envelope.notification);
            message.data = envelope.data;
            return Ok(message);
        }

        let mut message = Self::from_fields(value.as_object().into_iter().flatten());
        message.data = value.get("data").and_then(Value::as_object).cloned();
        Ok(message)
    }

    /// Names of required fields that are missing or empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.body.trim().is_empty() {
            missing.push("body");
        }
        missing
    }

    /// Whether the message carries every required field.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// String value stored under `key` in the data map.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key)?.as_str()
    }

    fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a String, &'a Value)>) -> Self {
        let mut message = Self::default();
        for (key, value) in fields {
            let Some(text) = value.as_str() else { continue };
            match key.as_str() {
                "title" => message.title = text.to_string(),
                "body" => message.body = text.to_string(),
                // Some senders put the icon under `image`.
                "icon" | "image" if message.icon.is_none() && !text.is_empty() => {
                    message.icon = Some(text.to_string())
                }
                _ => {}
            }
        }
        message
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_flat_payload() {
        let msg = InboundMessage::from_value(&json!({
            "title": "Like",
            "body": "Someone liked your post",
            "icon": "/img/heart.png",
            "data": { "postId": "p1" }
        }))
        .expect("decode");

        assert_eq!(msg.title, "Like");
        assert_eq!(msg.body, "Someone liked your post");
        assert_eq!(msg.icon.as_deref(), Some("/img/heart.png"));
        assert_eq!(msg.data_str("postId"), Some("p1"));
        assert!(msg.is_complete());
    }

    #[test]
    fn test_nested_envelope() {
        let msg = InboundMessage::from_value(&json!({
            "notification": { "title": "Follow", "body": "New follower", "image": "/f.png" },
            "data": { "messageId": "m-1" }
        }))
        .expect("decode");

        assert_eq!(msg.title, "Follow");
        assert_eq!(msg.icon.as_deref(), Some("/f.png"));
        assert_eq!(msg.data_str("messageId"), Some("m-1"));
    }

    #[test]
    fn test_missing_fields_decode_empty() {
        let msg = InboundMessage::from_value(&json!({ "body": 42 })).expect("decode");
        assert_eq!(msg.missing_fields(), vec!["title", "body"]);
        assert!(msg.icon.is_none());
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = InboundMessage::from_value(&json!("hello")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedPayload);
    }

    #[test]
    fn test_serialize_omits_absent_optionals() {
        let msg = InboundMessage::new("Like", "Someone liked your post");
        let value = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(value, json!({ "title": "Like", "body": "Someone liked your post" }));
    }
}
