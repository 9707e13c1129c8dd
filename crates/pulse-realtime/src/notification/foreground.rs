//! Foreground delivery: decode inbound push messages and route them onto
//! the event bus. Rendering is left to the bus subscribers.

use std::sync::Arc;

use serde_json::Value;

use pulse_core::types::InboundMessage;

use super::dedup::MessageDeduplicator;
use crate::bus::EventBus;

/// Data key carrying the sender's message id.
const MESSAGE_ID_KEY: &str = "messageId";

/// Routes foreground push messages onto the bus.
#[derive(Debug)]
pub struct ForegroundRouter {
    /// Event bus
    bus: Arc<EventBus>,
    /// Event name for delivered messages
    event_name: String,
    /// Re-delivery suppression
    dedup: MessageDeduplicator,
}

impl ForegroundRouter {
    /// Create a router publishing under `event_name`.
    pub fn new(bus: Arc<EventBus>, event_name: impl Into<String>, dedup_window_ms: u64) -> Self {
        Self {
            bus,
            event_name: event_name.into(),
            dedup: MessageDeduplicator::new(dedup_window_ms),
        }
    }

    /// Event name used for delivered messages.
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Decode `payload` and publish it. Returns the published message, or
    /// `None` if it was a re-delivery.
    pub fn route(&self, payload: &Value) -> Option<InboundMessage> {
        let message = InboundMessage::from_value(payload).unwrap_or_else(|e| {
            tracing::warn!("Foreground push payload unreadable, delivering empty message: {}", e);
            InboundMessage::default()
        });

        let missing = message.missing_fields();
        if !missing.is_empty() {
            tracing::warn!("Foreground push message missing {:?}", missing);
        }

        if let Some(id) = message.data_str(MESSAGE_ID_KEY) {
            if !self.dedup.should_deliver(id) {
                tracing::debug!("Suppressed re-delivered push message '{}'", id);
                return None;
            }
        }

        self.bus.publish_json(&self.event_name, &message);
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn capture(bus: &Arc<EventBus>, event: &str) -> Arc<Mutex<Vec<Value>>> {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
        let sink = seen.clone();
        bus.subscribe(event, move |p| sink.lock().unwrap().push(p.clone()));
        seen
    }

    #[test]
    fn test_routes_decoded_message() {
        let bus = Arc::new(EventBus::new());
        let seen = capture(&bus, "notification:received");
        let router = ForegroundRouter::new(bus, "notification:received", 1_000);

        router.route(&json!({"title": "Like", "body": "Someone liked your post"}));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![json!({"title": "Like", "body": "Someone liked your post"})]
        );
    }

    #[test]
    fn test_incomplete_message_still_delivered() {
        let bus = Arc::new(EventBus::new());
        let seen = capture(&bus, "n");
        let router = ForegroundRouter::new(bus, "n", 1_000);

        let routed = router.route(&json!({"body": "no title"})).expect("delivered");
        assert_eq!(routed.title, "");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_non_object_payload_delivers_empty_message() {
        let bus = Arc::new(EventBus::new());
        let seen = capture(&bus, "n");
        let router = ForegroundRouter::new(bus, "n", 1_000);

        router.route(&json!(17));
        assert_eq!(*seen.lock().unwrap(), vec![json!({"title": "", "body": ""})]);
    }

    #[tokio::test]
    async fn test_redelivery_suppressed() {
        let bus = Arc::new(EventBus::new());
        let seen = capture(&bus, "n");
        let router = ForegroundRouter::new(bus, "n", 60_000);
        let payload = json!({"title": "t", "body": "b", "data": {"messageId": "m-1"}});

        assert!(router.route(&payload).is_some());
        assert!(router.route(&payload).is_none());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
