//! Network abstraction traits for the robot relay.
//!
//! The kiosk talks to a mobile robot through an MQTT broker. The transport is
//! kept behind [`MqttClient`] so the relay can be tested with
//! [`crate::hal::MockMqtt`] and run on `rumqttc` in production.
//!
//! ```text
//! temi/<serial>/command/tts            - Speak text
//! temi/<serial>/command/waypoint/goto  - Drive to a saved location
//! temi/<serial>/command/move/turn_by   - Rotate in place
//! temi/<serial>/command/move/joystick  - Continuous joystick input
//! temi/<serial>/command/move/stop      - Stop any movement
//! temi/<serial>/status/info            - Robot status (locations)
//! ```

/// MQTT client trait for pub/sub messaging.
///
/// Sync-first: `publish` and `subscribe` may block briefly, `try_recv`
/// never blocks.
///
/// # Example
///
/// ```rust,ignore
/// use cam_kiosk::traits::MqttClient;
///
/// fn say<M: MqttClient>(client: &mut M, text: &str) {
///     let payload = format!(r#"{{"utterance":"{}"}}"#, text);
///     client.publish("temi/00119/command/tts", payload.as_bytes(), false).unwrap();
/// }
/// ```
pub trait MqttClient {
    /// Error type for MQTT operations.
    type Error: core::fmt::Debug;

    /// Publish a message to a topic.
    ///
    /// # Arguments
    /// - `topic`: MQTT topic path
    /// - `payload`: Message bytes
    /// - `retain`: If true, broker keeps message for new subscribers
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;

    /// Subscribe to a topic.
    ///
    /// Supports wildcards: `temi/#` or `temi/+/status/info`
    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Try to receive the next message (non-blocking).
    fn try_recv(&mut self) -> Option<MqttMessage>;

    /// Check if connected to broker.
    fn is_connected(&self) -> bool;
}

/// An MQTT message received from a subscription.
#[derive(Clone, Debug)]
pub struct MqttMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Message payload as raw bytes.
    pub payload: Vec<u8>,
}

impl MqttMessage {
    /// Create a new MQTT message.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the payload as a UTF-8 string, if valid.
    pub fn payload_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_payload_str() {
        let msg = MqttMessage::new("temi/1/status/info", b"{}".to_vec());
        assert_eq!(msg.payload_str(), Some("{}"));
        assert_eq!(msg.topic, "temi/1/status/info");
    }

    #[test]
    fn message_payload_str_invalid_utf8() {
        let msg = MqttMessage::new("temi/1/status/info", vec![0xFF, 0xFE]);
        assert_eq!(msg.payload_str(), None);
    }
}
