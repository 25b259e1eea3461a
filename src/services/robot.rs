//! Temi robot relay over MQTT.
//!
//! Commands are JSON payloads published under `temi/<serial>/command/`;
//! robot status arrives on `temi/<serial>/status/info` and is folded into
//! [`RobotInfo`] whenever it is queried.
//!
//! # Example
//!
//! ```rust
//! use cam_kiosk::hal::MockMqtt;
//! use cam_kiosk::services::TemiRobot;
//! use cam_kiosk::traits::RobotLink;
//!
//! let mut robot = TemiRobot::new(MockMqtt::new(), "00119").unwrap();
//! robot.tts("Hello!").unwrap();
//!
//! let (topic, payload, _) = &robot.client().published[0];
//! assert_eq!(topic, "temi/00119/command/tts");
//! assert_eq!(payload.as_slice(), br#"{"utterance":"Hello!"}"#);
//! ```

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::RobotError;
use crate::traits::{MqttClient, RobotInfo, RobotLink};

/// Root of every robot topic.
pub const TOPIC_ROOT: &str = "temi";

/// Status payload published by the robot.
#[derive(Debug, Deserialize)]
struct StatusInfo {
    #[serde(default, alias = "waypoint_list")]
    locations: Option<Vec<String>>,
    #[serde(default)]
    current_location: Option<String>,
}

/// Temi robot reached through any [`MqttClient`].
pub struct TemiRobot<C: MqttClient> {
    client: C,
    serial: String,
    info: RobotInfo,
}

impl<C: MqttClient> TemiRobot<C> {
    /// Attach to the robot with `serial` and subscribe to its status.
    ///
    /// # Errors
    ///
    /// [`RobotError::Connect`] if the status subscription fails.
    pub fn new(client: C, serial: impl Into<String>) -> Result<Self, RobotError> {
        let mut robot = Self {
            client,
            serial: serial.into(),
            info: RobotInfo {
                available: true,
                ..RobotInfo::unavailable()
            },
        };
        let status = robot.topic("status/info");
        robot
            .client
            .subscribe(&status)
            .map_err(|e| RobotError::Connect(format!("{:?}", e)))?;
        tracing::info!("Robot relay attached to {}", robot.topic(""));
        Ok(robot)
    }

    /// Full topic for `suffix` under this robot.
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}/{}/{}", TOPIC_ROOT, self.serial, suffix)
    }

    /// Robot serial number.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Underlying transport.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn command(&mut self, suffix: &str, payload: Value) -> Result<(), RobotError> {
        if !self.client.is_connected() {
            return Err(RobotError::Unavailable);
        }
        let topic = self.topic(&format!("command/{}", suffix));
        let body = payload.to_string();
        tracing::debug!("Robot command {} {}", topic, body);
        self.client
            .publish(&topic, body.as_bytes(), false)
            .map_err(|e| {
                tracing::error!("Robot command {} failed: {:?}", topic, e);
                RobotError::Publish(format!("{:?}", e))
            })
    }

    /// Apply every queued status message.
    fn drain_status(&mut self) {
        let status = self.topic("status/info");
        while let Some(msg) = self.client.try_recv() {
            if msg.topic != status {
                continue;
            }
            match serde_json::from_slice::<StatusInfo>(&msg.payload) {
                Ok(info) => {
                    if let Some(locations) = info.locations {
                        self.info.locations = locations;
                    }
                    if let Some(current) = info.current_location {
                        self.info.current_location = current;
                    }
                }
                Err(e) => tracing::warn!("Ignoring malformed robot status: {}", e),
            }
        }
    }
}

impl<C: MqttClient + Send> RobotLink for TemiRobot<C> {
    fn info(&mut self) -> RobotInfo {
        self.drain_status();
        RobotInfo {
            available: self.client.is_connected(),
            ..self.info.clone()
        }
    }

    fn tts(&mut self, text: &str) -> Result<(), RobotError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RobotError::EmptyText);
        }
        self.command("tts", json!({ "utterance": text }))
    }

    fn goto(&mut self, location: &str) -> Result<(), RobotError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(RobotError::EmptyLocation);
        }
        self.command("waypoint/goto", json!({ "location": location }))
    }

    fn rotate(&mut self, degrees: i32) -> Result<(), RobotError> {
        self.command("move/turn_by", json!({ "angle": degrees }))
    }

    fn joystick(&mut self, x: f32, y: f32) -> Result<(), RobotError> {
        let x = x.clamp(-1.0, 1.0);
        let y = y.clamp(-1.0, 1.0);
        self.command("move/joystick", json!({ "x": x, "y": y }))
    }

    fn stop(&mut self) -> Result<(), RobotError> {
        self.command("move/stop", json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockMqtt;

    fn robot() -> TemiRobot<MockMqtt> {
        TemiRobot::new(MockMqtt::new(), "00119").unwrap()
    }

    fn last_payload(robot: &TemiRobot<MockMqtt>, topic: &str) -> Value {
        let published = robot.client().published_to(topic);
        let (_, payload, retain) = published.last().expect("nothing published");
        assert!(!retain);
        serde_json::from_slice(payload).unwrap()
    }

    #[test]
    fn subscribes_to_status() {
        let robot = robot();
        assert!(robot.client().is_subscribed("temi/00119/status/info"));
        assert_eq!(robot.serial(), "00119");
    }

    #[test]
    fn subscribe_failure_is_connect_error() {
        let result = TemiRobot::new(MockMqtt::default(), "00119");
        assert!(matches!(result, Err(RobotError::Connect(_))));
    }

    #[test]
    fn command_topics_and_payloads() {
        let mut robot = robot();
        robot.goto("reception").unwrap();
        robot.rotate(-90).unwrap();
        robot.stop().unwrap();

        assert_eq!(
            last_payload(&robot, "temi/00119/command/waypoint/goto"),
            json!({ "location": "reception" })
        );
        assert_eq!(
            last_payload(&robot, "temi/00119/command/move/turn_by"),
            json!({ "angle": -90 })
        );
        assert_eq!(last_payload(&robot, "temi/00119/command/move/stop"), json!({}));
    }

    #[test]
    fn joystick_is_clamped() {
        let mut robot = robot();
        robot.joystick(2.0, -0.5).unwrap();
        assert_eq!(
            last_payload(&robot, "temi/00119/command/move/joystick"),
            json!({ "x": 1.0, "y": -0.5 })
        );
    }

    #[test]
    fn empty_text_and_location_rejected() {
        let mut robot = robot();
        assert_eq!(robot.tts("   "), Err(RobotError::EmptyText));
        assert_eq!(robot.goto(""), Err(RobotError::EmptyLocation));
        assert!(robot.client().published.is_empty());
    }

    #[test]
    fn disconnected_robot_is_unavailable() {
        let mut robot = robot();
        robot.client.connected = false;
        assert_eq!(robot.tts("hi"), Err(RobotError::Unavailable));
        assert!(!robot.info().available);
    }

    #[test]
    fn status_folds_into_info() {
        let mut robot = robot();
        assert_eq!(robot.info().current_location, "Unknown");

        robot.client.queue_message(
            "temi/00119/status/info",
            br#"{"waypoint_list":["home base","lobby"]}"#.to_vec(),
        );
        robot.client.queue_message(
            "temi/00119/status/info",
            br#"{"current_location":"lobby"}"#.to_vec(),
        );
        robot
            .client
            .queue_message("temi/99999/status/info", br#"{"locations":["x"]}"#.to_vec());

        let info = robot.info();
        assert!(info.available);
        assert_eq!(info.locations, vec!["home base", "lobby"]);
        assert_eq!(info.current_location, "lobby");
    }

    #[test]
    fn malformed_status_is_ignored() {
        let mut robot = robot();
        robot
            .client
            .queue_message("temi/00119/status/info", b"not json".to_vec());
        let info = robot.info();
        assert!(info.locations.is_empty());
        assert!(robot.client().incoming.is_empty());
    }
}
