//! Mobile-robot peer abstraction.
//!
//! The web layer only sees [`RobotLink`]; whether commands travel over MQTT
//! or nowhere at all is decided when the kiosk starts.

use crate::error::RobotError;

/// Snapshot of what the kiosk knows about the robot.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotInfo {
    /// Whether a robot is connected.
    pub available: bool,
    /// Saved waypoint names reported by the robot.
    pub locations: Vec<String>,
    /// Last reported location, `"Unknown"` if never reported.
    pub current_location: String,
}

impl RobotInfo {
    /// Info reported when no robot is connected.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            locations: Vec::new(),
            current_location: "Unknown".to_string(),
        }
    }
}

/// Command surface of the mobile robot.
///
/// Object-safe so the web layer can hold a `Box<dyn RobotLink>`.
pub trait RobotLink: Send {
    /// Current robot status. Implementations may drain pending status
    /// messages before answering.
    fn info(&mut self) -> RobotInfo;

    /// Speak `text` aloud.
    fn tts(&mut self, text: &str) -> Result<(), RobotError>;

    /// Drive to a saved location.
    fn goto(&mut self, location: &str) -> Result<(), RobotError>;

    /// Rotate in place by `degrees` (positive = counter-clockwise).
    fn rotate(&mut self, degrees: i32) -> Result<(), RobotError>;

    /// Continuous joystick input, both axes in `[-1, 1]`.
    fn joystick(&mut self, x: f32, y: f32) -> Result<(), RobotError>;

    /// Stop any robot movement.
    fn stop(&mut self) -> Result<(), RobotError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_info() {
        let info = RobotInfo::unavailable();
        assert!(!info.available);
        assert!(info.locations.is_empty());
        assert_eq!(info.current_location, "Unknown");
    }
}
