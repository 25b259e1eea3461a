//! Request bodies accepted by the kiosk HTTP API.
//!
//! # Example
//!
//! ```
//! use cam_kiosk::messages::{MoveRequest, SetAngleRequest};
//! use cam_kiosk::Direction;
//!
//! let json = r#"{"motor": "m1", "direction": "forward", "steps": 100}"#;
//! let req: MoveRequest = serde_json::from_str(json).unwrap();
//! assert_eq!(req.direction, Direction::Forward);
//!
//! let req: SetAngleRequest = serde_json::from_str(r#"{"motor": "m2", "angle": -12.5}"#).unwrap();
//! assert_eq!(req.angle, -12.5);
//! ```

use crate::Direction;
use serde::{Deserialize, Serialize};

// ============================================================================
// Motion Requests
// ============================================================================

/// Relative move of one axis.
///
/// ```json
/// {"motor": "m1", "direction": "reverse", "steps": 40}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Axis id
    pub motor: String,
    /// `"forward"` or `"reverse"`
    pub direction: Direction,
    /// Step magnitude
    pub steps: u32,
}

/// Absolute angle of one axis.
///
/// ```json
/// {"motor": "m1", "angle": 45.0}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetAngleRequest {
    /// Axis id
    pub motor: String,
    /// Target angle in degrees
    pub angle: f64,
}

// ============================================================================
// Robot Requests
// ============================================================================

/// Text for the robot to speak.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TtsRequest {
    /// Utterance; empty is rejected
    #[serde(default)]
    pub text: String,
}

/// Saved location for the robot to drive to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GotoRequest {
    /// Location name; empty is rejected
    #[serde(default)]
    pub location: String,
}

/// In-place rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RotateRequest {
    /// Degrees, positive = counter-clockwise
    #[serde(default)]
    pub angle: i32,
}

/// Joystick input. Values are clamped to `[-1, 1]` before use.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct JoystickRequest {
    /// Turn axis
    #[serde(default)]
    pub x: f32,
    /// Drive axis
    #[serde(default)]
    pub y: f32,
}

impl JoystickRequest {
    /// Both axes clamped to `[-1, 1]`. NaN becomes `0`.
    pub fn clamped(&self) -> (f32, f32) {
        let clamp = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) };
        (clamp(self.x), clamp(self.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_request_rejects_negative_steps() {
        let json = r#"{"motor": "m1", "direction": "forward", "steps": -5}"#;
        assert!(serde_json::from_str::<MoveRequest>(json).is_err());
    }

    #[test]
    fn move_request_rejects_unknown_direction() {
        let json = r#"{"motor": "m1", "direction": "sideways", "steps": 5}"#;
        assert!(serde_json::from_str::<MoveRequest>(json).is_err());
    }

    #[test]
    fn robot_requests_default_missing_fields() {
        let tts: TtsRequest = serde_json::from_str("{}").unwrap();
        assert!(tts.text.is_empty());
        let rotate: RotateRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(rotate.angle, 0);
    }

    #[test]
    fn joystick_clamps() {
        let req = JoystickRequest { x: 3.0, y: -1.5 };
        assert_eq!(req.clamped(), (1.0, -1.0));
        let req = JoystickRequest { x: f32::NAN, y: 0.25 };
        assert_eq!(req.clamped(), (0.0, 0.25));
    }
}
