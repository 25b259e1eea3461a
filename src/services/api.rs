//! API response types for the kiosk HTTP interface.

use serde::{Deserialize, Serialize};

use crate::controller::{AngleMap, ControllerSnapshot};

// Re-export shared request types from messages module
pub use crate::messages::{
    GotoRequest, JoystickRequest, MoveRequest, RotateRequest, SetAngleRequest, TtsRequest,
};

// ============================================================================
// Response Types
// ============================================================================

/// API response wrapper for consistent JSON structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful
    pub success: bool,
    /// Response data (present when success=true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present when success=false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Current and target angles of every axis
///
/// ```json
/// {"current": {"m1": 3.75, "m2": 0.0}, "target": {"m1": 3.75, "m2": 0.0}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnglesResponse {
    /// Position of each axis in degrees
    pub current: AngleMap,
    /// Last requested target of each axis in degrees
    pub target: AngleMap,
}

impl From<&ControllerSnapshot> for AnglesResponse {
    fn from(snapshot: &ControllerSnapshot) -> Self {
        Self {
            current: snapshot.positions(),
            target: snapshot.targets(),
        }
    }
}

/// Command result response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Whether the command was accepted
    pub accepted: bool,
    /// Result details
    pub result: String,
    /// Steps queued, for motion commands that know it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<i64>,
}

impl CommandResponse {
    /// Create an accepted response
    pub fn accepted(result: impl Into<String>) -> Self {
        Self {
            accepted: true,
            result: result.into(),
            steps: None,
        }
    }

    /// Attach a step count
    pub fn with_steps(mut self, steps: i64) -> Self {
        self.steps = Some(steps);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_ok_skips_error() {
        let json = serde_json::to_string(&ApiResponse::ok(1)).unwrap();
        assert_eq!(json, r#"{"success":true,"data":1}"#);
    }

    #[test]
    fn api_response_err_skips_data() {
        let json = serde_json::to_string(&ApiResponse::<()>::err("Robot not available")).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"Robot not available"}"#);
    }

    #[test]
    fn command_response_steps() {
        let resp = CommandResponse::accepted("target_set").with_steps(100);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""steps":100"#));
        let json = serde_json::to_string(&CommandResponse::accepted("tared")).unwrap();
        assert!(!json.contains("steps"));
    }
}
