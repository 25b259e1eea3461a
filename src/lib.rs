//! # cam-kiosk
//!
//! Raspberry Pi camera kiosk: a two-axis stepper pan/tilt rig driven from a
//! web page, with an optional Temi robot reached over MQTT.
//!
//! ## Features
//!
//! - **Motion core**: queued relative moves, absolute angle targets, tare,
//!   return-to-zero and emergency stop, drained by one background thread
//! - **Hardware abstraction**: a single [`PulseDriver`] seam with GPIO,
//!   simulated and mock implementations
//! - **Web API**: axum JSON endpoints and a kiosk page (`web` feature)
//! - **Robot relay**: Temi speech, navigation and joystick commands over MQTT
//!   (`mqtt` feature)
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware, transport and robot abstractions
//! - `axis` - Per-motor configuration, step counters, angle conversion
//! - `controller` - Motion controller and its control loop
//! - `hal` - Concrete drivers (mock and simulated for testing, GPIO for the Pi)
//! - `config` - TOML configuration with environment overrides
//! - `services` - HTTP API and MQTT robot relay
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use cam_kiosk::{Direction, MotorController};
//! use cam_kiosk::config::MotorsConfig;
//! use cam_kiosk::hal::SimulatedPulseDriver;
//!
//! let motors = MotorsConfig::default().with_step_delay_us(0).with_idle_interval_ms(1);
//! let driver = SimulatedPulseDriver::new(Duration::ZERO);
//! let controller = MotorController::from_config(&motors, driver).unwrap();
//!
//! // Absolute target on the base motor: 3.75 deg = 100 steps
//! controller.set_target_angle("m1", 3.75).unwrap();
//! // Relative jog on the top motor
//! controller.move_motor("m2", Direction::Reverse, 20).unwrap();
//!
//! assert!(controller.wait_idle(Duration::from_secs(5)));
//! let angles = controller.get_positions();
//! assert!((angles["m1"] - 3.75).abs() < 1e-9);
//! assert!((angles["m2"] + 1.5).abs() < 1e-9);
//! ```

#![warn(missing_docs)]

/// Per-axis configuration, counters and angle/step conversion.
pub mod axis;
/// Motion controller with its background control loop.
pub mod controller;
/// Error types.
pub mod error;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Core traits for hardware, transport and robot abstraction.
pub mod traits;

/// Configuration for the rig, the web server and the robot relay.
pub mod config;

/// Request types for the HTTP API (serde-based).
#[cfg(feature = "serde")]
pub mod messages;

/// Network services for HTTP API and MQTT (feature-gated).
#[cfg(any(feature = "web", feature = "mqtt"))]
pub mod services;

// Re-exports for convenience
pub use axis::{Axis, AxisId, AxisState, AxisStatus};
pub use controller::{AngleMap, AxisSnapshot, ControllerSnapshot, MotorController, MotorTiming};
pub use error::{ConfigError, ControlError, DriverError, RobotError};
pub use traits::{
    // Hardware
    Direction,
    // Network
    MqttClient,
    MqttMessage,
    PinId,
    PulseDriver,
    // Robot
    RobotInfo,
    RobotLink,
};

// Config re-exports
pub use config::{AxisConfig, Config, MotorsConfig, RobotConfig, WebConfig};

// Message re-exports (for HTTP API)
#[cfg(feature = "serde")]
pub use messages::{
    GotoRequest, JoystickRequest, MoveRequest, RotateRequest, SetAngleRequest, TtsRequest,
};
