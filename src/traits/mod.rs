//! Trait definitions for hardware abstraction and networking.
//!
//! This module defines the core abstractions that allow cam-kiosk to:
//! - Drive real step/direction lines or a timing-equivalent simulation
//! - Talk to a mobile robot over any MQTT transport
//!
//! # Submodules
//!
//! - `hardware`: Pulse driver and direction types
//! - `network`: MQTT client trait
//! - `robot`: Robot command surface used by the web layer
//!
//! # Hardware Abstraction
//!
//! - [`PulseDriver`]: Direction level + one timed step pulse
//!
//! # Robot Abstraction
//!
//! - [`MqttClient`]: Sync-first pub/sub transport
//! - [`RobotLink`]: Speech, navigation and joystick commands

pub mod hardware;
pub mod network;
pub mod robot;

pub use hardware::*;
pub use network::*;
pub use robot::*;
