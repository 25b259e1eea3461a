//! Network services for the HTTP API and the MQTT robot relay.
//!
//! This module provides optional network connectivity for the kiosk:
//! - `web` feature: Axum-based HTTP API server with JSON endpoints
//! - `mqtt` feature: Temi robot relay over an MQTT broker
//!
//! The web layer shares one [`MotorController`](crate::MotorController)
//! through [`KioskState`], together with an optional boxed
//! [`RobotLink`](crate::traits::RobotLink):
//!
//! ```ignore
//! use std::sync::Arc;
//! use cam_kiosk::services::{KioskState, RumqttLink, TemiRobot};
//!
//! let controller = Arc::new(MotorController::from_config(&config.motors, driver)?);
//! let mut state = KioskState::new(Arc::clone(&controller));
//!
//! if let Ok(link) = RumqttLink::connect(&config.robot, timeout) {
//!     state = state.with_robot(Box::new(TemiRobot::new(link, &config.robot.serial)?));
//! }
//!
//! let router = build_router(Arc::new(state), &web_config);
//! ```

#[cfg(feature = "web")]
pub mod api;

#[cfg(feature = "web")]
pub mod web;

#[cfg(feature = "mqtt")]
pub mod robot;

#[cfg(feature = "mqtt")]
pub mod rumqtt;

// Re-exports
#[cfg(feature = "web")]
pub use api::*;

#[cfg(feature = "web")]
pub use web::*;

#[cfg(feature = "mqtt")]
pub use robot::TemiRobot;

#[cfg(feature = "mqtt")]
pub use rumqtt::RumqttLink;
