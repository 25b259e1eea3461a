//! Error types for the motion core, configuration, and robot relay.

use thiserror::Error;

use crate::traits::PinId;

/// Errors returned by the [`MotorController`](crate::MotorController) command API.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The axis identifier is not one of the configured axes.
    #[error("unknown axis '{0}'")]
    UnknownAxis(String),

    /// The requested angle is NaN or infinite.
    #[error("invalid angle {0}: must be a finite number of degrees")]
    InvalidAngle(f64),

    /// The background control thread could not be started.
    #[error("failed to spawn control thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The axis configuration was rejected at construction.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised by a [`PulseDriver`](crate::traits::PulseDriver).
#[derive(Debug, Error)]
pub enum DriverError {
    /// No output line is registered for the pin.
    #[error("no output line for pin {0}")]
    UnknownPin(PinId),

    /// Writing a level to an output line failed.
    #[error("pin {pin}: {message}")]
    Line {
        /// Pin the write was issued on.
        pin: PinId,
        /// Driver-specific failure description.
        message: String,
    },
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`Config`](crate::Config).
    #[cfg(feature = "serde")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configuration parsed but violates an invariant.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from the mobile-robot relay.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RobotError {
    /// No robot is connected.
    #[error("Robot not available")]
    Unavailable,

    /// A speech request carried no text.
    #[error("No text provided")]
    EmptyText,

    /// A navigation request carried no location.
    #[error("No location provided")]
    EmptyLocation,

    /// The broker connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Publishing a command to the broker failed.
    #[error("publish failed: {0}")]
    Publish(String),
}
