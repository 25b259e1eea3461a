//! Kiosk configuration: motor rig, web server and robot relay.
//!
//! Defaults reproduce the reference rig (two TB6600-style drivers on BCM
//! pins 14-26, a 1200 step base motor and a 600 step top motor at 8x
//! microstepping, 3 ms pulse phases).
//!
//! # Example
//!
//! ```rust
//! use cam_kiosk::config::{Config, RobotConfig, WebConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.motors.axes.len(), 2);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_robot(RobotConfig::default().with_host("192.168.1.100").with_serial("00119"))
//!     .with_web(WebConfig::default().with_port(3000));
//! assert!(config.validate().is_ok());
//! ```
//!
//! # TOML
//!
//! ```toml
//! [motors]
//! step_delay_us = 3000
//! idle_interval_ms = 10
//!
//! [[motors.axes]]
//! id = "m1"
//! direction_pin = 20
//! step_pin = 16
//! enable_pin = 21
//! steps_per_revolution = 1200
//! jog_steps = 50
//!
//! [robot]
//! enabled = true
//! host = "broker.local"
//! serial = "00119"
//! ```

use std::collections::HashSet;
use std::time::Duration;

use crate::axis::{self, Axis};
use crate::controller::MotorTiming;
use crate::error::ConfigError;
use crate::traits::PinId;

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Stepper rig configuration
    pub motors: MotorsConfig,
    /// Web server configuration
    pub web: WebConfig,
    /// Robot relay configuration
    pub robot: RobotConfig,
}

impl Config {
    /// Set motor configuration
    pub fn with_motors(mut self, motors: MotorsConfig) -> Self {
        self.motors = motors;
        self
    }

    /// Set web configuration
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.web = web;
        self
    }

    /// Set robot configuration
    pub fn with_robot(mut self, robot: RobotConfig) -> Self {
        self.robot = robot;
        self
    }

    /// Parse a configuration from TOML text. Missing sections use defaults.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    #[cfg(feature = "serde")]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!("Failed to read config file '{}': {}", path.display(), e);
            ConfigError::Io(e)
        })?;
        Self::from_toml_str(&contents).inspect_err(|e| {
            tracing::error!("Failed to load config '{}': {}", path.display(), e);
        })
    }

    /// Apply `MQTT_HOST`, `MQTT_PORT` and `TEMI_SERIAL` from the process
    /// environment.
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides through an arbitrary lookup.
    ///
    /// An unparsable `MQTT_PORT` is ignored with a warning.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("MQTT_HOST") {
            self.robot.host = host;
        }
        if let Some(port) = lookup("MQTT_PORT") {
            match port.trim().parse() {
                Ok(port) => self.robot.port = port,
                Err(_) => tracing::warn!("Ignoring invalid MQTT_PORT '{}'", port),
            }
        }
        if let Some(serial) = lookup("TEMI_SERIAL") {
            self.robot.serial = serial;
        }
        self
    }

    /// Check every invariant the motion core relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.motors.validate()
    }
}

// ============================================================================
// Motors Config
// ============================================================================

/// Stepper rig configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotorsConfig {
    /// Duration of each pulse phase (high hold, then low hold) in microseconds
    pub step_delay_us: u64,
    /// Control loop sleep when no axis moved, in milliseconds
    pub idle_interval_ms: u64,
    /// Motors in service order
    pub axes: Vec<AxisConfig>,
}

impl Default for MotorsConfig {
    fn default() -> Self {
        Self {
            step_delay_us: 3_000,
            idle_interval_ms: 10,
            axes: vec![AxisConfig::base(), AxisConfig::top()],
        }
    }
}

impl MotorsConfig {
    /// Set the pulse phase duration
    pub fn with_step_delay_us(mut self, us: u64) -> Self {
        self.step_delay_us = us;
        self
    }

    /// Set the idle interval
    pub fn with_idle_interval_ms(mut self, ms: u64) -> Self {
        self.idle_interval_ms = ms;
        self
    }

    /// Replace the axis list
    pub fn with_axes(mut self, axes: Vec<AxisConfig>) -> Self {
        self.axes = axes;
        self
    }

    /// Control loop timing derived from this config.
    pub fn timing(&self) -> MotorTiming {
        MotorTiming {
            step_delay: Duration::from_micros(self.step_delay_us),
            idle_interval: Duration::from_millis(self.idle_interval_ms),
        }
    }

    /// Look up an axis by id.
    pub fn axis(&self, id: &str) -> Option<&AxisConfig> {
        self.axes.iter().find(|a| a.id == id)
    }

    /// Build the immutable axis descriptions, validating first.
    pub fn build_axes(&self) -> Result<Vec<Axis>, ConfigError> {
        self.validate()?;
        self.axes.iter().map(AxisConfig::to_axis).collect()
    }

    /// Enable lines of every axis that has one.
    pub fn enable_pins(&self) -> Vec<PinId> {
        self.axes.iter().filter_map(|a| a.enable_pin).collect()
    }

    /// Every line used by the rig, including enable lines.
    pub fn all_pins(&self) -> Vec<PinId> {
        self.axes
            .iter()
            .flat_map(|a| [Some(a.direction_pin), Some(a.step_pin), a.enable_pin])
            .flatten()
            .collect()
    }

    /// Check axis count, id uniqueness, resolutions and pin sharing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.axes.is_empty() {
            return Err(ConfigError::Invalid("at least one axis is required".into()));
        }

        let mut ids = HashSet::new();
        for a in &self.axes {
            axis::axis_id(&a.id)?;
            if !ids.insert(a.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate axis id '{}'", a.id)));
            }
            if a.steps_per_revolution == 0 || a.microstepping == 0 {
                return Err(ConfigError::Invalid(format!(
                    "axis '{}': steps_per_revolution and microstepping must be non-zero",
                    a.id
                )));
            }
        }

        let mut pins = HashSet::new();
        for pin in self.all_pins() {
            if !pins.insert(pin) {
                return Err(ConfigError::Invalid(format!(
                    "pin {} is assigned more than once",
                    pin
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Axis Config
// ============================================================================

/// One stepper motor and its driver lines
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisConfig {
    /// Stable key (`m1`, `m2`)
    pub id: String,
    /// Direction line (BCM)
    pub direction_pin: PinId,
    /// Step line (BCM)
    pub step_pin: PinId,
    /// Driver enable line (BCM), driven high at startup
    #[cfg_attr(feature = "serde", serde(default))]
    pub enable_pin: Option<PinId>,
    /// Full steps per motor revolution (after gearing)
    pub steps_per_revolution: u32,
    /// Driver microstepping factor
    #[cfg_attr(feature = "serde", serde(default = "default_microstepping"))]
    pub microstepping: u32,
    /// Steps per jog button press
    #[cfg_attr(feature = "serde", serde(default = "default_jog_steps"))]
    pub jog_steps: u32,
}

#[cfg(feature = "serde")]
fn default_microstepping() -> u32 {
    8
}

#[cfg(feature = "serde")]
fn default_jog_steps() -> u32 {
    20
}

impl AxisConfig {
    /// Create an axis with 8x microstepping and no enable line.
    pub fn new(
        id: impl Into<String>,
        direction_pin: PinId,
        step_pin: PinId,
        steps_per_revolution: u32,
    ) -> Self {
        Self {
            id: id.into(),
            direction_pin,
            step_pin,
            enable_pin: None,
            steps_per_revolution,
            microstepping: 8,
            jog_steps: 20,
        }
    }

    /// Base (pan) motor of the reference rig.
    pub fn base() -> Self {
        Self::new("m1", 20, 16, 1200)
            .with_enable_pin(21)
            .with_jog_steps(50)
    }

    /// Top (tilt) motor of the reference rig.
    pub fn top() -> Self {
        Self::new("m2", 14, 15, 600)
            .with_enable_pin(26)
            .with_jog_steps(20)
    }

    /// Set the enable line
    pub fn with_enable_pin(mut self, pin: PinId) -> Self {
        self.enable_pin = Some(pin);
        self
    }

    /// Set the microstepping factor
    pub fn with_microstepping(mut self, factor: u32) -> Self {
        self.microstepping = factor;
        self
    }

    /// Set the jog size
    pub fn with_jog_steps(mut self, steps: u32) -> Self {
        self.jog_steps = steps;
        self
    }

    /// Degrees per (micro)step for this motor.
    pub fn degrees_per_step(&self) -> f64 {
        axis::degrees_per_step(self.steps_per_revolution, self.microstepping)
    }

    /// Immutable axis description.
    pub fn to_axis(&self) -> Result<Axis, ConfigError> {
        Axis::new(
            &self.id,
            self.direction_pin,
            self.step_pin,
            self.degrees_per_step(),
        )
        .map(|axis| axis.with_jog_steps(self.jog_steps))
    }
}

// ============================================================================
// Web Config
// ============================================================================

/// Web server configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WebConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            cors_permissive: true,
        }
    }
}

impl WebConfig {
    /// Set the bind interface
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set CORS mode
    pub fn with_cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }
}

// ============================================================================
// Robot Config
// ============================================================================

/// MQTT robot relay configuration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RobotConfig {
    /// Whether to try connecting to the robot at startup
    pub enabled: bool,
    /// Broker hostname or IP
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Robot serial number (topic namespace)
    pub serial: String,
    /// MQTT client ID
    pub client_id: String,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// How long to wait for the broker at startup, in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 1883,
            serial: String::new(),
            client_id: "cam-kiosk".to_string(),
            keep_alive_secs: 30,
            connect_timeout_ms: 3_000,
        }
    }
}

impl RobotConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the robot serial
    pub fn with_serial(mut self, serial: &str) -> Self {
        self.serial = serial.to_string();
        self
    }

    /// Enable or disable the robot relay
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether a robot serial has been set
    pub fn is_configured(&self) -> bool {
        !self.serial.trim().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
