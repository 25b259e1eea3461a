//! Per-motor configuration, step counters and angle/step conversion.
//!
//! An [`Axis`] is the immutable half of a motor (pins and resolution);
//! [`AxisState`] is the mutable half, which only ever lives inside the
//! controller's locked state bundle.
//!
//! # Example
//!
//! ```rust
//! use cam_kiosk::axis::{degrees_per_step, Axis};
//!
//! // 1200 full steps per revolution at 8x microstepping
//! let dps = degrees_per_step(1200, 8);
//! assert!((dps - 0.0375).abs() < 1e-12);
//!
//! let axis = Axis::new("m1", 20, 16, dps).unwrap();
//! assert_eq!(axis.angle_to_steps(3.75), 100);
//! assert!((axis.steps_to_angle(100) - 3.75).abs() < 1e-9);
//! ```

use heapless::String as HString;

use crate::error::ConfigError;
use crate::traits::{Direction, PinId};

/// Maximum length of an axis identifier.
pub const MAX_AXIS_ID: usize = 8;

/// Stable axis key such as `m1` or `m2`.
pub type AxisId = HString<MAX_AXIS_ID>;

/// Angular resolution of one (micro)step in degrees.
///
/// `360 / (steps_per_revolution × microstepping)`.
pub fn degrees_per_step(steps_per_revolution: u32, microstepping: u32) -> f64 {
    360.0 / (f64::from(steps_per_revolution) * f64::from(microstepping))
}

/// Build an [`AxisId`], failing if `id` is empty or too long.
pub fn axis_id(id: &str) -> Result<AxisId, ConfigError> {
    if id.is_empty() {
        return Err(ConfigError::Invalid("axis id must not be empty".into()));
    }
    let mut key = AxisId::new();
    key.push_str(id).map_err(|_| {
        ConfigError::Invalid(format!(
            "axis id '{}' is longer than {} bytes",
            id, MAX_AXIS_ID
        ))
    })?;
    Ok(key)
}

/// Immutable description of one stepper motor.
#[derive(Clone, Debug, PartialEq)]
pub struct Axis {
    id: AxisId,
    direction_pin: PinId,
    step_pin: PinId,
    degrees_per_step: f64,
    jog_steps: u32,
}

impl Axis {
    /// Jog size used when none is configured.
    pub const DEFAULT_JOG_STEPS: u32 = 20;

    /// Create an axis description.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the id is unusable or
    /// `degrees_per_step` is not a positive finite number.
    pub fn new(
        id: &str,
        direction_pin: PinId,
        step_pin: PinId,
        degrees_per_step: f64,
    ) -> Result<Self, ConfigError> {
        if !(degrees_per_step.is_finite() && degrees_per_step > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "axis '{}': degrees per step must be positive, got {}",
                id, degrees_per_step
            )));
        }
        Ok(Self {
            id: axis_id(id)?,
            direction_pin,
            step_pin,
            degrees_per_step,
            jog_steps: Self::DEFAULT_JOG_STEPS,
        })
    }

    /// Set the number of steps one jog command queues.
    pub fn with_jog_steps(mut self, steps: u32) -> Self {
        self.jog_steps = steps;
        self
    }

    /// Axis key.
    #[inline]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Direction line identifier.
    #[inline]
    pub fn direction_pin(&self) -> PinId {
        self.direction_pin
    }

    /// Step line identifier.
    #[inline]
    pub fn step_pin(&self) -> PinId {
        self.step_pin
    }

    /// Degrees moved by one step. Always positive.
    #[inline]
    pub fn degrees_per_step(&self) -> f64 {
        self.degrees_per_step
    }

    /// Steps queued by one jog command.
    #[inline]
    pub fn jog_steps(&self) -> u32 {
        self.jog_steps
    }

    /// Nearest step count for an angle.
    ///
    /// Ties round to even, so `0.5` steps rounds to `0` and `1.5` to `2`.
    /// Angles beyond the `i64` range saturate.
    pub fn angle_to_steps(&self, degrees: f64) -> i64 {
        (degrees / self.degrees_per_step).round_ties_even() as i64
    }

    /// Angle in degrees covered by `steps`.
    pub fn steps_to_angle(&self, steps: i64) -> f64 {
        steps as f64 * self.degrees_per_step
    }
}

/// Motion state of one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AxisStatus {
    /// No steps pending.
    Idle,
    /// Steps pending; the control loop emits one per tick.
    Moving,
}

/// Mutable step counters of one axis.
///
/// Only the controller touches these, always under its lock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AxisState {
    /// Steps still to emit (positive = forward).
    pub pending_steps: i64,
    /// Net steps emitted since the last tare.
    pub position_steps: i64,
    /// Last absolute target requested by angle.
    pub target_steps: i64,
}

impl AxisState {
    /// Current state-machine status.
    #[inline]
    pub fn status(&self) -> AxisStatus {
        if self.pending_steps == 0 {
            AxisStatus::Idle
        } else {
            AxisStatus::Moving
        }
    }

    /// Add a relative move to whatever is pending.
    pub fn queue(&mut self, direction: Direction, steps: u32) {
        let delta = direction.sign() * i64::from(steps);
        self.pending_steps = self.pending_steps.saturating_add(delta);
    }

    /// Replace pending motion with whatever reaches `target` from here.
    pub fn retarget(&mut self, target: i64) {
        self.target_steps = target;
        self.pending_steps = target.saturating_sub(self.position_steps);
    }

    /// Drop all pending motion.
    pub fn cancel(&mut self) {
        self.pending_steps = 0;
    }

    /// Make the current pose the zero.
    pub fn tare(&mut self) {
        *self = Self::default();
    }

    /// Record one emitted step in `direction`.
    pub fn record_step(&mut self, direction: Direction) {
        let sign = direction.sign();
        self.pending_steps -= sign;
        self.position_steps += sign;
    }
}
