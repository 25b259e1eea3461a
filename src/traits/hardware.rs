//! Hardware abstraction for step/direction stepper drivers.
//!
//! This module defines the single hardware seam of the motion core: a
//! [`PulseDriver`] that sets a direction level and emits one step pulse.
//!
//! # Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`PulseDriver`] | Direction level + one timed step pulse |
//! | [`Direction`] | Forward/reverse rotation |
//! | [`PinId`] | Opaque output line identifier (BCM numbering on the Pi) |
//!
//! # Implementation
//!
//! For testing and desktop development, use [`crate::hal::SimulatedPulseDriver`]
//! or [`crate::hal::MockPulseDriver`]. On a Raspberry Pi, use
//! [`crate::hal::GpioPulseDriver`] over sysfs lines (requires `gpio` feature).
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use cam_kiosk::traits::{Direction, PulseDriver};
//! use cam_kiosk::hal::SimulatedPulseDriver;
//!
//! let mut driver = SimulatedPulseDriver::new(Duration::ZERO);
//! driver.set_direction(20, Direction::Forward).unwrap();
//! driver.pulse_step(16).unwrap();
//! ```

use crate::error::DriverError;

/// Opaque identifier of one output line.
///
/// The motion core never interprets it; it is only handed back to the driver.
pub type PinId = u8;

/// Direction of rotation for one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Positive step count (direction line high).
    Forward,
    /// Negative step count (direction line low).
    Reverse,
}

impl Direction {
    /// Returns the direction as a lowercase string.
    ///
    /// # Examples
    ///
    /// ```
    /// use cam_kiosk::Direction;
    ///
    /// assert_eq!(Direction::Forward.as_str(), "forward");
    /// assert_eq!(Direction::Reverse.as_str(), "reverse");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }

    /// Signed unit step for this direction.
    #[inline]
    pub const fn sign(&self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }

    /// Direction needed to drain a signed pending delta.
    ///
    /// Returns `None` for zero.
    #[inline]
    pub fn of_delta(delta: i64) -> Option<Self> {
        match delta.signum() {
            1 => Some(Direction::Forward),
            -1 => Some(Direction::Reverse),
            _ => None,
        }
    }

    /// Parse direction from text input.
    ///
    /// Supports:
    /// - Full names: `"forward"`, `"reverse"`, `"backward"`
    /// - Abbreviations: `"fwd"`, `"rev"`
    /// - Numeric: `"1"` (forward), `"-1"` (reverse)
    ///
    /// Input is trimmed and case-insensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use cam_kiosk::Direction;
    ///
    /// assert_eq!(Direction::from_text("forward"), Some(Direction::Forward));
    /// assert_eq!(Direction::from_text("  REV "), Some(Direction::Reverse));
    /// assert_eq!(Direction::from_text("-1"), Some(Direction::Reverse));
    /// assert_eq!(Direction::from_text("up"), None);
    /// ```
    pub fn from_text(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "fwd" | "1" => Some(Direction::Forward),
            "reverse" | "rev" | "backward" | "-1" => Some(Direction::Reverse),
            _ => None,
        }
    }
}

/// Step/direction driver abstraction.
///
/// One driver is shared by every axis of a controller; it is stateless
/// between calls apart from whatever line handles it owns.
///
/// # Timing Contract
///
/// [`pulse_step`](Self::pulse_step) blocks for the full pulse: the step line
/// is held high for the configured delay, then low for the same delay.
/// Implementations without hardware must still block for twice the delay so
/// callers observe identical timing.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use cam_kiosk::traits::{Direction, PinId, PulseDriver};
/// use cam_kiosk::DriverError;
///
/// struct MyDriver { /* line handles */ }
///
/// impl PulseDriver for MyDriver {
///     fn set_direction(&mut self, pin: PinId, dir: Direction) -> Result<(), DriverError> {
///         // Drive the direction line...
///         Ok(())
///     }
///
///     fn pulse_step(&mut self, pin: PinId) -> Result<(), DriverError> {
///         // High, wait, low, wait...
///         Ok(())
///     }
/// }
/// ```
pub trait PulseDriver: Send {
    /// Drive the direction line: high for forward, low for reverse.
    fn set_direction(&mut self, pin: PinId, direction: Direction) -> Result<(), DriverError>;

    /// Emit one step pulse on the step line and block for its full width.
    fn pulse_step(&mut self, pin: PinId) -> Result<(), DriverError>;

    /// Release hardware resources (unexport lines, disable drivers).
    ///
    /// Called once when the owning controller stops.
    fn release(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    /// Short human-readable name used in logs.
    fn name(&self) -> &'static str {
        "pulse-driver"
    }
}

impl<D: PulseDriver + ?Sized> PulseDriver for Box<D> {
    fn set_direction(&mut self, pin: PinId, direction: Direction) -> Result<(), DriverError> {
        (**self).set_direction(pin, direction)
    }

    fn pulse_step(&mut self, pin: PinId) -> Result<(), DriverError> {
        (**self).pulse_step(pin)
    }

    fn release(&mut self) -> Result<(), DriverError> {
        (**self).release()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Direction Tests
    // =========================================================================

    #[test]
    fn direction_sign() {
        assert_eq!(Direction::Forward.sign(), 1);
        assert_eq!(Direction::Reverse.sign(), -1);
    }

    #[test]
    fn direction_of_delta() {
        assert_eq!(Direction::of_delta(40), Some(Direction::Forward));
        assert_eq!(Direction::of_delta(-3), Some(Direction::Reverse));
        assert_eq!(Direction::of_delta(0), None);
    }

    #[test]
    fn direction_from_text_full_names() {
        assert_eq!(Direction::from_text("forward"), Some(Direction::Forward));
        assert_eq!(Direction::from_text("reverse"), Some(Direction::Reverse));
        assert_eq!(Direction::from_text("backward"), Some(Direction::Reverse));
    }

    #[test]
    fn direction_from_text_abbreviations() {
        assert_eq!(Direction::from_text("fwd"), Some(Direction::Forward));
        assert_eq!(Direction::from_text("rev"), Some(Direction::Reverse));
    }

    #[test]
    fn direction_from_text_case_and_whitespace() {
        assert_eq!(Direction::from_text("FORWARD"), Some(Direction::Forward));
        assert_eq!(Direction::from_text("\tRev\n"), Some(Direction::Reverse));
        assert_eq!(Direction::from_text(" 1 "), Some(Direction::Forward));
    }

    #[test]
    fn direction_from_text_invalid() {
        assert_eq!(Direction::from_text(""), None);
        assert_eq!(Direction::from_text("stopped"), None);
        assert_eq!(Direction::from_text("0"), None);
        assert_eq!(Direction::from_text("backwards"), None);
    }

    // =========================================================================
    // PulseDriver Default Methods Tests
    // =========================================================================

    struct CountingDriver {
        pulses: usize,
    }

    impl PulseDriver for CountingDriver {
        fn set_direction(&mut self, _pin: PinId, _dir: Direction) -> Result<(), DriverError> {
            Ok(())
        }

        fn pulse_step(&mut self, _pin: PinId) -> Result<(), DriverError> {
            self.pulses += 1;
            Ok(())
        }
    }

    #[test]
    fn pulse_driver_default_release_is_ok() {
        let mut driver = CountingDriver { pulses: 0 };
        assert!(driver.release().is_ok());
        assert_eq!(driver.name(), "pulse-driver");
    }

    #[test]
    fn boxed_driver_forwards_calls() {
        let mut driver: Box<CountingDriver> = Box::new(CountingDriver { pulses: 0 });
        driver.pulse_step(16).unwrap();
        driver.pulse_step(16).unwrap();
        assert_eq!(driver.pulses, 2);
    }
}
