//! Step/direction driver over `embedded-hal` output pins.
//!
//! Works with any [`OutputPin`]: sysfs lines on a Raspberry Pi (see
//! [`super::sysfs`]), a port expander, or [`super::MockPin`] in tests.
//!
//! # Wiring (TB6600-style drivers)
//!
//! - DIR  → high = forward, low = reverse
//! - STEP → one rising edge per (micro)step
//! - EN   → held high while the controller runs

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::thread;
use std::time::Duration;

use embedded_hal::digital::OutputPin;

use crate::error::DriverError;
use crate::traits::{Direction, PinId, PulseDriver};

/// Pulse driver over a set of `embedded-hal` output lines.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use cam_kiosk::hal::{GpioPulseDriver, MockPin};
/// use cam_kiosk::traits::{Direction, PulseDriver};
///
/// let lines = vec![(20, MockPin::new()), (16, MockPin::new()), (21, MockPin::new())];
/// let mut driver = GpioPulseDriver::new(lines, &[21], Duration::ZERO).unwrap();
///
/// driver.set_direction(20, Direction::Forward).unwrap();
/// driver.pulse_step(16).unwrap();
///
/// assert!(driver.line(21).unwrap().is_high());
/// assert_eq!(driver.line(16).unwrap().rising_edges(), 1);
/// ```
pub struct GpioPulseDriver<P> {
    lines: BTreeMap<PinId, P>,
    enable_pins: Vec<PinId>,
    step_delay: Duration,
}

impl<P> GpioPulseDriver<P>
where
    P: OutputPin + Send,
    P::Error: Debug,
{
    /// Take ownership of the output lines and enable the drivers.
    ///
    /// Every line starts low, then each line in `enable_pins` is driven
    /// high.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::UnknownPin`] if an enable pin has no line, or
    /// [`DriverError::Line`] if a line cannot be driven.
    pub fn new(
        lines: impl IntoIterator<Item = (PinId, P)>,
        enable_pins: &[PinId],
        step_delay: Duration,
    ) -> Result<Self, DriverError> {
        let mut driver = Self {
            lines: lines.into_iter().collect(),
            enable_pins: enable_pins.to_vec(),
            step_delay,
        };

        let pins: Vec<PinId> = driver.lines.keys().copied().collect();
        for pin in pins {
            driver.write(pin, false)?;
        }
        for pin in enable_pins {
            driver.write(*pin, true)?;
        }

        tracing::info!(
            "GPIO pulse driver ready: {} lines, {} enabled",
            driver.lines.len(),
            enable_pins.len()
        );
        Ok(driver)
    }

    /// Borrow the line registered for `pin`.
    pub fn line(&self, pin: PinId) -> Option<&P> {
        self.lines.get(&pin)
    }

    fn write(&mut self, pin: PinId, high: bool) -> Result<(), DriverError> {
        let line = self
            .lines
            .get_mut(&pin)
            .ok_or(DriverError::UnknownPin(pin))?;
        let result = if high { line.set_high() } else { line.set_low() };
        result.map_err(|e| DriverError::Line {
            pin,
            message: format!("{:?}", e),
        })
    }
}

impl<P> PulseDriver for GpioPulseDriver<P>
where
    P: OutputPin + Send,
    P::Error: Debug,
{
    fn set_direction(&mut self, pin: PinId, direction: Direction) -> Result<(), DriverError> {
        self.write(pin, direction == Direction::Forward)
    }

    fn pulse_step(&mut self, pin: PinId) -> Result<(), DriverError> {
        self.write(pin, true)?;
        thread::sleep(self.step_delay);
        self.write(pin, false)?;
        thread::sleep(self.step_delay);
        Ok(())
    }

    /// Disables the drivers, then pulls every line low.
    fn release(&mut self) -> Result<(), DriverError> {
        let mut first_error = None;
        let enable = self.enable_pins.clone();
        let others: Vec<PinId> = self
            .lines
            .keys()
            .copied()
            .filter(|p| !enable.contains(p))
            .collect();

        for pin in enable.into_iter().chain(others) {
            if let Err(e) = self.write(pin, false) {
                tracing::warn!("Failed to release {}", e);
                first_error.get_or_insert(e);
            }
        }
        tracing::info!("GPIO pulse driver released");
        first_error.map_or(Ok(()), Err)
    }

    fn name(&self) -> &'static str {
        "gpio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockPin;

    fn rig() -> GpioPulseDriver<MockPin> {
        let lines = [20, 16, 21].map(|p| (p, MockPin::new()));
        GpioPulseDriver::new(lines, &[21], Duration::ZERO).unwrap()
    }

    #[test]
    fn enable_lines_driven_high_at_start() {
        let driver = rig();
        assert!(driver.line(21).unwrap().is_high());
        assert!(!driver.line(20).unwrap().is_high());
        assert!(!driver.line(16).unwrap().is_high());
    }

    #[test]
    fn direction_levels() {
        let mut driver = rig();
        driver.set_direction(20, Direction::Forward).unwrap();
        assert!(driver.line(20).unwrap().is_high());
        driver.set_direction(20, Direction::Reverse).unwrap();
        assert!(!driver.line(20).unwrap().is_high());
    }

    #[test]
    fn pulse_is_high_then_low() {
        let mut driver = rig();
        driver.pulse_step(16).unwrap();
        let step = driver.line(16).unwrap();
        // initial low, then high, low
        assert_eq!(step.levels, vec![false, true, false]);
        assert_eq!(step.rising_edges(), 1);
    }

    #[test]
    fn unknown_pin_is_an_error() {
        let mut driver = rig();
        assert!(matches!(
            driver.pulse_step(99),
            Err(DriverError::UnknownPin(99))
        ));
    }

    #[test]
    fn unknown_enable_pin_fails_construction() {
        let lines = [(20, MockPin::new())];
        assert!(GpioPulseDriver::new(lines, &[21], Duration::ZERO).is_err());
    }

    #[test]
    fn failing_line_reports_pin() {
        let mut bad = MockPin::new();
        let lines = [(20, MockPin::new()), (16, MockPin::new())];
        let mut driver = GpioPulseDriver::new(lines, &[], Duration::ZERO).unwrap();
        bad.fail = true;
        driver.lines.insert(16, bad);
        match driver.pulse_step(16) {
            Err(DriverError::Line { pin, .. }) => assert_eq!(pin, 16),
            other => panic!("expected line error, got {:?}", other),
        }
    }

    #[test]
    fn release_pulls_everything_low() {
        let mut driver = rig();
        driver.set_direction(20, Direction::Forward).unwrap();
        driver.release().unwrap();
        for pin in [20, 16, 21] {
            assert!(!driver.line(pin).unwrap().is_high());
        }
    }
}
