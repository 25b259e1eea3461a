//! Hardware-free pulse driver.

use std::thread;
use std::time::Duration;

use crate::error::DriverError;
use crate::traits::{Direction, PinId, PulseDriver};

/// Pulse driver that touches no hardware but keeps real pulse timing.
///
/// `pulse_step` sleeps for twice the step delay, so a simulated rig moves
/// exactly as fast as a wired one. Used on development machines and as the
/// fallback when GPIO lines cannot be opened.
#[derive(Debug, Clone)]
pub struct SimulatedPulseDriver {
    step_delay: Duration,
    pulses: u64,
}

impl SimulatedPulseDriver {
    /// Create a simulated driver with the given pulse phase duration.
    pub fn new(step_delay: Duration) -> Self {
        tracing::info!(
            "Running in simulation mode (step delay {:?})",
            step_delay
        );
        Self {
            step_delay,
            pulses: 0,
        }
    }

    /// Number of pulses emitted since creation.
    #[inline]
    pub fn pulse_count(&self) -> u64 {
        self.pulses
    }
}

impl PulseDriver for SimulatedPulseDriver {
    fn set_direction(&mut self, _pin: PinId, _direction: Direction) -> Result<(), DriverError> {
        Ok(())
    }

    fn pulse_step(&mut self, _pin: PinId) -> Result<(), DriverError> {
        if !self.step_delay.is_zero() {
            thread::sleep(self.step_delay * 2);
        }
        self.pulses += 1;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn pulse_blocks_for_two_phases() {
        let mut driver = SimulatedPulseDriver::new(Duration::from_millis(2));
        let start = Instant::now();
        driver.pulse_step(16).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(4));
        assert_eq!(driver.pulse_count(), 1);
    }

    #[test]
    fn direction_is_accepted() {
        let mut driver = SimulatedPulseDriver::new(Duration::ZERO);
        assert!(driver.set_direction(20, Direction::Reverse).is_ok());
        assert_eq!(driver.name(), "simulated");
    }
}
