//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`].
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `simulated`: Timing-accurate driver without hardware
//! - `gpio`: Step/direction driver over any `embedded-hal` output pin
//! - `sysfs`: Raspberry Pi sysfs lines (requires `gpio` feature)

pub mod gpio;
pub mod mock;
pub mod simulated;

#[cfg(feature = "gpio")]
pub mod sysfs;

pub use gpio::GpioPulseDriver;
pub use mock::*;
pub use simulated::SimulatedPulseDriver;

#[cfg(feature = "gpio")]
pub use sysfs::{open_sysfs_driver, SysfsLine};

use std::time::Duration;

use crate::axis::Axis;
use crate::traits::{PinId, PulseDriver};

/// Pick the pulse driver for this run.
///
/// With `simulate` set, or without the `gpio` feature, returns a
/// [`SimulatedPulseDriver`]. Otherwise opens the sysfs lines and falls back
/// to simulation, with a warning, if that fails.
pub fn select_driver(
    axes: &[Axis],
    enable_pins: &[PinId],
    step_delay: Duration,
    simulate: bool,
) -> Box<dyn PulseDriver> {
    if simulate {
        return Box::new(SimulatedPulseDriver::new(step_delay));
    }

    #[cfg(feature = "gpio")]
    {
        match open_sysfs_driver(axes, enable_pins, step_delay) {
            Ok(driver) => return Box::new(driver),
            Err(e) => tracing::warn!("GPIO unavailable ({}), falling back to simulation", e),
        }
    }

    #[cfg(not(feature = "gpio"))]
    {
        let _ = (axes, enable_pins);
        tracing::warn!("Built without GPIO support, running in simulation mode");
    }

    Box::new(SimulatedPulseDriver::new(step_delay))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulate_flag_selects_simulation() {
        let driver = select_driver(&[], &[], Duration::ZERO, true);
        assert_eq!(driver.name(), "simulated");
    }
}
