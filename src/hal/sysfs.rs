//! Raspberry Pi output lines through the Linux sysfs GPIO interface.
//!
//! Requires the `gpio` feature. Lines are exported on open and unexported
//! when dropped.

use std::fmt;
use std::thread;
use std::time::Duration;

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use sysfs_gpio::{Direction as LineDirection, Pin};

use super::GpioPulseDriver;
use crate::axis::Axis;
use crate::error::DriverError;
use crate::traits::PinId;

/// udev needs a moment to fix permissions on freshly exported lines.
const EXPORT_SETTLE: Duration = Duration::from_millis(10);

/// Error from a sysfs line write.
#[derive(Debug)]
pub struct SysfsLineError(sysfs_gpio::Error);

impl fmt::Display for SysfsLineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for SysfsLineError {}

impl embedded_hal::digital::Error for SysfsLineError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// One exported sysfs output line.
#[derive(Debug)]
pub struct SysfsLine {
    pin: Pin,
}

impl SysfsLine {
    /// Export `number` (BCM) and configure it as a low output.
    pub fn open(number: PinId) -> Result<Self, DriverError> {
        let pin = Pin::new(u64::from(number));
        let line_error = |e: sysfs_gpio::Error| DriverError::Line {
            pin: number,
            message: e.to_string(),
        };

        pin.export().map_err(line_error)?;
        thread::sleep(EXPORT_SETTLE);
        pin.set_direction(LineDirection::Out).map_err(line_error)?;
        pin.set_value(0).map_err(line_error)?;
        Ok(Self { pin })
    }
}

impl Drop for SysfsLine {
    fn drop(&mut self) {
        if let Err(e) = self.pin.unexport() {
            tracing::warn!("Failed to unexport GPIO {}: {}", self.pin.get_pin_num(), e);
        }
    }
}

impl ErrorType for SysfsLine {
    type Error = SysfsLineError;
}

impl OutputPin for SysfsLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_value(0).map_err(SysfsLineError)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_value(1).map_err(SysfsLineError)
    }
}

/// Open every line the rig uses and build a pulse driver over them.
///
/// Lines opened before a failure are unexported again as they drop.
pub fn open_sysfs_driver(
    axes: &[Axis],
    enable_pins: &[PinId],
    step_delay: Duration,
) -> Result<GpioPulseDriver<SysfsLine>, DriverError> {
    let numbers = axes
        .iter()
        .flat_map(|a| [a.direction_pin(), a.step_pin()])
        .chain(enable_pins.iter().copied());

    let mut lines = Vec::new();
    for number in numbers {
        lines.push((number, SysfsLine::open(number)?));
    }
    GpioPulseDriver::new(lines, enable_pins, step_delay)
}
