//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for the hardware and network traits,
//! enabling development and testing on desktop without a Pi or a robot.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockPulseDriver`] | [`PulseDriver`] | Records direction/step events, injects failures |
//! | [`MockPin`] | [`OutputPin`] | Records every level written |
//! | [`MockMqtt`] | [`MqttClient`] | Captures pub/sub operations |
//! | [`MockRobot`] | [`RobotLink`] | Records robot commands |
//!
//! # Example
//!
//! ```rust
//! use cam_kiosk::hal::{MockPulseDriver, StepEvent};
//! use cam_kiosk::traits::{Direction, PulseDriver};
//!
//! let mut driver = MockPulseDriver::new();
//! let log = driver.events();
//!
//! driver.set_direction(20, Direction::Forward).unwrap();
//! driver.pulse_step(16).unwrap();
//!
//! assert_eq!(
//!     *log.lock(),
//!     vec![StepEvent::Direction(20, Direction::Forward), StepEvent::Pulse(16)]
//! );
//! ```
//!
//! [`PulseDriver`]: crate::traits::PulseDriver
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//! [`MqttClient`]: crate::traits::MqttClient
//! [`RobotLink`]: crate::traits::RobotLink

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{DriverError, RobotError};
use crate::traits::{Direction, MqttClient, MqttMessage, PinId, PulseDriver, RobotInfo, RobotLink};

// ============================================================================
// Hardware Mocks
// ============================================================================

/// One call observed by [`MockPulseDriver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepEvent {
    /// `set_direction(pin, direction)`
    Direction(PinId, Direction),
    /// `pulse_step(pin)` that succeeded
    Pulse(PinId),
}

/// Mock pulse driver for testing.
///
/// The driver moves into the controller's background thread, so the event
/// log and failure switch are shared handles the test keeps.
#[derive(Debug, Default)]
pub struct MockPulseDriver {
    events: Arc<Mutex<Vec<StepEvent>>>,
    failing: Arc<Mutex<bool>>,
    released: Arc<Mutex<bool>>,
    pulse_delay: Duration,
}

impl MockPulseDriver {
    /// Creates a mock driver that returns immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every pulse block for `delay`.
    pub fn with_pulse_delay(mut self, delay: Duration) -> Self {
        self.pulse_delay = delay;
        self
    }

    /// Shared event log.
    pub fn events(&self) -> Arc<Mutex<Vec<StepEvent>>> {
        Arc::clone(&self.events)
    }

    /// Shared failure switch: while `true`, every pulse fails.
    pub fn failure_switch(&self) -> Arc<Mutex<bool>> {
        Arc::clone(&self.failing)
    }

    /// Shared flag set once `release` has been called.
    pub fn released_flag(&self) -> Arc<Mutex<bool>> {
        Arc::clone(&self.released)
    }
}

impl PulseDriver for MockPulseDriver {
    fn set_direction(&mut self, pin: PinId, direction: Direction) -> Result<(), DriverError> {
        self.events.lock().push(StepEvent::Direction(pin, direction));
        Ok(())
    }

    fn pulse_step(&mut self, pin: PinId) -> Result<(), DriverError> {
        if !self.pulse_delay.is_zero() {
            std::thread::sleep(self.pulse_delay);
        }
        if *self.failing.lock() {
            return Err(DriverError::Line {
                pin,
                message: "injected failure".into(),
            });
        }
        self.events.lock().push(StepEvent::Pulse(pin));
        Ok(())
    }

    fn release(&mut self) -> Result<(), DriverError> {
        *self.released.lock() = true;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Count pulses on `pin` in an event log.
pub fn pulses_on(events: &[StepEvent], pin: PinId) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, StepEvent::Pulse(p) if *p == pin))
        .count()
}

/// Error returned by a failing [`MockPin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinError;

impl embedded_hal::digital::Error for MockPinError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

/// Mock output line.
///
/// # Example
///
/// ```rust
/// use cam_kiosk::hal::MockPin;
/// use embedded_hal::digital::OutputPin;
///
/// let mut pin = MockPin::new();
/// pin.set_high().unwrap();
/// pin.set_low().unwrap();
///
/// assert_eq!(pin.levels, vec![true, false]);
/// assert_eq!(pin.rising_edges(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockPin {
    /// Every level written, in order (`true` = high).
    pub levels: Vec<bool>,
    /// When `true`, writes fail with [`MockPinError`].
    pub fail: bool,
}

impl MockPin {
    /// Creates a pin that has never been written.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level written; `false` if never written.
    pub fn is_high(&self) -> bool {
        self.levels.last().copied().unwrap_or(false)
    }

    /// Number of low-to-high transitions (the initial level counts from low).
    pub fn rising_edges(&self) -> usize {
        let mut previous = false;
        let mut edges = 0;
        for &level in &self.levels {
            if level && !previous {
                edges += 1;
            }
            previous = level;
        }
        edges
    }

    fn write(&mut self, level: bool) -> Result<(), MockPinError> {
        if self.fail {
            return Err(MockPinError);
        }
        self.levels.push(level);
        Ok(())
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = MockPinError;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock MQTT client for testing.
///
/// Captures published messages and subscriptions for verification.
/// Queue incoming messages with [`queue_message`](Self::queue_message).
///
/// # Example
///
/// ```rust
/// use cam_kiosk::hal::MockMqtt;
/// use cam_kiosk::traits::MqttClient;
///
/// let mut mqtt = MockMqtt::new();
///
/// // Queue incoming message
/// mqtt.queue_message("temi/00119/status/info", br#"{"locations":[]}"#.to_vec());
/// assert!(mqtt.try_recv().is_some());
///
/// // Check published messages
/// mqtt.publish("temi/00119/command/move/stop", b"{}", false).unwrap();
/// assert_eq!(mqtt.published_to("temi/00119/command/move/stop").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockMqtt {
    /// Messages that have been published (topic, payload, retain).
    pub published: Vec<(String, Vec<u8>, bool)>,
    /// Topics that have been subscribed to.
    pub subscriptions: Vec<String>,
    /// Queue of incoming messages to be returned by `try_recv()`.
    pub incoming: Vec<MqttMessage>,
    /// Whether the client is connected.
    pub connected: bool,
}

impl MockMqtt {
    /// Creates a new mock MQTT client in connected state.
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    /// Queue an incoming message
    pub fn queue_message(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.incoming.push(MqttMessage::new(topic, payload));
    }

    /// Check if a topic was subscribed to
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.iter().any(|t| t == topic)
    }

    /// Get published messages for a topic
    pub fn published_to(&self, topic: &str) -> Vec<&(String, Vec<u8>, bool)> {
        self.published
            .iter()
            .filter(|(t, _, _)| t == topic)
            .collect()
    }
}

impl MqttClient for MockMqtt {
    type Error = &'static str;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        if !self.connected {
            return Err("not connected");
        }
        self.published.push((topic.into(), payload.to_vec(), retain));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        if !self.connected {
            return Err("not connected");
        }
        self.subscriptions.push(topic.into());
        Ok(())
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        if self.incoming.is_empty() {
            None
        } else {
            Some(self.incoming.remove(0))
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// One command observed by [`MockRobot`].
#[derive(Clone, Debug, PartialEq)]
pub enum RobotCommand {
    /// Speech
    Tts(String),
    /// Navigation
    Goto(String),
    /// In-place rotation
    Rotate(i32),
    /// Joystick input
    Joystick(f32, f32),
    /// Stop
    Stop,
}

/// Mock robot for web layer tests.
#[derive(Debug, Default, Clone)]
pub struct MockRobot {
    /// Info returned by `info()`.
    pub info: RobotInfo,
    /// Shared command log.
    pub commands: Arc<Mutex<Vec<RobotCommand>>>,
}

impl MockRobot {
    /// A connected robot with the given saved locations.
    pub fn with_locations(locations: &[&str]) -> Self {
        Self {
            info: RobotInfo {
                available: true,
                locations: locations.iter().map(|l| l.to_string()).collect(),
                current_location: "home base".to_string(),
            },
            commands: Arc::default(),
        }
    }

    fn record(&self, command: RobotCommand) -> Result<(), RobotError> {
        self.commands.lock().push(command);
        Ok(())
    }
}

impl RobotLink for MockRobot {
    fn info(&mut self) -> RobotInfo {
        self.info.clone()
    }

    fn tts(&mut self, text: &str) -> Result<(), RobotError> {
        if text.trim().is_empty() {
            return Err(RobotError::EmptyText);
        }
        self.record(RobotCommand::Tts(text.to_string()))
    }

    fn goto(&mut self, location: &str) -> Result<(), RobotError> {
        if location.trim().is_empty() {
            return Err(RobotError::EmptyLocation);
        }
        self.record(RobotCommand::Goto(location.to_string()))
    }

    fn rotate(&mut self, degrees: i32) -> Result<(), RobotError> {
        self.record(RobotCommand::Rotate(degrees))
    }

    fn joystick(&mut self, x: f32, y: f32) -> Result<(), RobotError> {
        self.record(RobotCommand::Joystick(x, y))
    }

    fn stop(&mut self) -> Result<(), RobotError> {
        self.record(RobotCommand::Stop)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::digital::OutputPin;

    // =========================================================================
    // MockPulseDriver Tests
    // =========================================================================

    #[test]
    fn mock_driver_records_events() {
        let mut driver = MockPulseDriver::new();
        let events = driver.events();
        driver.set_direction(14, Direction::Reverse).unwrap();
        driver.pulse_step(15).unwrap();
        driver.pulse_step(15).unwrap();

        let log = events.lock();
        assert_eq!(log[0], StepEvent::Direction(14, Direction::Reverse));
        assert_eq!(pulses_on(&log, 15), 2);
    }

    #[test]
    fn mock_driver_failure_switch() {
        let mut driver = MockPulseDriver::new();
        let fail = driver.failure_switch();
        *fail.lock() = true;
        assert!(driver.pulse_step(15).is_err());
        *fail.lock() = false;
        assert!(driver.pulse_step(15).is_ok());
        assert_eq!(pulses_on(&driver.events().lock(), 15), 1);
    }

    #[test]
    fn mock_driver_release_flag() {
        let mut driver = MockPulseDriver::new();
        let released = driver.released_flag();
        assert!(!*released.lock());
        driver.release().unwrap();
        assert!(*released.lock());
    }

    // =========================================================================
    // MockPin Tests
    // =========================================================================

    #[test]
    fn mock_pin_edges() {
        let mut pin = MockPin::new();
        for level in [false, true, true, false, true] {
            if level {
                pin.set_high().unwrap();
            } else {
                pin.set_low().unwrap();
            }
        }
        assert_eq!(pin.rising_edges(), 2);
        assert!(pin.is_high());
    }

    #[test]
    fn mock_pin_failure() {
        let mut pin = MockPin {
            fail: true,
            ..Default::default()
        };
        assert_eq!(pin.set_high(), Err(MockPinError));
        assert!(pin.levels.is_empty());
    }

    // =========================================================================
    // MockMqtt Tests
    // =========================================================================

    #[test]
    fn mock_mqtt_publish_subscribe() {
        let mut mqtt = MockMqtt::new();
        mqtt.subscribe("temi/1/status/info").unwrap();
        mqtt.publish("temi/1/command/tts", b"{}", false).unwrap();
        assert!(mqtt.is_subscribed("temi/1/status/info"));
        assert_eq!(mqtt.published_to("temi/1/command/tts").len(), 1);
    }

    #[test]
    fn mock_mqtt_disconnected_rejects_publish() {
        let mut mqtt = MockMqtt::default();
        assert!(!mqtt.is_connected());
        assert!(mqtt.publish("t", b"", false).is_err());
    }

    #[test]
    fn mock_mqtt_fifo_receive() {
        let mut mqtt = MockMqtt::new();
        mqtt.queue_message("a", b"1".to_vec());
        mqtt.queue_message("b", b"2".to_vec());
        assert_eq!(mqtt.try_recv().unwrap().topic, "a");
        assert_eq!(mqtt.try_recv().unwrap().topic, "b");
        assert!(mqtt.try_recv().is_none());
    }

    // =========================================================================
    // MockRobot Tests
    // =========================================================================

    #[test]
    fn mock_robot_validates_text() {
        let mut robot = MockRobot::with_locations(&["lobby"]);
        assert_eq!(robot.tts("  "), Err(RobotError::EmptyText));
        robot.tts("hello").unwrap();
        assert_eq!(
            *robot.commands.lock(),
            vec![RobotCommand::Tts("hello".into())]
        );
    }
}
