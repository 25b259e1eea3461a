//! Two-axis stepper motion controller.
//!
//! [`MotorController`] owns the axis descriptions, one lock-protected state
//! bundle and the background control thread that drains pending steps.
//!
//! # Architecture
//!
//! ```text
//! callers (web handlers) ──► command API ──┐
//!                                          ▼
//!                          Mutex<MotionState { counters, driver, running }>
//!                                          ▲
//!            control thread: lock ─► one step per moving axis ─► unlock
//! ```
//!
//! # Locking
//!
//! The control thread holds the state lock for the whole tick, including the
//! blocking pulse. A command issued while a pulse is in flight therefore
//! waits up to one pulse width (two step delays) per moving axis. In return,
//! a command never observes an axis between its driver pulse and its counter
//! update, and `emergency_stop` takes effect before the next pulse starts.
//! The lock is handed over fairly after each moving tick so a steady stream
//! of pulses cannot starve callers.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use cam_kiosk::{Direction, MotorController, MotorTiming};
//! use cam_kiosk::config::MotorsConfig;
//! use cam_kiosk::hal::SimulatedPulseDriver;
//!
//! let axes = MotorsConfig::default().build_axes().unwrap();
//! let timing = MotorTiming::new(Duration::ZERO, Duration::from_millis(1));
//! let controller =
//!     MotorController::new(axes, SimulatedPulseDriver::new(Duration::ZERO), timing).unwrap();
//!
//! controller.move_motor("m1", Direction::Forward, 100).unwrap();
//! assert!(controller.wait_idle(Duration::from_secs(5)));
//! assert!((controller.get_positions()["m1"] - 3.75).abs() < 1e-9);
//!
//! controller.stop();
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};

use crate::axis::{Axis, AxisState, AxisStatus};
use crate::config::MotorsConfig;
use crate::error::{ConfigError, ControlError};
use crate::traits::{Direction, PulseDriver};

/// Axis id to angle in degrees.
pub type AngleMap = BTreeMap<String, f64>;

/// Control loop timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotorTiming {
    /// Duration of each pulse phase. One step takes twice this.
    pub step_delay: Duration,
    /// Sleep after a tick in which no axis moved.
    pub idle_interval: Duration,
}

impl MotorTiming {
    /// Create a timing description.
    pub const fn new(step_delay: Duration, idle_interval: Duration) -> Self {
        Self {
            step_delay,
            idle_interval,
        }
    }
}

impl Default for MotorTiming {
    fn default() -> Self {
        Self::new(Duration::from_millis(3), Duration::from_millis(10))
    }
}

/// Everything the lock protects.
struct MotionState<D> {
    counters: Vec<AxisState>,
    driver: D,
    running: bool,
}

struct Inner<D> {
    axes: Vec<Axis>,
    timing: MotorTiming,
    state: Mutex<MotionState<D>>,
}

impl<D> Inner<D> {
    fn index_of(&self, axis: &str) -> Result<usize, ControlError> {
        self.axes
            .iter()
            .position(|a| a.id() == axis)
            .ok_or_else(|| ControlError::UnknownAxis(axis.to_string()))
    }
}

/// Per-axis view inside a [`ControllerSnapshot`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AxisSnapshot {
    /// Axis key
    pub id: String,
    /// Idle or moving
    pub status: AxisStatus,
    /// Steps still to emit
    pub pending_steps: i64,
    /// Net steps since the last tare
    pub position_steps: i64,
    /// Last absolute target in steps
    pub target_steps: i64,
    /// Position in degrees
    pub position_degrees: f64,
    /// Target in degrees
    pub target_degrees: f64,
    /// Resolution of this axis
    pub degrees_per_step: f64,
}

/// Consistent view of every axis, taken under one lock acquisition.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ControllerSnapshot {
    /// Whether the control thread is running
    pub running: bool,
    /// Axes in service order
    pub axes: Vec<AxisSnapshot>,
}

impl ControllerSnapshot {
    /// Look up one axis.
    pub fn axis(&self, id: &str) -> Option<&AxisSnapshot> {
        self.axes.iter().find(|a| a.id == id)
    }

    /// `true` when no axis has pending steps.
    pub fn is_idle(&self) -> bool {
        self.axes.iter().all(|a| a.status == AxisStatus::Idle)
    }

    /// Positions in degrees keyed by axis id.
    pub fn positions(&self) -> AngleMap {
        self.axes
            .iter()
            .map(|a| (a.id.clone(), a.position_degrees))
            .collect()
    }

    /// Targets in degrees keyed by axis id.
    pub fn targets(&self) -> AngleMap {
        self.axes
            .iter()
            .map(|a| (a.id.clone(), a.target_degrees))
            .collect()
    }
}

/// Stepper motion controller.
///
/// Construct once and share by reference (or `Arc`). The background control
/// thread is started by [`new`](Self::new) and stopped by
/// [`stop`](Self::stop) or when the controller is dropped, so it never
/// outlives its owner.
///
/// Commands issued after `stop` still update the counters but nothing
/// drains them.
pub struct MotorController<D: PulseDriver + 'static> {
    inner: Arc<Inner<D>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<D: PulseDriver + 'static> MotorController<D> {
    /// Create the controller and start its control thread.
    ///
    /// # Errors
    ///
    /// - [`ControlError::Config`] if `axes` is empty or has duplicate ids
    /// - [`ControlError::Spawn`] if the control thread cannot be started
    pub fn new(axes: Vec<Axis>, driver: D, timing: MotorTiming) -> Result<Self, ControlError> {
        if axes.is_empty() {
            return Err(ConfigError::Invalid("at least one axis is required".into()).into());
        }
        for (i, axis) in axes.iter().enumerate() {
            if axes[..i].iter().any(|a| a.id() == axis.id()) {
                return Err(
                    ConfigError::Invalid(format!("duplicate axis id '{}'", axis.id())).into(),
                );
            }
        }

        let driver_name = driver.name();
        let inner = Arc::new(Inner {
            state: Mutex::new(MotionState {
                counters: vec![AxisState::default(); axes.len()],
                driver,
                running: true,
            }),
            axes,
            timing,
        });

        let worker_inner = Arc::clone(&inner);
        let handle = thread::Builder::new()
            .name("motor-control".into())
            .spawn(move || control_loop(worker_inner))
            .map_err(ControlError::Spawn)?;

        tracing::info!(
            "Motor controller started: {} axes, {} driver, step delay {:?}",
            inner.axes.len(),
            driver_name,
            timing.step_delay
        );

        Ok(Self {
            inner,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Build the axes from configuration and start the controller.
    pub fn from_config(config: &MotorsConfig, driver: D) -> Result<Self, ControlError> {
        Self::new(config.build_axes()?, driver, config.timing())
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Queue a relative move, added to whatever is already pending.
    pub fn move_motor(
        &self,
        axis: &str,
        direction: Direction,
        steps: u32,
    ) -> Result<(), ControlError> {
        let index = self.inner.index_of(axis)?;
        let mut state = self.inner.state.lock();
        state.counters[index].queue(direction, steps);
        tracing::debug!(
            "{}: queued {} {} steps (pending {})",
            axis,
            steps,
            direction.as_str(),
            state.counters[index].pending_steps
        );
        Ok(())
    }

    /// Queue one jog of the axis's configured size.
    pub fn jog(&self, axis: &str, direction: Direction) -> Result<u32, ControlError> {
        let index = self.inner.index_of(axis)?;
        let steps = self.inner.axes[index].jog_steps();
        self.move_motor(axis, direction, steps)?;
        Ok(steps)
    }

    /// Drive an axis to an absolute angle.
    ///
    /// Replaces any pending relative motion on that axis. Returns the target
    /// in steps.
    ///
    /// # Errors
    ///
    /// [`ControlError::UnknownAxis`], or [`ControlError::InvalidAngle`] for
    /// NaN and infinite angles.
    pub fn set_target_angle(&self, axis: &str, degrees: f64) -> Result<i64, ControlError> {
        let index = self.inner.index_of(axis)?;
        if !degrees.is_finite() {
            return Err(ControlError::InvalidAngle(degrees));
        }
        let target = self.inner.axes[index].angle_to_steps(degrees);

        let mut state = self.inner.state.lock();
        state.counters[index].retarget(target);
        tracing::info!(
            "{}: target {:.3} deg = {} steps (pending {})",
            axis,
            degrees,
            target,
            state.counters[index].pending_steps
        );
        Ok(target)
    }

    /// Drive every axis back to angle zero.
    pub fn reset_angles(&self) {
        let mut state = self.inner.state.lock();
        for counter in &mut state.counters {
            counter.retarget(0);
        }
        tracing::info!("Returning all axes to zero");
    }

    /// Make the current pose the zero of every axis without moving.
    pub fn tare_position(&self) {
        let mut state = self.inner.state.lock();
        for counter in &mut state.counters {
            counter.tare();
        }
        tracing::info!("Position tared");
    }

    /// Cancel all queued motion. Positions and targets are kept.
    pub fn emergency_stop(&self) {
        let mut state = self.inner.state.lock();
        for counter in &mut state.counters {
            counter.cancel();
        }
        tracing::warn!("Emergency stop");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current angle of every axis in degrees.
    pub fn get_positions(&self) -> AngleMap {
        let state = self.inner.state.lock();
        self.inner
            .axes
            .iter()
            .zip(&state.counters)
            .map(|(axis, c)| (axis.id().to_string(), axis.steps_to_angle(c.position_steps)))
            .collect()
    }

    /// Last requested target angle of every axis in degrees.
    pub fn get_targets(&self) -> AngleMap {
        let state = self.inner.state.lock();
        self.inner
            .axes
            .iter()
            .zip(&state.counters)
            .map(|(axis, c)| (axis.id().to_string(), axis.steps_to_angle(c.target_steps)))
            .collect()
    }

    /// Full per-axis state.
    pub fn snapshot(&self) -> ControllerSnapshot {
        let state = self.inner.state.lock();
        let axes = self
            .inner
            .axes
            .iter()
            .zip(&state.counters)
            .map(|(axis, c)| AxisSnapshot {
                id: axis.id().to_string(),
                status: c.status(),
                pending_steps: c.pending_steps,
                position_steps: c.position_steps,
                target_steps: c.target_steps,
                position_degrees: axis.steps_to_angle(c.position_steps),
                target_degrees: axis.steps_to_angle(c.target_steps),
                degrees_per_step: axis.degrees_per_step(),
            })
            .collect();
        ControllerSnapshot {
            running: state.running,
            axes,
        }
    }

    /// Configured axis ids in service order.
    pub fn axis_ids(&self) -> Vec<&str> {
        self.inner.axes.iter().map(Axis::id).collect()
    }

    /// Axis descriptions in service order.
    pub fn axes(&self) -> &[Axis] {
        &self.inner.axes
    }

    /// `true` when no axis has pending steps.
    pub fn is_idle(&self) -> bool {
        self.inner
            .state
            .lock()
            .counters
            .iter()
            .all(|c| c.status() == AxisStatus::Idle)
    }

    /// Poll until every axis is idle or `timeout` elapses.
    ///
    /// Returns `true` if the rig came to rest in time.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let poll = self.inner.timing.idle_interval.max(Duration::from_millis(1));
        loop {
            if self.is_idle() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(poll);
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Stop the control thread, wait for it, then release the driver.
    ///
    /// The tick in flight finishes first. Calling this more than once is a
    /// no-op.
    pub fn stop(&self) {
        let Some(handle) = self.worker.lock().take() else {
            return;
        };

        self.inner.state.lock().running = false;
        if handle.join().is_err() {
            tracing::error!("Motor control thread panicked");
        }

        let mut state = self.inner.state.lock();
        if let Err(e) = state.driver.release() {
            tracing::warn!("Failed to release {} driver: {}", state.driver.name(), e);
        }
        tracing::info!("Motor controller stopped");
    }

    /// `true` until [`stop`](Self::stop) has been called.
    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }
}

impl<D: PulseDriver + 'static> Drop for MotorController<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<D: PulseDriver + 'static> core::fmt::Debug for MotorController<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotorController")
            .field("axes", &self.axis_ids())
            .field("timing", &self.inner.timing)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Control loop
// ============================================================================

fn control_loop<D: PulseDriver>(inner: Arc<Inner<D>>) {
    tracing::debug!("Control loop running");
    loop {
        let mut state = inner.state.lock();
        if !state.running {
            break;
        }
        if service_tick(&inner.axes, &mut state) {
            MutexGuard::unlock_fair(state);
        } else {
            drop(state);
            thread::sleep(inner.timing.idle_interval);
        }
    }
    tracing::debug!("Control loop exited");
}

/// One control tick: emit at most one step per axis with pending motion, in
/// axis order. Returns whether any axis moved.
///
/// A failed pulse is logged and not counted, so the step is retried on the
/// next tick.
fn service_tick<D: PulseDriver>(axes: &[Axis], state: &mut MotionState<D>) -> bool {
    let mut moved = false;
    for (axis, counter) in axes.iter().zip(state.counters.iter_mut()) {
        let Some(direction) = Direction::of_delta(counter.pending_steps) else {
            continue;
        };

        let pulse = state
            .driver
            .set_direction(axis.direction_pin(), direction)
            .and_then(|()| state.driver.pulse_step(axis.step_pin()));

        match pulse {
            Ok(()) => {
                counter.record_step(direction);
                moved = true;
            }
            Err(e) => tracing::warn!("{}: step failed: {}", axis.id(), e),
        }
    }
    moved
}
