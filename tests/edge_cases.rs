//! Concurrency and boundary tests for the motion controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cam_kiosk::config::MotorsConfig;
use cam_kiosk::hal::{MockPulseDriver, SimulatedPulseDriver};
use cam_kiosk::{
    AxisStatus, ControlError, Direction, DriverError, MotorController, PinId, PulseDriver,
};

const SETTLE: Duration = Duration::from_secs(10);

fn rig() -> MotorsConfig {
    MotorsConfig::default()
        .with_step_delay_us(0)
        .with_idle_interval_ms(1)
}

fn controller() -> MotorController<SimulatedPulseDriver> {
    MotorController::from_config(&rig(), SimulatedPulseDriver::new(Duration::ZERO)).unwrap()
}

/// Driver that refuses to step until its gate opens. The gate is sampled on
/// the first direction change of each tick (`m1`'s pin), so every axis in a
/// tick sees the same decision.
struct GatedDriver {
    gate: Arc<AtomicBool>,
    latch_pin: PinId,
    latched: bool,
}

impl PulseDriver for GatedDriver {
    fn set_direction(&mut self, pin: PinId, _direction: Direction) -> Result<(), DriverError> {
        if pin == self.latch_pin {
            self.latched = self.gate.load(Ordering::SeqCst);
        }
        Ok(())
    }

    fn pulse_step(&mut self, pin: PinId) -> Result<(), DriverError> {
        if self.latched {
            thread::sleep(Duration::from_micros(100));
            Ok(())
        } else {
            Err(DriverError::Line {
                pin,
                message: "gate closed".into(),
            })
        }
    }
}

// ============================================================================
// Concurrent Commands
// ============================================================================

#[test]
fn concurrent_moves_compose_by_addition() {
    let controller = Arc::new(controller());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let c = Arc::clone(&controller);
            thread::spawn(move || {
                let direction = if i % 2 == 0 {
                    Direction::Forward
                } else {
                    Direction::Reverse
                };
                for _ in 0..50 {
                    c.move_motor("m1", direction, i + 1).unwrap();
                    c.move_motor("m2", Direction::Forward, 1).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert!(controller.wait_idle(SETTLE));

    // m1: 50 * (1 - 2 + 3 - 4 + 5 - 6 + 7 - 8) = -200
    let snap = controller.snapshot();
    assert_eq!(snap.axis("m1").unwrap().position_steps, -200);
    assert_eq!(snap.axis("m2").unwrap().position_steps, 400);
}

#[test]
fn snapshots_never_split_a_tick() {
    let gate = Arc::new(AtomicBool::new(false));
    let driver = GatedDriver {
        gate: Arc::clone(&gate),
        latch_pin: 20,
        latched: false,
    };
    let controller = MotorController::from_config(&rig(), driver).unwrap();
    controller.move_motor("m1", Direction::Forward, 300).unwrap();
    controller.move_motor("m2", Direction::Forward, 300).unwrap();

    gate.store(true, Ordering::SeqCst);
    while !controller.is_idle() {
        let snap = controller.snapshot();
        let (m1, m2) = (snap.axis("m1").unwrap(), snap.axis("m2").unwrap());
        assert_eq!(m1.position_steps, m2.position_steps);
        assert_eq!(m1.pending_steps, m2.pending_steps);
    }
    assert_eq!(controller.snapshot().axis("m2").unwrap().position_steps, 300);
}

#[test]
fn emergency_stop_races_with_moves() {
    let driver = MockPulseDriver::new().with_pulse_delay(Duration::from_micros(200));
    let controller = Arc::new(MotorController::from_config(&rig(), driver).unwrap());

    let mover = {
        let c = Arc::clone(&controller);
        thread::spawn(move || {
            for _ in 0..100 {
                c.move_motor("m2", Direction::Reverse, 10).unwrap();
            }
        })
    };
    for _ in 0..10 {
        controller.emergency_stop();
        thread::sleep(Duration::from_millis(1));
    }
    mover.join().unwrap();
    controller.emergency_stop();

    let snap = controller.snapshot();
    let m2 = snap.axis("m2").unwrap();
    assert_eq!(m2.pending_steps, 0);
    assert!(m2.position_steps <= 0);
    assert!(m2.position_steps >= -1000);
    assert!(controller.wait_idle(Duration::from_millis(50)));
}

#[test]
fn commands_are_served_while_pulsing() {
    let driver = MockPulseDriver::new().with_pulse_delay(Duration::from_millis(1));
    let controller = MotorController::from_config(&rig(), driver).unwrap();
    controller.move_motor("m1", Direction::Forward, 100_000).unwrap();

    // each query waits at most one tick
    for _ in 0..20 {
        let snap = controller.snapshot();
        assert_eq!(snap.axis("m1").unwrap().status, AxisStatus::Moving);
    }
    controller.emergency_stop();
    assert!(controller.is_idle());
}

// ============================================================================
// Overrides
// ============================================================================

#[test]
fn target_replaces_pending_relative_motion() {
    let gate = Arc::new(AtomicBool::new(false));
    let driver = GatedDriver {
        gate: Arc::clone(&gate),
        latch_pin: 20,
        latched: false,
    };
    let controller = MotorController::from_config(&rig(), driver).unwrap();

    controller.move_motor("m1", Direction::Forward, 500).unwrap();
    assert_eq!(controller.set_target_angle("m1", -0.75).unwrap(), -20);
    assert_eq!(controller.snapshot().axis("m1").unwrap().pending_steps, -20);

    gate.store(true, Ordering::SeqCst);
    assert!(controller.wait_idle(SETTLE));
    assert_eq!(controller.snapshot().axis("m1").unwrap().position_steps, -20);
}

#[test]
fn move_after_target_adds_to_remaining_distance() {
    let controller = controller();
    controller.set_target_angle("m2", 1.5).unwrap();
    controller.move_motor("m2", Direction::Forward, 5).unwrap();
    assert!(controller.wait_idle(SETTLE));

    let snap = controller.snapshot();
    let m2 = snap.axis("m2").unwrap();
    assert_eq!(m2.position_steps, 25);
    // the target is what was last asked for, not where the axis ended up
    assert_eq!(m2.target_steps, 20);
}

#[test]
fn tare_then_reset_does_not_move() {
    let controller = controller();
    controller.move_motor("m1", Direction::Forward, 60).unwrap();
    assert!(controller.wait_idle(SETTLE));

    controller.tare_position();
    controller.reset_angles();
    assert!(controller.is_idle());
    assert_eq!(controller.snapshot().axis("m1").unwrap().position_steps, 0);
}

// ============================================================================
// Boundaries
// ============================================================================

#[test]
fn zero_step_move_is_noop() {
    let controller = controller();
    let before = controller.snapshot();
    controller.move_motor("m1", Direction::Forward, 0).unwrap();
    assert_eq!(controller.snapshot(), before);
    assert!(controller.is_idle());
}

#[test]
fn huge_moves_are_cancellable() {
    let controller = controller();
    controller.move_motor("m1", Direction::Forward, u32::MAX).unwrap();
    controller.move_motor("m1", Direction::Forward, u32::MAX).unwrap();
    assert!(!controller.is_idle());

    controller.emergency_stop();
    assert!(controller.is_idle());
}

#[test]
fn large_angles_are_accepted() {
    let controller = controller();
    // ten turns of the base
    assert_eq!(controller.set_target_angle("m1", 3600.0).unwrap(), 96_000);
    assert_eq!(controller.set_target_angle("m1", -3600.0).unwrap(), -96_000);
    controller.emergency_stop();
}

#[test]
fn negative_zero_targets_zero() {
    let controller = controller();
    assert_eq!(controller.set_target_angle("m2", -0.0).unwrap(), 0);
    assert!(controller.is_idle());
}

#[test]
fn non_finite_angles_are_rejected() {
    let controller = controller();
    for angle in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        assert!(matches!(
            controller.set_target_angle("m1", angle),
            Err(ControlError::InvalidAngle(_))
        ));
    }
    assert!(controller.is_idle());
}

#[test]
fn axis_ids_are_case_sensitive() {
    let controller = controller();
    assert!(matches!(
        controller.jog("M2", Direction::Forward),
        Err(ControlError::UnknownAxis(_))
    ));
    assert!(controller.jog("m2", Direction::Forward).is_ok());
}

#[test]
fn failed_pulses_are_retried() {
    let driver = MockPulseDriver::new();
    let fail = driver.failure_switch();
    *fail.lock() = true;
    let controller = MotorController::from_config(&rig(), driver).unwrap();

    controller.move_motor("m1", Direction::Forward, 10).unwrap();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(controller.snapshot().axis("m1").unwrap().position_steps, 0);

    *fail.lock() = false;
    assert!(controller.wait_idle(SETTLE));
    assert_eq!(controller.snapshot().axis("m1").unwrap().position_steps, 10);
}

#[test]
fn stop_is_idempotent_and_drop_is_safe() {
    let controller = controller();
    controller.stop();
    controller.stop();
    assert!(!controller.is_running());
    drop(controller);
}
