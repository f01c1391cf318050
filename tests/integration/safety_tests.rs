//! Safety monitor scenarios against the mock car.

use liftcore::app::events::AppEvent;
use liftcore::app::service::ElevatorCore;
use liftcore::config::SystemConfig;
use liftcore::error::Requirement;
use liftcore::pins::InputLine;
use liftcore::safety::MonitorStatus;
use liftcore::sensors::position::Direction;

use crate::mock_hw::{MockCar, RecordingSink, UP};

fn core() -> ElevatorCore {
    ElevatorCore::new(SystemConfig::default()).unwrap()
}

#[test]
fn parked_car_passes_every_check() {
    let mut core = core();
    let car = MockCar::parked();
    let mut sink = RecordingSink::new();

    for _ in 0..500 {
        assert_eq!(core.run_safety(&car, &mut sink), MonitorStatus::Running);
    }
    assert!(car.stop_calls().is_empty());
    assert!(sink.events.is_empty());
}

#[test]
fn motor_ignoring_held_stop_violates_stop_deadline() {
    let mut core = core();
    let car = MockCar::new();
    car.set_line(InputLine::DoorsClosed, true);
    car.set_line(InputLine::StopButton, true);
    car.set_drive(UP);
    car.set_ignore_stop(true);
    let mut sink = RecordingSink::new();

    // Halted on the last tick inside the bound.
    let deadline = core.config().stop_deadline_ticks();
    for _ in 0..deadline - 1 {
        assert_eq!(core.run_safety(&car, &mut sink), MonitorStatus::Running);
    }
    assert_eq!(
        core.run_safety(&car, &mut sink),
        MonitorStatus::Halted(Requirement::Req1)
    );
    assert!(core.view().emergency_stopped());
    assert_eq!(car.stop_calls(), vec![true]);
    assert_eq!(sink.events, vec![AppEvent::SafetyViolation(Requirement::Req1)]);
}

#[test]
fn at_floor_sensor_between_floors_violates_env3() {
    let mut core = core();
    let tracker = core.tracker();
    tracker.set_direction(Direction::Up);
    for _ in 0..450 {
        tracker.on_pulse();
    }
    tracker.set_direction(Direction::Unknown);

    let car = MockCar::parked();
    let mut sink = RecordingSink::new();
    assert_eq!(
        core.run_safety(&car, &mut sink),
        MonitorStatus::Halted(Requirement::Env3)
    );
    assert_eq!(core.monitor().violation(), Some(Requirement::Env3));
}

#[test]
fn unstable_input_violates_env4() {
    let mut core = core();
    let car = MockCar::parked();
    let mut sink = RecordingSink::new();

    // Two high samples then low: neither pressed nor released.
    for level in [true, true, false] {
        car.set_line(InputLine::CallFloor1, level);
        core.poll_inputs(&car);
    }
    assert!(!core.view().inputs_stable());
    assert_eq!(
        core.run_safety(&car, &mut sink),
        MonitorStatus::Halted(Requirement::Env4)
    );
}

#[test]
fn halted_monitor_never_resumes() {
    let mut core = core();
    let car = MockCar::new();
    car.set_drive(UP);
    let mut sink = RecordingSink::new();

    // Moving with the doors open.
    assert_eq!(
        core.run_safety(&car, &mut sink),
        MonitorStatus::Halted(Requirement::Env1)
    );

    // Everything is nominal again.
    car.set_line(InputLine::DoorsClosed, true);
    car.set_line(InputLine::AtFloor, true);
    for _ in 0..50 {
        assert_eq!(
            core.run_safety(&car, &mut sink),
            MonitorStatus::Halted(Requirement::Env1)
        );
    }
    assert_eq!(car.stop_calls().len(), 51);
    assert!(car.stop_calls().iter().all(|&s| s));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::SafetyViolation(_))),
        1
    );
}

#[test]
fn stop_release_is_refused_after_violation() {
    let mut core = core();
    let car = MockCar::parked();
    let mut sink = RecordingSink::new();

    car.set_line(InputLine::StopButton, true);
    for _ in 0..3 {
        core.poll_inputs(&car);
    }
    core.run_planner(&car, &mut sink);

    // Doors open away from a floor.
    car.set_line(InputLine::AtFloor, false);
    car.set_line(InputLine::DoorsClosed, false);
    assert_eq!(
        core.run_safety(&car, &mut sink),
        MonitorStatus::Halted(Requirement::Env1)
    );

    car.set_line(InputLine::StopButton, false);
    for _ in 0..3 {
        core.poll_inputs(&car);
    }
    core.run_planner(&car, &mut sink);

    assert!(car.stop_calls().iter().all(|&s| s));
    assert!(sink.contains(&AppEvent::StopLatched(false)));
}
