//! Planner behaviour through the full debounce → channel → planner path.

use liftcore::app::events::AppEvent;
use liftcore::app::service::ElevatorCore;
use liftcore::config::SystemConfig;
use liftcore::pins::InputLine;
use liftcore::planner::queue::{Floor, Insertion};

use crate::mock_hw::{MockCar, RecordingSink};

/// Samples needed for a level change to be accepted.
const CONFIRM: usize = 3;

fn core() -> ElevatorCore {
    ElevatorCore::new(SystemConfig::default()).unwrap()
}

fn poll(core: &mut ElevatorCore, car: &MockCar, n: usize) {
    for _ in 0..n {
        core.poll_inputs(car);
    }
}

fn press(core: &mut ElevatorCore, car: &MockCar, line: InputLine) {
    car.set_line(line, true);
    poll(core, car, CONFIRM);
    car.set_line(line, false);
    poll(core, car, CONFIRM);
}

#[test]
fn target_is_only_selected_with_doors_closed() {
    let mut core = core();
    let car = MockCar::new();
    car.set_line(InputLine::AtFloor, true);
    let mut sink = RecordingSink::new();

    press(&mut core, &car, InputLine::CallFloor3);
    core.run_planner(&car, &mut sink);

    assert_eq!(core.view().queue().as_slice(), &[Floor::Floor3]);
    assert!(car.targets().is_empty());
    assert!(sink.contains(&AppEvent::RequestQueued {
        floor: Floor::Floor3,
        at: Insertion::Tail,
    }));

    car.set_line(InputLine::DoorsClosed, true);
    poll(&mut core, &car, CONFIRM);
    core.run_planner(&car, &mut sink);

    assert_eq!(car.targets(), vec![800]);
    assert_eq!(core.view().planner_target(), 800);
    assert!(sink.contains(&AppEvent::TargetChanged {
        floor: Floor::Floor3,
        position_cm: 800,
    }));

    // Unchanged head: no second command.
    core.run_planner(&car, &mut sink);
    assert_eq!(car.targets(), vec![800]);
}

#[test]
fn head_is_committed_when_doors_open_at_arrival() {
    let mut core = core();
    let car = MockCar::parked();
    let mut sink = RecordingSink::new();

    poll(&mut core, &car, CONFIRM);
    press(&mut core, &car, InputLine::CallFloor2);
    core.run_planner(&car, &mut sink);
    assert_eq!(car.targets(), vec![400]);

    // Leave floor 1, arrive at floor 2, doors open.
    car.set_line(InputLine::AtFloor, false);
    poll(&mut core, &car, CONFIRM);
    core.run_planner(&car, &mut sink);
    assert_eq!(core.planner_state().current_floor, Floor::Floor1);

    car.set_line(InputLine::AtFloor, true);
    car.set_line(InputLine::DoorsClosed, false);
    poll(&mut core, &car, CONFIRM);
    core.run_planner(&car, &mut sink);

    let state = core.planner_state();
    assert_eq!(state.current_floor, Floor::Floor2);
    assert!(core.view().queue().is_empty());
    assert!(sink.contains(&AppEvent::FloorServiced {
        floor: Floor::Floor2
    }));
}

#[test]
fn repeated_calls_queue_once() {
    let mut core = core();
    let car = MockCar::new();
    let mut sink = RecordingSink::new();

    press(&mut core, &car, InputLine::CallFloor3);
    press(&mut core, &car, InputLine::CallFloor2);
    press(&mut core, &car, InputLine::CallFloor3);
    core.run_planner(&car, &mut sink);

    assert_eq!(
        core.view().queue().as_slice(),
        &[Floor::Floor3, Floor::Floor2]
    );
    let queued = sink.count(|e| matches!(e, AppEvent::RequestQueued { .. }));
    assert_eq!(queued, 2);
}

#[test]
fn stop_button_stops_and_releases_motor() {
    let mut core = core();
    let car = MockCar::parked();
    let mut sink = RecordingSink::new();

    car.set_line(InputLine::StopButton, true);
    poll(&mut core, &car, CONFIRM);
    core.run_planner(&car, &mut sink);
    assert_eq!(car.stop_calls(), vec![true]);
    assert!(core.planner_state().stop_latched);

    car.set_line(InputLine::StopButton, false);
    poll(&mut core, &car, CONFIRM);
    core.run_planner(&car, &mut sink);
    assert_eq!(car.stop_calls(), vec![true, false]);
    assert!(sink.contains(&AppEvent::StopLatched(true)));
    assert!(sink.contains(&AppEvent::StopLatched(false)));
}
