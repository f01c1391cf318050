//! Full-core runs against the simulated car on a virtual millisecond clock.
//!
//! The plant advances every 10 ms, the encoder is polled every 3 ms, and
//! the debouncer, planner and safety monitor run every 10 ms.

use std::sync::Arc;

use liftcore::adapters::sim::SimulatedCar;
use liftcore::app::events::AppEvent;
use liftcore::app::service::ElevatorCore;
use liftcore::config::SystemConfig;
use liftcore::pins::InputLine;
use liftcore::planner::queue::Floor;

use crate::mock_hw::RecordingSink;

struct Rig {
    core: ElevatorCore,
    car: Arc<SimulatedCar>,
    sink: RecordingSink,
    now_ms: u64,
}

impl Rig {
    fn new() -> Self {
        let core = ElevatorCore::new(SystemConfig::default()).unwrap();
        let car = Arc::new(SimulatedCar::new(core.config(), core.tracker()));
        let mut sink = RecordingSink::new();
        core.start(&mut sink);
        Self {
            core,
            car,
            sink,
            now_ms: 0,
        }
    }

    fn tick(&mut self) {
        let t = self.now_ms;
        if t % 10 == 0 {
            self.car.step();
        }
        if t % 3 == 0 {
            self.core.poll_encoder(&*self.car);
        }
        if t % 10 == 0 {
            self.core.poll_inputs(&*self.car);
            self.core.run_planner(&*self.car, &mut self.sink);
            self.core.run_safety(&*self.car, &mut self.sink);
        }
        self.now_ms += 1;
    }

    fn run_until(&mut self, until_ms: u64) {
        while self.now_ms < until_ms {
            self.tick();
        }
    }

    fn hold(&mut self, line: InputLine, duration_ms: u64) {
        self.car.press(line, true);
        self.run_until(self.now_ms + duration_ms);
        self.car.press(line, false);
    }
}

#[test]
fn call_to_floor3_travels_and_services() {
    let mut rig = Rig::new();
    rig.hold(InputLine::CallFloor3, 100);
    rig.run_until(20_000);

    let plant = rig.car.snapshot();
    assert_eq!(plant.position, 800);
    assert_eq!(rig.core.view().position(), 800);
    assert_eq!(rig.core.planner_state().current_floor, Floor::Floor3);
    assert_eq!(rig.core.monitor().violation(), None);
    assert!(rig.core.view().queue().is_empty());
    assert!(rig.sink.contains(&AppEvent::FloorServiced {
        floor: Floor::Floor3
    }));
    assert!(plant.doors_closed);
}

#[test]
fn stop_button_pauses_travel_mid_shaft() {
    let mut rig = Rig::new();
    rig.hold(InputLine::CallFloor3, 100);
    rig.run_until(5_000);

    rig.car.press(InputLine::StopButton, true);
    rig.run_until(5_100);
    let held_at = rig.car.snapshot().position;
    rig.run_until(5_500);
    assert_eq!(rig.car.snapshot().position, held_at);
    assert!(rig.core.planner_state().stop_latched);
    rig.car.press(InputLine::StopButton, false);

    rig.run_until(20_000);
    assert_eq!(rig.car.snapshot().position, 800);
    assert_eq!(rig.core.planner_state().current_floor, Floor::Floor3);
    assert_eq!(rig.core.monitor().violation(), None);
    assert!(rig.sink.contains(&AppEvent::StopLatched(true)));
    assert!(rig.sink.contains(&AppEvent::StopLatched(false)));
}

#[test]
fn middle_call_en_route_is_served_first() {
    let mut rig = Rig::new();
    rig.hold(InputLine::CallFloor3, 100);
    rig.run_until(2_000);
    rig.hold(InputLine::CallFloor2, 100);

    // Runs until the car has rested at floor 2.
    let mut served = Vec::new();
    while rig.now_ms < 40_000 && !served.contains(&Floor::Floor3) {
        rig.tick();
        served = rig
            .sink
            .events
            .iter()
            .filter_map(|e| match e {
                AppEvent::FloorServiced { floor } => Some(*floor),
                _ => None,
            })
            .collect();
    }

    assert_eq!(served, vec![Floor::Floor2, Floor::Floor3]);
    assert_eq!(rig.core.monitor().violation(), None);
}
