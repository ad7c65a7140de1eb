//! Orchestrator + sequencer against recording actuators.

use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use amar::app::dispense::{DispenseOrchestrator, MANUAL_PILL_NAME, MANUAL_SCHEDULE_ID};
use amar::app::events::{DispenseEvent, Notification};
use amar::app::ports::DoseFollowUp;
use amar::error::{Error, HardwareError, InputError};
use amar::sequencer::ActuatorSequencer;

use crate::mock_hw::{ActuatorCall, CallLog, ManualClock, MockActuators, RecordingSink, calls, quick_carousel};

fn rig(hw: MockActuators) -> (Arc<DispenseOrchestrator>, Arc<ActuatorSequencer>, Arc<RecordingSink>) {
    let sequencer = Arc::new(ActuatorSequencer::new(Box::new(hw), &quick_carousel()));
    let sink = Arc::new(RecordingSink::default());
    let orch = Arc::new(DispenseOrchestrator::new(
        Arc::clone(&sequencer),
        sink.clone(),
        Arc::new(ManualClock::at(8, 0, 0)),
    ));
    (orch, sequencer, sink)
}

#[test]
fn dispense_runs_full_motion_sequence() {
    let (hw, log) = MockActuators::new();
    let (orch, _, _) = rig(hw);
    orch.trigger_dispense("A1", 3, "Aspirin").unwrap();

    let c = quick_carousel();
    assert_eq!(
        calls(&log),
        [
            ActuatorCall::Rotate(c.positions[2]),
            ActuatorCall::ReleaseRotation,
            ActuatorCall::Gate(c.gate_open),
            ActuatorCall::Gate(c.gate_closed),
            ActuatorCall::ReleaseGate,
        ]
    );
}

#[test]
fn successful_dispense_emits_exactly_one_success() {
    let (hw, _) = MockActuators::new();
    let (orch, _, sink) = rig(hw);
    for compartment in 1..=7 {
        let event = orch.trigger_dispense("S", compartment, "Pill").unwrap();
        assert!(event.confirmed);
    }
    let sent = sink.sent();
    assert_eq!(sent.len(), 7);
    assert!(sent.iter().all(|n| n.name() == "dispense_success"));
}

#[test]
fn out_of_range_compartments_never_move() {
    let (hw, log) = MockActuators::new();
    let (orch, _, sink) = rig(hw);
    for bad in [0, 8, -1, 100] {
        let err = orch.trigger_dispense("A1", bad, "Aspirin").unwrap_err();
        assert_eq!(err, Error::InvalidInput(InputError::InvalidCompartment(bad)));
    }
    assert!(calls(&log).is_empty());
    assert_eq!(sink.names(), ["dispense_failed"; 4]);
}

#[test]
fn concurrent_dispenses_never_overlap() {
    let (hw, log) = MockActuators::new();
    let (orch, _, sink) = rig(hw);
    let start = Arc::new(Barrier::new(2));

    let workers: Vec<_> = [2, 6]
        .into_iter()
        .map(|compartment| {
            let orch = Arc::clone(&orch);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                orch.trigger_dispense("race", compartment, "Pill").unwrap()
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    // Two complete 5-call sequences, back to back, never interleaved.
    let stamped = log.lock().unwrap().clone();
    assert_eq!(stamped.len(), 10);
    let (first, second) = stamped.split_at(5);
    assert_eq!(first[4].call, ActuatorCall::ReleaseGate);
    assert!(matches!(second[0].call, ActuatorCall::Rotate(_)));
    assert!(second[0].at >= first[4].at);
    assert_eq!(sink.sent().len(), 2);
}

#[test]
fn sequencer_windows_are_disjoint() {
    let (hw, _) = MockActuators::new();
    let (_, sequencer, _) = rig(hw);
    let a = {
        let s = Arc::clone(&sequencer);
        thread::spawn(move || s.dispense(1).unwrap())
    };
    let b = {
        let s = Arc::clone(&sequencer);
        thread::spawn(move || s.dispense(7).unwrap())
    };
    let (a, b) = (a.join().unwrap(), b.join().unwrap());
    let (first, second) = if a.started_at <= b.started_at { (a, b) } else { (b, a) };
    assert!(second.started_at >= first.finished_at);
}

#[test]
fn hardware_fault_closes_gate_and_reports() {
    // Call 2 is the gate opening.
    let (hw, log): (MockActuators, CallLog) = MockActuators::failing_at(2);
    let (orch, _, sink) = rig(hw);
    let err = orch.trigger_dispense("A1", 4, "Aspirin").unwrap_err();
    assert_eq!(err, Error::Hardware(HardwareError::PwmWriteFailed));

    let gate_closed = quick_carousel().gate_closed;
    let history = calls(&log);
    assert!(history.contains(&ActuatorCall::Gate(gate_closed)));
    assert_eq!(history.last(), Some(&ActuatorCall::ReleaseRotation));
    match &sink.sent()[..] {
        [Notification::DispenseFailed { schedule_id, compartment, .. }] => {
            assert_eq!(schedule_id, "A1");
            assert_eq!(*compartment, 4);
        }
        other => panic!("unexpected notifications {other:?}"),
    }
}

#[test]
fn manual_dispense_acknowledges_before_moving() {
    let (hw, log) = MockActuators::new();
    let (orch, _, sink) = rig(hw);
    orch.dispense_manual(5).unwrap();

    let sent = sink.wait_for(1, Duration::from_secs(2));
    assert_eq!(
        sent,
        [Notification::DispenseSuccess {
            schedule_id: MANUAL_SCHEDULE_ID.into(),
            compartment: 5,
            pill_name: MANUAL_PILL_NAME.into(),
            timestamp: "2026-03-14 08:00:00".into(),
        }]
    );
    assert_eq!(calls(&log).len(), 5);
}

#[test]
fn follow_up_sees_every_event() {
    struct Seen(Arc<Mutex<Vec<DispenseEvent>>>);
    impl DoseFollowUp for Seen {
        fn after_dispense(&self, event: &DispenseEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    let (hw, _) = MockActuators::new();
    let sequencer = Arc::new(ActuatorSequencer::new(Box::new(hw), &quick_carousel()));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let orch = DispenseOrchestrator::new(
        sequencer,
        Arc::new(RecordingSink::default()),
        Arc::new(ManualClock::at(9, 0, 0)),
    )
    .with_follow_up(Seen(Arc::clone(&seen)));
    orch.trigger_dispense("B2", 1, "Metformin").unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].schedule_id, "B2");
    assert!(seen[0].confirmed);
}
