//! Daily triggers driving the full dispense path.

use std::sync::Arc;
use std::time::Duration;

use amar::app::commands::AppCommand;
use amar::app::dispense::DispenseOrchestrator;
use amar::app::events::Notification;
use amar::app::ports::Clock;
use amar::app::service::AppService;
use amar::config::SchedulerConfig;
use amar::scheduler::JobScheduler;
use amar::sequencer::ActuatorSequencer;
use chrono::TimeDelta;

use crate::mock_hw::{CallLog, ManualClock, MockActuators, RecordingSink, calls, quick_carousel, utc};

struct Rig {
    clock: Arc<ManualClock>,
    scheduler: Arc<JobScheduler>,
    service: AppService,
    sink: Arc<RecordingSink>,
}

fn rig(poll_ms: u64) -> (Rig, CallLog) {
    let (hw, log) = MockActuators::new();
    let clock = Arc::new(ManualClock::at(7, 59, 0));
    let sink = Arc::new(RecordingSink::default());
    let sequencer = Arc::new(ActuatorSequencer::new(Box::new(hw), &quick_carousel()));
    let orch = Arc::new(DispenseOrchestrator::new(sequencer, sink.clone(), clock.clone()));
    let cfg = SchedulerConfig {
        poll_interval_ms: poll_ms,
        ..SchedulerConfig::default()
    };
    let scheduler = Arc::new(JobScheduler::new(clock.clone(), &cfg));
    let service = AppService::new(Arc::clone(&scheduler), orch, clock.clone());
    (
        Rig {
            clock,
            scheduler,
            service,
            sink,
        },
        log,
    )
}

fn add_aspirin(service: &AppService) {
    let reply = service.handle_command(AppCommand::AddSchedule {
        id: Some("A1".into()),
        name: Some("Aspirin".into()),
        time: Some("08:00".into()),
        compartment: Some(3),
    });
    assert!(reply.is_success(), "{reply:?}");
}

#[test]
fn aspirin_at_eight_dispenses_once() {
    let (rig, log) = rig(500);
    add_aspirin(&rig.service);

    assert_eq!(rig.scheduler.run_due(utc(7, 59, 59)), 0);
    rig.clock.set(utc(8, 0, 0));
    assert_eq!(rig.scheduler.run_due(utc(8, 0, 0)), 1);

    assert_eq!(
        rig.sink.sent(),
        [Notification::DispenseSuccess {
            schedule_id: "A1".into(),
            compartment: 3,
            pill_name: "Aspirin".into(),
            timestamp: "2026-03-14 08:00:00".into(),
        }]
    );
    assert_eq!(calls(&log).len(), 5);

    // Same minute again: nothing.  Next day: fires again.
    assert_eq!(rig.scheduler.run_due(utc(8, 0, 30)), 0);
    assert_eq!(rig.scheduler.run_due(utc(8, 0, 0) + TimeDelta::days(1)), 1);
    assert_eq!(rig.sink.sent().len(), 2);
}

#[test]
fn background_loop_fires_when_clock_reaches_trigger() {
    let (rig, _) = rig(10);
    add_aspirin(&rig.service);
    rig.scheduler.start().unwrap();

    std::thread::sleep(Duration::from_millis(50));
    assert!(rig.sink.sent().is_empty());

    rig.clock.set(utc(8, 0, 5));
    let sent = rig.sink.wait_for(1, Duration::from_secs(2));
    rig.scheduler.stop();

    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].name(), "dispense_success");
}

#[test]
fn resubmitting_an_id_replaces_the_trigger() {
    let (rig, _) = rig(500);
    add_aspirin(&rig.service);
    let reply = rig.service.handle_command(AppCommand::AddSchedule {
        id: Some("A1".into()),
        name: Some("Aspirin".into()),
        time: Some("09:15".into()),
        compartment: Some(3),
    });
    assert!(reply.is_success());

    let jobs = rig.scheduler.list_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].next_run, utc(9, 15, 0));
    assert_eq!(rig.scheduler.run_due(utc(8, 0, 0)), 0);
}

#[test]
fn down_through_the_trigger_is_not_backfilled() {
    let (rig, _) = rig(500);
    add_aspirin(&rig.service);

    // Process "wakes" at 11:00; the 08:00 dose is skipped.
    rig.clock.advance(TimeDelta::hours(3));
    assert_eq!(rig.scheduler.run_due(rig.clock.now()), 0);
    assert!(rig.sink.sent().is_empty());
    assert_eq!(rig.scheduler.list_jobs()[0].next_run, utc(8, 0, 0) + TimeDelta::days(1));
}

