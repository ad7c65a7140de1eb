//! Request validation and replies through `AppService`.

use std::sync::Arc;

use amar::adapters::hardware::StubActuators;
use amar::app::commands::{AppCommand, ReplyStatus};
use amar::app::dispense::DispenseOrchestrator;
use amar::app::service::AppService;
use amar::config::SchedulerConfig;
use amar::scheduler::JobScheduler;
use amar::sequencer::ActuatorSequencer;

use crate::mock_hw::{ManualClock, RecordingSink, quick_carousel};

fn service() -> (AppService, Arc<JobScheduler>) {
    let clock = Arc::new(ManualClock::at(12, 30, 45));
    let sequencer = Arc::new(ActuatorSequencer::new(Box::new(StubActuators), &quick_carousel()));
    let orch = Arc::new(DispenseOrchestrator::new(
        sequencer,
        Arc::new(RecordingSink::default()),
        clock.clone(),
    ));
    let scheduler = Arc::new(JobScheduler::new(clock.clone(), &SchedulerConfig::default()));
    (AppService::new(Arc::clone(&scheduler), orch, clock), scheduler)
}

#[test]
fn missing_fields_are_rejected() {
    let (svc, scheduler) = service();
    let reply = svc.handle_json(r#"{"command":"add_schedule","name":"Aspirin","compartment":3}"#);
    assert_eq!(reply.status, ReplyStatus::Error);
    assert!(reply.message.contains("time"), "{}", reply.message);
    assert!(scheduler.list_jobs().is_empty());

    let reply = svc.handle_command(AppCommand::ManualDispense { compartment: None });
    assert!(reply.message.contains("compartment"));
}

#[test]
fn absent_id_is_generated_from_timestamp() {
    let (svc, scheduler) = service();
    let reply = svc.handle_json(
        r#"{"command":"add_schedule","name":"Aspirin","time":"18:00","compartment":1}"#,
    );
    assert!(reply.is_success());
    assert_eq!(scheduler.list_jobs()[0].id, "2026-03-14 12:30:45");
}

#[test]
fn bad_time_and_compartment_are_invalid_input() {
    let (svc, _) = service();
    for (time, compartment) in [("7am", 1), ("08:00", 0), ("08:00", 8)] {
        let reply = svc.handle_command(AppCommand::AddSchedule {
            id: None,
            name: Some("X".into()),
            time: Some(time.into()),
            compartment: Some(compartment),
        });
        assert_eq!(reply.status, ReplyStatus::Error, "{time} / {compartment}");
        assert!(reply.message.starts_with("invalid input"));
    }
}

#[test]
fn list_reports_name_and_next_run() {
    let (svc, _) = service();
    svc.handle_json(r#"{"command":"add_schedule","id":"A1","name":"Aspirin","time":"08:00","compartment":3}"#);
    let reply = svc.handle_json(r#"{"command":"list_schedules"}"#);
    let schedules = reply.schedules.unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].id, "A1");
    assert_eq!(schedules[0].name, "Dispense 'Aspirin'");
    assert_eq!(schedules[0].next_run_time, "2026-03-15 08:00:00+00:00");
}

#[test]
fn remove_unknown_and_known() {
    let (svc, scheduler) = service();
    let reply = svc.handle_json(r#"{"command":"remove_schedule","id":"ghost"}"#);
    assert_eq!(reply.status, ReplyStatus::Error);

    svc.handle_json(r#"{"command":"add_schedule","id":"A1","name":"Aspirin","time":"08:00","compartment":3}"#);
    let reply = svc.handle_json(r#"{"command":"remove_schedule","id":"A1"}"#);
    assert!(reply.is_success());
    assert!(scheduler.list_jobs().is_empty());
}

#[test]
fn malformed_json_gets_error_reply() {
    let (svc, _) = service();
    for line in ["not json", r#"{"command":"reboot"}"#, r#"{"compartment":1}"#] {
        assert_eq!(svc.handle_json(line).status, ReplyStatus::Error, "{line}");
    }
}

#[test]
fn manual_dispense_is_acknowledged_immediately() {
    let (svc, _) = service();
    let reply = svc.handle_json(r#"{"command":"manual_dispense","compartment":2}"#);
    assert!(reply.is_success());
    assert_eq!(reply.message, "Manual dispense initiated");
}

#[test]
fn browser_form_payloads_are_accepted() {
    let (svc, scheduler) = service();
    let reply = svc.handle_json(
        r#"{"command":"add_schedule","id":1712345678901,"name":"Aspirin","time":"08:00","compartment":3}"#,
    );
    assert!(reply.is_success(), "{}", reply.message);
    let reply = svc.handle_json(
        r#"{"command":"add_schedule","id":"B2","name":"Ibuprofen","time":"20:00","compartment":"5"}"#,
    );
    assert!(reply.is_success(), "{}", reply.message);

    let ids: Vec<_> = scheduler.list_jobs().into_iter().map(|j| j.id).collect();
    assert_eq!(ids, vec!["B2", "1712345678901"]);

    let reply = svc.handle_json(r#"{"command":"remove_schedule","id":1712345678901}"#);
    assert!(reply.is_success(), "{}", reply.message);
    let reply = svc.handle_json(r#"{"command":"manual_dispense","compartment":"2"}"#);
    assert!(reply.is_success(), "{}", reply.message);
}
