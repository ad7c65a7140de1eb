//! Button → queue → pipeline → modem, against a scripted modem.

use std::sync::Arc;
use std::time::Duration;

use amar::app::emergency::{EmergencyPipeline, EscalationReport};
use amar::app::events::Notification;
use amar::config::EmergencyConfig;
use amar::events::{EmergencyEvent, EmergencyQueue};
use amar::modem::Modem;

use crate::mock_hw::{RecordingSink, ScriptedLink, quick_modem, utc, wire_text};

fn guardian() -> EmergencyConfig {
    EmergencyConfig {
        guardian_number: "+15550100".into(),
        message: "Help".into(),
    }
}

fn pipeline(modem: Modem) -> (Arc<EmergencyPipeline>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let p = EmergencyPipeline::new(sink.clone(), Arc::new(modem), &guardian());
    (Arc::new(p), sink)
}

fn press() -> EmergencyEvent {
    EmergencyEvent {
        timestamp: utc(3, 14, 15),
    }
}

#[test]
fn press_notifies_then_texts_then_calls() {
    let (link, written) = ScriptedLink::new(&[b"OK\r\n", b"> ", b"OK\r\n", b"OK\r\n"]);
    let (p, sink) = pipeline(Modem::new(Box::new(link), &quick_modem()));

    let report = p.handle(&press());
    assert_eq!(
        report,
        EscalationReport {
            sms_sent: true,
            call_placed: true
        }
    );
    assert_eq!(
        sink.sent(),
        [Notification::Emergency {
            timestamp: "2026-03-14 03:14:15".into()
        }]
    );
    assert_eq!(
        wire_text(&written),
        "AT+CMGF=1\r\nAT+CMGS=\"+15550100\"\r\nHelp\u{1a}\r\nATD+15550100;\r\n"
    );
}

#[test]
fn call_is_placed_even_when_sms_fails() {
    // Text mode refused; dial accepted.
    let (link, written) = ScriptedLink::new(&[b"ERROR\r\n", b"OK\r\n"]);
    let (p, _) = pipeline(Modem::new(Box::new(link), &quick_modem()));

    let report = p.handle(&press());
    assert!(!report.sms_sent);
    assert!(report.call_placed);
    assert_eq!(wire_text(&written), "AT+CMGF=1\r\nATD+15550100;\r\n");
}

#[test]
fn missing_modem_still_notifies() {
    let (p, sink) = pipeline(Modem::unavailable(&quick_modem()));
    let report = p.handle(&press());
    assert!(!report.sms_sent && !report.call_placed);
    assert_eq!(sink.names(), ["emergency"]);
}

#[test]
fn consumer_drains_queue_until_closed() {
    static QUEUE: EmergencyQueue = EmergencyQueue::new();
    let (p, sink) = pipeline(Modem::unavailable(&quick_modem()));
    let consumer = p.spawn_consumer(&QUEUE).unwrap();

    assert!(QUEUE.raise(press()));
    assert!(QUEUE.raise(press()));
    let sent = sink.wait_for(2, Duration::from_secs(2));
    assert_eq!(sent.len(), 2);

    QUEUE.close();
    consumer.join().unwrap();
}
