//! AMAR controller: main entry point.
//!
//! Wires the adapters to the application core and runs the request loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  ServoActuators    SerialportLink   NotificationHub  SystemClock│
//! │  (ActuatorPort)    (SerialLink)     (Notification)   (Clock)   │
//! │  SysfsInput ──▶ ButtonWatcher ──▶ EmergencyQueue               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  JobScheduler ──▶ DispenseOrchestrator ──▶ ActuatorSequencer   │
//! │  EmergencyQueue ──▶ EmergencyPipeline ──▶ Modem                │
//! │  stdin ──▶ AppService ──▶ stdout                               │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests arrive as one JSON command per line on stdin; replies and
//! notifications leave as JSON lines on stdout.  Logs go to stderr.
//! EOF on stdin shuts the controller down.

use std::env;
use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tracing_subscriber::EnvFilter;

use amar::adapters::config_file::JsonFileConfig;
use amar::adapters::hardware::init_actuators;
use amar::adapters::log_sink::LogNotificationSink;
use amar::adapters::notify_hub::{FanOutSink, NotificationHub};
use amar::adapters::serial::init_modem;
use amar::adapters::sysfs::SysfsInput;
use amar::adapters::time::SystemClock;
use amar::app::dispense::DispenseOrchestrator;
use amar::app::emergency::EmergencyPipeline;
use amar::app::ports::{Clock, ConfigPort, NotificationSink};
use amar::app::service::AppService;
use amar::config::SystemConfig;
use amar::drivers::button::ButtonWatcher;
use amar::events::EmergencyQueue;
use amar::scheduler::JobScheduler;
use amar::sequencer::ActuatorSequencer;

const DEFAULT_CONFIG_PATH: &str = "/etc/amar/config.json";

// ── Static channels ───────────────────────────────────────────
//
// Both live for the whole process so their subscribers/consumers can be
// handed to plain `std::thread`s.

static NOTIFICATIONS: NotificationHub = NotificationHub::new();
static EMERGENCIES: EmergencyQueue = EmergencyQueue::new();

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Also installs the `log` → `tracing` bridge.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config() -> SystemConfig {
    let path = env::args()
        .nth(1)
        .or_else(|| env::var("AMAR_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    match JsonFileConfig::new(&path).load() {
        Ok(config) => config,
        Err(e) => {
            error!("Config: {} rejected: {}", path, e);
            warn!("Config: continuing on defaults");
            SystemConfig::default()
        }
    }
}

fn main() -> Result<()> {
    init_logging();
    info!("AMAR controller v{} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // ── Hardware ──────────────────────────────────────────────
    let sequencer = Arc::new(ActuatorSequencer::new(
        init_actuators(&config.hardware),
        &config.carousel,
    ));
    if let Err(e) = sequencer.home() {
        warn!("Homing failed: {}", e);
    }

    let modem = Arc::new(init_modem(&config.modem));
    modem.self_check();

    // ── Notifications ─────────────────────────────────────────
    let hub: Arc<dyn NotificationSink> = Arc::new(&NOTIFICATIONS);
    let log_sink: Arc<dyn NotificationSink> = Arc::new(LogNotificationSink);
    let sink: Arc<dyn NotificationSink> = Arc::new(FanOutSink::new(vec![hub, log_sink]));
    let mut printer = NOTIFICATIONS
        .subscribe()
        .context("no notification subscriber slot")?;
    thread::Builder::new()
        .name("notify-out".into())
        .spawn(move || {
            loop {
                println!("{}", printer.recv().to_json());
            }
        })
        .context("spawning notification printer")?;

    // ── Dispensing ────────────────────────────────────────────
    let orchestrator = Arc::new(DispenseOrchestrator::new(
        Arc::clone(&sequencer),
        Arc::clone(&sink),
        Arc::clone(&clock),
    ));
    let scheduler = Arc::new(JobScheduler::new(Arc::clone(&clock), &config.scheduler));
    scheduler.start().context("spawning scheduler")?;

    // ── Emergency ─────────────────────────────────────────────
    let pipeline = Arc::new(EmergencyPipeline::new(
        Arc::clone(&sink),
        Arc::clone(&modem),
        &config.emergency,
    ));
    let consumer = pipeline
        .spawn_consumer(&EMERGENCIES)
        .context("spawning emergency consumer")?;

    let stop = Arc::new(AtomicBool::new(false));
    let button = match SysfsInput::open(config.hardware.button_gpio) {
        Ok(pin) => Some(
            ButtonWatcher::new(pin)
                .spawn(
                    Duration::from_millis(config.hardware.button_poll_ms),
                    &EMERGENCIES,
                    Arc::clone(&clock),
                    Arc::clone(&stop),
                )
                .context("spawning button watcher")?,
        ),
        Err(e) => {
            error!("Button: gpio{} unavailable: {}", config.hardware.button_gpio, e);
            warn!("Button: emergency escalation disabled");
            None
        }
    };

    // ── Request loop ──────────────────────────────────────────
    let service = AppService::new(Arc::clone(&scheduler), orchestrator, Arc::clone(&clock));
    info!("AMAR controller ready");
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        println!("{}", service.handle_json(&line).to_json());
    }

    // ── Shutdown ──────────────────────────────────────────────
    info!("Shutting down");
    scheduler.stop();
    stop.store(true, Ordering::Relaxed);
    if let Some(button) = button {
        let _ = button.join();
    }
    EMERGENCIES.close();
    let _ = consumer.join();
    sequencer.release();
    Ok(())
}
