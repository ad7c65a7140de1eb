//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                  |
//! |----------------|--------------------|------------------------------|
//! | `config_file`  | ConfigPort         | JSON file on disk            |
//! | `hardware`     | ActuatorPort       | Servo pair / stub            |
//! | `log_sink`     | NotificationSink   | `log` output                 |
//! | `notify_hub`   | NotificationSink   | Real-time subscribers        |
//! | `serial`       | SerialLink         | GSM modem UART (`serialport`)|
//! | `sysfs`        | SetDutyCycle       | `/sys/class/pwm`             |
//! |                | InputPin           | `/sys/class/gpio`            |
//! | `time`         | Clock              | System wall clock            |

pub mod config_file;
pub mod hardware;
pub mod log_sink;
pub mod notify_hub;
#[cfg(feature = "serial")]
pub mod serial;
pub mod sysfs;
pub mod time;
