//! UART link to the GSM modem over the `serialport` crate.

use std::io::{self, Read, Write};
use std::time::Duration;

use log::{error, info, warn};

use crate::config::ModemConfig;
use crate::modem::{Modem, SerialLink};

pub struct SerialportLink {
    port: Box<dyn serialport::SerialPort>,
    /// Configured idle timeout; the longest a read ever waits.
    idle: Duration,
    /// Timeout currently set on the port.
    current: Duration,
}

impl SerialportLink {
    pub fn open(cfg: &ModemConfig) -> Result<Self, serialport::Error> {
        let port = serialport::new(&cfg.port, cfg.baud_rate)
            .timeout(cfg.read_timeout())
            .open()?;
        Ok(Self {
            port,
            idle: cfg.read_timeout(),
            current: cfg.read_timeout(),
        })
    }
}

impl SerialLink for SerialportLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            other => other,
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        Write::write_all(&mut self.port, data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.port)
    }

    fn limit_read_wait(&mut self, wait: Duration) -> io::Result<()> {
        let wait = wait.min(self.idle);
        if wait != self.current {
            self.port.set_timeout(wait)?;
            self.current = wait;
        }
        Ok(())
    }
}

/// Open the modem port, or hand back an unavailable [`Modem`].
pub fn init_modem(cfg: &ModemConfig) -> Modem {
    match SerialportLink::open(cfg) {
        Ok(link) => {
            info!("Modem: {} open at {} baud", cfg.port, cfg.baud_rate);
            Modem::new(Box::new(link), cfg)
        }
        Err(e) => {
            error!("Modem: cannot open {}: {}", cfg.port, e);
            warn!("Modem: SMS and calls will fail until restart");
            Modem::unavailable(cfg)
        }
    }
}
