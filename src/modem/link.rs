//! Serial link abstraction: any byte-oriented channel to the modem.
//!
//! Concrete implementations:
//! - UART via the `serialport` crate ([`SerialportLink`](crate::adapters::serial::SerialportLink))
//! - scripted links in tests
//!
//! The protocol engine owns a `Box<dyn SerialLink>`, so swapping the
//! physical link requires no changes to the AT logic.

use std::io;
use std::time::Duration;

/// Byte-oriented serial channel.
pub trait SerialLink: Send {
    /// Read up to `buf.len()` bytes into `buf`.
    ///
    /// Blocks for at most the link's read timeout and returns `Ok(0)` if
    /// nothing arrived in that window.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `data`.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush any buffered output.
    fn flush(&mut self) -> io::Result<()>;

    /// Cap the next read's wait at `wait` so a transaction deadline is
    /// not overshot by a full read timeout.  Links whose reads return
    /// promptly can ignore this.
    fn limit_read_wait(&mut self, _wait: Duration) -> io::Result<()> {
        Ok(())
    }
}

impl<L: SerialLink + ?Sized> SerialLink for Box<L> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn limit_read_wait(&mut self, wait: Duration) -> io::Result<()> {
        (**self).limit_read_wait(wait)
    }
}
