use std::io::Write;
use std::time::Duration;

use parking_lot::Mutex;
use serialport::{DataBits, Parity, SerialPort, StopBits};
use thiserror::Error;

use super::frame::UNIVERSE_SIZE;
use super::DmxOutput;

/// Conventional DMX512 line rate: 250 kbaud, 8 data bits, 2 stop bits,
/// no parity.
pub const DMX_BAUD_RATE: u32 = 250_000;

/// Break duration. The protocol minimum is ~88us.
const BREAK_DURATION: Duration = Duration::from_micros(100);
/// Mark-after-break duration. The protocol minimum is ~4us.
const MARK_AFTER_BREAK: Duration = Duration::from_micros(12);
/// Null start code: the packet carries plain dimmer data.
const START_CODE: u8 = 0x00;
/// Bounded I/O timeout so a stalled device cannot block playback forever.
const IO_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("serial break control failed: {0}")]
    Break(#[from] serialport::Error),
    #[error("serial write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// The raw line operations a DMX transmission needs. Implemented for the
/// serialport handle; tests substitute a recording link.
pub(crate) trait SerialLink: Send {
    fn set_break(&mut self) -> Result<(), TransportError>;
    fn clear_break(&mut self) -> Result<(), TransportError>;
    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError>;
    fn flush(&mut self) -> Result<(), TransportError>;
}

impl SerialLink for Box<dyn SerialPort> {
    fn set_break(&mut self) -> Result<(), TransportError> {
        (**self).set_break().map_err(TransportError::Break)
    }

    fn clear_break(&mut self) -> Result<(), TransportError> {
        (**self).clear_break().map_err(TransportError::Break)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        Write::write_all(&mut **self, buf).map_err(TransportError::Write)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Write::flush(&mut **self).map_err(TransportError::Write)
    }
}

/// Owns the physical serial link and turns logical frames into wire-exact
/// DMX512 transmissions.
///
/// The mutex guards the whole break/mark/data sequence of a `send`, so
/// players sharing one transmitter interleave at frame granularity and the
/// bus never observes two senders' bytes mixed mid-packet. There is no
/// per-channel merging: each `send` overwrites the whole universe, and with
/// two concurrently active players the last writer wins.
pub struct DmxTransmitter {
    port_name: String,
    baud_rate: u32,
    link: Mutex<Option<Box<dyn SerialLink>>>,
}

impl DmxTransmitter {
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        DmxTransmitter {
            port_name: port_name.into(),
            baud_rate,
            link: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_link(link: Box<dyn SerialLink>) -> Self {
        DmxTransmitter {
            port_name: "mock".to_string(),
            baud_rate: DMX_BAUD_RATE,
            link: Mutex::new(Some(link)),
        }
    }

    /// Acquire the serial transport. On failure the transmitter stays
    /// closed; there is no automatic retry.
    pub fn open(&self) -> Result<(), TransportError> {
        let port = serialport::new(&self.port_name, self.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::Two)
            .parity(Parity::None)
            .timeout(IO_TIMEOUT)
            .open()
            .map_err(|source| TransportError::Open {
                port: self.port_name.clone(),
                source,
            })?;

        *self.link.lock() = Some(Box::new(port));
        log::info!(
            "opened serial port {} at {} baud",
            self.port_name,
            self.baud_rate
        );
        Ok(())
    }

    /// Release the serial transport. Idempotent.
    pub fn close(&self) {
        if self.link.lock().take().is_some() {
            log::info!("closed serial port {}", self.port_name);
        }
    }

    pub fn is_open(&self) -> bool {
        self.link.lock().is_some()
    }

    /// Transmit one universe frame: break, mark-after-break, start code,
    /// then up to 512 channel bytes (longer frames are truncated). A no-op
    /// with a log message when the port is not open. A write failure drops
    /// the handle; the transmitter stays unusable until an explicit reopen.
    pub fn send(&self, channels: &[u8]) {
        let mut guard = self.link.lock();
        let Some(link) = guard.as_mut() else {
            log::warn!("serial port is not open, dropping DMX frame");
            return;
        };

        if let Err(e) = transmit(link.as_mut(), channels) {
            log::error!("error sending DMX frame on {}: {}", self.port_name, e);
            *guard = None;
        }
    }
}

fn transmit(link: &mut dyn SerialLink, channels: &[u8]) -> Result<(), TransportError> {
    link.set_break()?;
    std::thread::sleep(BREAK_DURATION);
    link.clear_break()?;
    std::thread::sleep(MARK_AFTER_BREAK);

    let data = &channels[..channels.len().min(UNIVERSE_SIZE)];
    let mut packet = Vec::with_capacity(data.len() + 1);
    packet.push(START_CODE);
    packet.extend_from_slice(data);

    link.write_all(&packet)?;
    link.flush()?;

    log::debug!("sent DMX frame with {} channels", data.len());
    Ok(())
}

impl DmxOutput for DmxTransmitter {
    fn send(&self, channels: &[u8]) {
        DmxTransmitter::send(self, channels);
    }

    fn is_open(&self) -> bool {
        DmxTransmitter::is_open(self)
    }
}
