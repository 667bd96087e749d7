// Serial link to the Minitel
//
// The device speaks 1200 baud, 7 data bits, even parity, 1 stop bit.
// All reads are short-timeout polls so that a power-off byte is never
// missed for long, whatever the session is currently doing.

use anyhow::{bail, Context, Result};
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

/// Poll interval for a single byte read.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Byte-oriented duplex channel to the terminal.
///
/// Abstracting the serial port behind this trait lets the tests drive the
/// whole stack from an in-memory script.
pub trait Link {
    /// Try to read one byte. `Ok(None)` means nothing arrived within the
    /// poll interval; that is the normal idle outcome, not an error.
    fn poll_byte(&mut self) -> Result<Option<u8>>;

    /// Write raw bytes to the device.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Discard anything queued in the receive buffer.
    fn clear_input(&mut self) -> Result<()>;
}

/// Physical serial connection to the Minitel.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Open `path` with the Minitel's fixed 7E1 framing.
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(path, baud)
            .data_bits(DataBits::Seven)
            .parity(Parity::Even)
            .stop_bits(StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()
            .with_context(|| format!("Failed to open serial port {}", path))?;
        tracing::info!(port = path, baud, "serial link open");
        Ok(SerialLink { port })
    }
}

impl Link for SerialLink {
    fn poll_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(None),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(e).context("serial read failed"),
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.port
            .write_all(bytes)
            .context("serial write failed")?;
        Ok(())
    }

    fn clear_input(&mut self) -> Result<()> {
        self.port
            .clear(ClearBuffer::Input)
            .context("failed to flush serial input buffer")?;
        Ok(())
    }
}

/// Find a plugged-in Minitel by scanning serial device names.
///
/// Returns the first port whose name matches the usual USB-serial adapter
/// prefixes for the current OS.
pub fn scan_ports() -> Result<String> {
    let prefixes: &[&str] = if cfg!(target_os = "macos") {
        &["/dev/cu.usbserial-", "/dev/cu.usbmodem"]
    } else if cfg!(target_os = "windows") {
        &["COM"]
    } else {
        &["/dev/ttyUSB", "/dev/ttyACM"]
    };

    let available = serialport::available_ports().context("serial port enumeration failed")?;
    for info in &available {
        tracing::debug!(port = %info.port_name, "serial port present");
    }

    for info in &available {
        if prefixes.iter().any(|p| info.port_name.starts_with(p)) {
            tracing::info!(port = %info.port_name, "Minitel candidate found");
            return Ok(info.port_name.clone());
        }
    }

    bail!("no serial port matching a known Minitel adapter prefix (try --port)")
}
