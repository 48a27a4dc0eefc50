use plane_traits::PlaneError;
use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// How to open the sensor's serial port.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    /// Read and write timeout.
    pub timeout: Duration,
    /// The board resets when the port opens; wait this long before clearing.
    pub settle: Duration,
}

impl SerialSettings {
    pub fn new(port: &str) -> Self {
        SerialSettings {
            port: port.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::from_secs(1),
            settle: Duration::from_secs(2),
        }
    }
}

/// Device names of the serial ports present on this host.
pub fn available_ports() -> Result<Vec<String>, PlaneError> {
    let ports = serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect();
    Ok(ports)
}

/// Picks `requested` if given, otherwise the first port the host reports.
pub fn select_port(requested: Option<&str>) -> Result<String, PlaneError> {
    match requested {
        Some(port) if !port.trim().is_empty() => Ok(port.trim().to_string()),
        _ => available_ports()?
            .into_iter()
            .next()
            .ok_or(PlaneError::NoPortSelected),
    }
}

pub fn open(settings: &SerialSettings) -> Result<Box<dyn SerialPort>, PlaneError> {
    let port = serialport::new(&settings.port, settings.baud_rate)
        .timeout(settings.timeout)
        .open()?;
    info!("Opened port: {} at {} baud", settings.port, settings.baud_rate);

    if !settings.settle.is_zero() {
        debug!("Waiting {:?} for the board to settle", settings.settle);
        thread::sleep(settings.settle);
    }

    // Drop anything sent while the board was booting.
    port.clear(ClearBuffer::All)?;
    Ok(port)
}

/// Read half of an open port that never blocks for the full timeout.
///
/// Reads only what the driver already holds and reports `WouldBlock` when
/// that is nothing, so the reader thread can check for shutdown between polls.
pub struct SerialSource {
    port: Box<dyn SerialPort>,
}

impl SerialSource {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        SerialSource { port }
    }
}

impl Read for SerialSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let waiting = self.port.bytes_to_read().map_err(io::Error::from)? as usize;
        if waiting == 0 {
            return Err(io::Error::from(io::ErrorKind::WouldBlock));
        }
        let len = waiting.min(buf.len());
        self.port.read(&mut buf[..len])
    }
}
