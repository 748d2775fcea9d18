//! Host serial port transport
//!
//! Talks to a board over a USB-serial adapter or a virtual COM port.

use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use robotling_hal::{DataBits, Parity, PollResult, StopBits, Transport, UartConfig};
use serialport::{ClearBuffer, SerialPort};

/// Interval between checks while polling
const POLL_STEP: Duration = Duration::from_millis(1);

/// Bytes a blocking read may wait for; matches the link's receive buffer
const READ_WINDOW: usize = 1024;

/// Transport over an OS serial port
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    config: UartConfig,
}

impl SerialTransport {
    /// Open `path` (e.g. `/dev/ttyUSB0` or `COM3`) with the given line settings
    ///
    /// Stale bytes in both directions are discarded.
    pub fn open(path: &str, config: UartConfig) -> Result<Self, serialport::Error> {
        let timeout_ms = config.transfer_time_ms(READ_WINDOW).max(10);
        let port = serialport::new(path, config.baudrate)
            .data_bits(data_bits(config.data_bits))
            .parity(parity(config.parity))
            .stop_bits(stop_bits(config.stop_bits))
            .timeout(Duration::from_millis(timeout_ms as u64))
            .open()?;
        port.clear(ClearBuffer::All)?;
        Ok(Self { port, config })
    }

    /// Wrap an already opened port
    pub fn from_port(port: Box<dyn SerialPort>, config: UartConfig) -> Self {
        Self { port, config }
    }

    pub fn config(&self) -> &UartConfig {
        &self.config
    }

    /// Name of the underlying port, if the OS reports one
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl Transport for SerialTransport {
    type Error = io::Error;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let waiting = self.port.bytes_to_read()? as usize;
        if waiting == 0 || buf.is_empty() {
            return Ok(0);
        }
        let n = waiting.min(buf.len());
        match self.port.read(&mut buf[..n]) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn has_data(&mut self) -> bool {
        self.port.bytes_to_read().map(|n| n > 0).unwrap_or(false)
    }

    fn poll(&mut self, timeout_ms: u32) -> PollResult {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms as u64);
        loop {
            if self.has_data() {
                return PollResult::Ready;
            }
            if Instant::now() >= deadline {
                return PollResult::TimedOut;
            }
            thread::sleep(POLL_STEP);
        }
    }
}

fn data_bits(bits: DataBits) -> serialport::DataBits {
    match bits {
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    }
}

fn parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Even => serialport::Parity::Even,
        Parity::Odd => serialport::Parity::Odd,
    }
}

fn stop_bits(bits: StopBits) -> serialport::StopBits {
    match bits {
        StopBits::One => serialport::StopBits::One,
        StopBits::Two => serialport::StopBits::Two,
    }
}
