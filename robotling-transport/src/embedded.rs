//! UART transport over `embedded-io`

use embedded_io::{Read, ReadReady, Write};
use robotling_hal::Transport;

/// Transport over a HAL serial driver
///
/// Reads only happen when the driver reports data ready, so the link
/// never blocks on an idle line.
pub struct EmbeddedIoTransport<T> {
    io: T,
}

impl<T> EmbeddedIoTransport<T> {
    pub fn new(io: T) -> Self {
        Self { io }
    }

    pub fn inner(&self) -> &T {
        &self.io
    }

    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.io
    }

    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: Read + Write + ReadReady> Transport for EmbeddedIoTransport<T> {
    type Error = T::Error;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.io.write_all(data)?;
        self.io.flush()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() || !self.io.read_ready()? {
            return Ok(0);
        }
        self.io.read(buf)
    }

    fn has_data(&mut self) -> bool {
        self.io.read_ready().unwrap_or(false)
    }
}
