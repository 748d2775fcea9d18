//! Byte-level duplex channel abstraction
//!
//! A transport moves raw bytes. It is not required to preserve message
//! boundaries: a write may arrive at the peer split across several reads,
//! or coalesced with a neighbouring write.

/// Outcome of [`Transport::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollResult {
    /// Data is waiting to be read
    Ready,
    /// The timeout elapsed with nothing to read
    TimedOut,
    /// The channel has no blocking wait primitive
    Unsupported,
}

/// Byte-oriented, non-blocking duplex channel
///
/// Exactly one owner issues writes; an interleaved write from elsewhere
/// would appear mid-frame to the peer.
pub trait Transport {
    /// Error type for channel operations
    type Error;

    /// Write all bytes to the channel
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Read whatever is currently available into `buf`
    ///
    /// Never blocks. Returns the number of bytes copied, which may be zero.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Returns true if at least one byte can be read without blocking
    fn has_data(&mut self) -> bool;

    /// Wait up to `timeout_ms` for incoming data
    ///
    /// Channels without a wait primitive keep the default, and callers
    /// fall back to checking a clock.
    fn poll(&mut self, _timeout_ms: u32) -> PollResult {
        PollResult::Unsupported
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        T::write(self, data)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        T::read_available(self, buf)
    }

    fn has_data(&mut self) -> bool {
        T::has_data(self)
    }

    fn poll(&mut self, timeout_ms: u32) -> PollResult {
        T::poll(self, timeout_ms)
    }
}
