//! Error taxonomy for the link
//!
//! [`ProtocolError`] covers everything the codec and frame buffer can
//! report. [`LinkError`] adds the outcomes of an exchange over a transport.

use core::fmt;

/// Codec and framing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// Token code is not one of the registered commands
    UnknownToken(u16),
    /// Too many parameter sets, too many values, or an invalid key
    InvalidParameterSet,
    /// Fewer bytes than the declared length
    Truncated,
    /// Hex or structural decode failure on an extracted frame
    CorruptFrame,
    /// Receive buffer filled up without a usable frame and was cleared
    BufferOverrun,
    /// Valid frame carrying a counter older than the one awaited
    StaleReply,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownToken(code) => write!(f, "unknown token {}", code),
            ProtocolError::InvalidParameterSet => f.write_str("invalid parameter set"),
            ProtocolError::Truncated => f.write_str("message truncated"),
            ProtocolError::CorruptFrame => f.write_str("corrupt frame"),
            ProtocolError::BufferOverrun => f.write_str("receive buffer overrun"),
            ProtocolError::StaleReply => f.write_str("stale reply"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}

/// Outcome of a failed send or receive
///
/// `E` is the transport's own error type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError<E> {
    /// Encoding the outgoing message failed
    Protocol(ProtocolError),
    /// A reply arrived for a counter the engine has not sent yet
    MissedExpectedCount { expected: u16, received: u16 },
    /// No matching reply before the deadline
    Timeout,
    /// Transport write failed
    Send(E),
    /// Transport read failed
    Receive(E),
}

impl<E> From<ProtocolError> for LinkError<E> {
    fn from(err: ProtocolError) -> Self {
        LinkError::Protocol(err)
    }
}

impl<E: fmt::Debug> fmt::Display for LinkError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Protocol(err) => write!(f, "protocol error: {}", err),
            LinkError::MissedExpectedCount { expected, received } => write!(
                f,
                "reply counter {} is ahead of expected {}",
                received, expected
            ),
            LinkError::Timeout => f.write_str("timed out waiting for reply"),
            LinkError::Send(err) => write!(f, "transport write failed: {:?}", err),
            LinkError::Receive(err) => write!(f, "transport read failed: {:?}", err),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for LinkError<E> {}
