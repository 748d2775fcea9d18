//! Frame extraction from a raw byte stream
//!
//! The transport may split a frame across many reads or coalesce several
//! frames into one. [`FrameBuffer`] accumulates bytes and hands out one
//! delimited candidate at a time:
//!
//! ```text
//!   garbage  >  hex…  ;  junk  >  hex…  ;  >  hex (still arriving)
//!   └ dropped ┴ frame 1 ┴ dropped ┴ frame 2 ┴ kept in pending ┘
//! ```

use heapless::Vec;

use crate::codec::{self, Direction, END_MARKER, MAX_FRAME_LEN, MIN_FRAME_LEN};
use crate::error::ProtocolError;
use crate::message::Message;

/// Capacity of the pending byte buffer
pub const PENDING_CAPACITY: usize = 1024;

/// A delimited candidate frame, markers included, not yet decoded
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawFrame {
    bytes: Vec<u8, MAX_FRAME_LEN>,
}

impl RawFrame {
    /// Wire bytes from start marker to terminator
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode the candidate into a message
    pub fn decode(&self) -> Result<Message, ProtocolError> {
        codec::from_wire(&self.bytes)
    }
}

/// Accumulates transport bytes and extracts frames
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pending: Vec<u8, PENDING_CAPACITY>,
    start: u8,
    overruns: u32,
}

impl FrameBuffer {
    /// Create a buffer that extracts frames travelling in `inbound` direction
    pub fn new(inbound: Direction) -> Self {
        Self {
            pending: Vec::new(),
            start: inbound.marker(),
            overruns: 0,
        }
    }

    /// Bytes waiting to be framed
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of times the buffer had to be discarded
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Drop everything pending
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Append bytes read from the transport
    ///
    /// When the bytes do not fit, leading garbage before the first start
    /// marker is dropped. If that is not enough the buffer is cleared and
    /// `BufferOverrun` is returned; the newest bytes are still kept.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let mut overrun = false;

        if self.pending.len() + bytes.len() > PENDING_CAPACITY {
            match self.find_start(0) {
                Some(first) => self.consume(first),
                None => {
                    self.pending.clear();
                    overrun = true;
                }
            }
        }
        if self.pending.len() + bytes.len() > PENDING_CAPACITY {
            self.pending.clear();
            overrun = true;
        }

        let tail = if bytes.len() > PENDING_CAPACITY {
            overrun = true;
            &bytes[bytes.len() - PENDING_CAPACITY..]
        } else {
            bytes
        };
        // Cannot fail: room was made above
        let _ = self.pending.extend_from_slice(tail);

        if overrun {
            self.overruns = self.overruns.saturating_add(1);
            Err(ProtocolError::BufferOverrun)
        } else {
            Ok(())
        }
    }

    /// Extract the next candidate frame, if a complete one is buffered
    ///
    /// Returns `Ok(None)` when more bytes are needed. On error the bad
    /// bytes have already been consumed, so calling again makes progress.
    pub fn try_extract(&mut self) -> Result<Option<RawFrame>, ProtocolError> {
        loop {
            if self.pending.len() < MIN_FRAME_LEN {
                return Ok(None);
            }

            let Some(first) = self.find_start(0) else {
                if self.pending.is_full() {
                    self.pending.clear();
                    self.overruns = self.overruns.saturating_add(1);
                    return Err(ProtocolError::BufferOverrun);
                }
                return Ok(None);
            };

            let body = first + 1;
            let next = self.find_start(body);
            let segment_end = next.unwrap_or(self.pending.len());

            if segment_end == body {
                // Empty segment between consecutive start markers
                self.consume(body);
                continue;
            }

            let end = self.pending[body..segment_end]
                .iter()
                .position(|&b| b == END_MARKER)
                .map(|i| body + i);

            match (end, next) {
                (Some(end), _) => {
                    let frame = Vec::from_slice(&self.pending[first..=end]);
                    self.consume(segment_end);
                    return match frame {
                        Ok(bytes) => Ok(Some(RawFrame { bytes })),
                        Err(_) => Err(ProtocolError::CorruptFrame),
                    };
                }
                (None, Some(next)) => {
                    // Frame abandoned: a new one started before it ended
                    self.consume(next);
                    return Err(ProtocolError::CorruptFrame);
                }
                (None, None) => {
                    if segment_end - first >= MAX_FRAME_LEN {
                        // Runaway frame that can never be valid
                        self.pending.clear();
                        return Err(ProtocolError::CorruptFrame);
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Extract and decode the next frame
    pub fn next_message(&mut self) -> Result<Option<Message>, ProtocolError> {
        match self.try_extract()? {
            Some(raw) => raw.decode().map(Some),
            None => Ok(None),
        }
    }

    fn find_start(&self, from: usize) -> Option<usize> {
        self.pending[from..]
            .iter()
            .position(|&b| b == self.start)
            .map(|i| from + i)
    }

    /// Remove the first `n` bytes
    fn consume(&mut self, n: usize) {
        let len = self.pending.len();
        let n = n.min(len);
        self.pending.copy_within(n.., 0);
        self.pending.truncate(len - n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{to_wire, WireFrame};
    use crate::token::Token;

    fn reply(counter: u16) -> Message {
        Message::new(Token::STATUS)
            .with_data('S', &[1, 2, 3])
            .unwrap()
            .with_counter(counter)
    }

    fn wire(counter: u16) -> WireFrame {
        to_wire(&reply(counter), Direction::Reply).unwrap()
    }

    #[test]
    fn test_extract_single_frame() {
        let mut buf = FrameBuffer::new(Direction::Reply);
        buf.feed(&wire(3)).unwrap();
        let raw = buf.try_extract().unwrap().unwrap();
        assert_eq!(raw.as_bytes(), &wire(3)[..]);
        assert_eq!(raw.decode().unwrap(), reply(3));
        assert!(buf.is_empty());
        assert_eq!(buf.try_extract(), Ok(None));
    }

    #[test]
    fn test_short_buffer_not_consumed() {
        let mut buf = FrameBuffer::new(Direction::Reply);
        buf.feed(b"<0400;").unwrap();
        assert_eq!(buf.try_extract(), Ok(None));
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn test_byte_at_a_time() {
        let frame = wire(9);
        let mut buf = FrameBuffer::new(Direction::Reply);
        for (i, &b) in frame.iter().enumerate() {
            buf.feed(&[b]).unwrap();
            let got = buf.try_extract().unwrap();
            if i + 1 < frame.len() {
                assert!(got.is_none(), "frame extracted early at byte {}", i);
            } else {
                assert_eq!(got.unwrap().decode().unwrap(), reply(9));
            }
        }
    }

    #[test]
    fn test_leading_garbage_dropped() {
        let mut buf = FrameBuffer::new(Direction::Reply);
        buf.feed(b"\r\nnoise 123").unwrap();
        buf.feed(&wire(1)).unwrap();
        assert_eq!(buf.next_message().unwrap(), Some(reply(1)));
    }

    #[test]
    fn test_coalesced_frames() {
        let mut buf = FrameBuffer::new(Direction::Reply);
        buf.feed(&wire(5)).unwrap();
        buf.feed(b"\n").unwrap();
        buf.feed(&wire(6)).unwrap();
        assert_eq!(buf.next_message().unwrap(), Some(reply(5)));
        assert_eq!(buf.next_message().unwrap(), Some(reply(6)));
        assert_eq!(buf.next_message().unwrap(), None);
    }

    #[test]
    fn test_empty_segments_skipped() {
        let mut buf = FrameBuffer::new(Direction::Reply);
        buf.feed(b"<<<").unwrap();
        buf.feed(&wire(2)).unwrap();
        assert_eq!(buf.next_message().unwrap(), Some(reply(2)));
    }

    #[test]
    fn test_other_direction_ignored() {
        let request = to_wire(&reply(4), Direction::Request).unwrap();
        let mut buf = FrameBuffer::new(Direction::Reply);
        buf.feed(&request).unwrap();
        assert_eq!(buf.try_extract(), Ok(None));
    }

    #[test]
    fn test_corrupt_then_valid() {
        let mut buf = FrameBuffer::new(Direction::Reply);
        buf.feed(b"<0400zz00090001005300030001000200;").unwrap();
        buf.feed(&wire(8)).unwrap();
        assert_eq!(buf.next_message(), Err(ProtocolError::CorruptFrame));
        assert_eq!(buf.next_message().unwrap(), Some(reply(8)));
    }

    #[test]
    fn test_abandoned_frame_skipped() {
        let frame = wire(11);
        let mut buf = FrameBuffer::new(Direction::Reply);
        buf.feed(&frame[..10]).unwrap();
        buf.feed(&frame).unwrap();
        assert_eq!(buf.try_extract(), Err(ProtocolError::CorruptFrame));
        assert_eq!(buf.next_message().unwrap(), Some(reply(11)));
    }

    #[test]
    fn test_partial_frame_kept_after_extract() {
        let first = wire(1);
        let second = wire(2);
        let mut buf = FrameBuffer::new(Direction::Reply);
        buf.feed(&first).unwrap();
        buf.feed(&second[..7]).unwrap();
        assert_eq!(buf.next_message().unwrap(), Some(reply(1)));
        assert_eq!(buf.len(), 7);
        buf.feed(&second[7..]).unwrap();
        assert_eq!(buf.next_message().unwrap(), Some(reply(2)));
    }

    #[test]
    fn test_overrun_without_start_marker() {
        let mut buf = FrameBuffer::new(Direction::Reply);
        let noise = [b'x'; 600];
        buf.feed(&noise).unwrap();
        assert_eq!(buf.try_extract(), Ok(None));
        assert_eq!(buf.feed(&noise), Err(ProtocolError::BufferOverrun));
        assert_eq!(buf.overruns(), 1);
        assert_eq!(buf.len(), 600);

        // The line recovers once a frame arrives
        buf.clear();
        buf.feed(&wire(3)).unwrap();
        assert_eq!(buf.next_message().unwrap(), Some(reply(3)));
    }

    #[test]
    fn test_full_buffer_without_marker_is_cleared() {
        let mut buf = FrameBuffer::new(Direction::Reply);
        buf.feed(&[b'x'; PENDING_CAPACITY]).unwrap();
        assert_eq!(buf.try_extract(), Err(ProtocolError::BufferOverrun));
        assert!(buf.is_empty());
        assert_eq!(buf.try_extract(), Ok(None));
    }

    #[test]
    fn test_feed_compacts_leading_garbage() {
        let mut buf = FrameBuffer::new(Direction::Reply);
        buf.feed(&[b'x'; 1000]).unwrap();
        let frame = wire(4);
        buf.feed(&frame[..1]).unwrap();
        // Would overflow: the garbage before the marker is dropped instead
        buf.feed(&frame[1..]).unwrap();
        assert_eq!(buf.len(), frame.len());
        assert_eq!(buf.next_message().unwrap(), Some(reply(4)));
    }

    #[test]
    fn test_runaway_frame_discarded() {
        let mut buf = FrameBuffer::new(Direction::Reply);
        buf.feed(b"<").unwrap();
        buf.feed(&[b'0'; MAX_FRAME_LEN]).unwrap();
        assert_eq!(buf.try_extract(), Err(ProtocolError::CorruptFrame));
        assert!(buf.is_empty());
    }
}
