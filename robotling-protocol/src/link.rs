//! Request/reply correlation over a byte transport
//!
//! [`LinkEngine`] owns the transport, the inbound [`FrameBuffer`] and the
//! outgoing counter. One engine is driven from one execution context;
//! there is no internal locking.
//!
//! While awaiting a reply with counter `E`, each decoded frame with
//! counter `R` is classified by the wrapping distance `R - E`:
//!
//! | `R - E` (as `i16`) | Outcome                                  |
//! |--------------------|------------------------------------------|
//! | `0`                | the reply, returned to the caller        |
//! | `< 0`              | stale, discarded, keep waiting           |
//! | `> 0`              | `MissedExpectedCount`, returned          |

use core::cmp::Ordering;

use robotling_hal::{Clock, PollResult, Transport};

use crate::codec::{self, Direction};
use crate::config::{LinkConfig, Role};
use crate::error::{LinkError, ProtocolError};
use crate::frame::FrameBuffer;
use crate::message::Message;

/// Bytes read from the transport per pass
const READ_CHUNK: usize = 64;

/// Order a received counter relative to an expected one, across wraparound
pub fn counter_order(received: u16, expected: u16) -> Ordering {
    (received.wrapping_sub(expected) as i16).cmp(&0)
}

/// Exchange state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// No outstanding request
    Idle,
    /// A request was sent and its reply is awaited
    AwaitingReply { counter: u16 },
}

/// A successfully received message
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Received {
    /// Reply carrying the awaited counter
    Reply(Message),
    /// Message received while nothing was awaited
    Unsolicited(Message),
}

impl Received {
    pub fn message(&self) -> &Message {
        match self {
            Received::Reply(m) | Received::Unsolicited(m) => m,
        }
    }

    pub fn into_message(self) -> Message {
        match self {
            Received::Reply(m) | Received::Unsolicited(m) => m,
        }
    }
}

/// Running counters for link diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    pub frames_sent: u32,
    pub replies: u32,
    pub unsolicited: u32,
    pub stale_replies: u32,
    pub corrupt_frames: u32,
    pub overruns: u32,
    pub timeouts: u32,
}

/// Send/receive engine for one end of the link
pub struct LinkEngine<T, C> {
    transport: T,
    clock: C,
    config: LinkConfig,
    inbound: FrameBuffer,
    next_counter: u16,
    last_counter: Option<u16>,
    state: LinkState,
    last_message: Option<Message>,
    last_error: Option<ProtocolError>,
    stats: LinkStats,
}

impl<T: Transport, C: Clock> LinkEngine<T, C> {
    /// Create an engine that owns `transport`
    pub fn new(transport: T, clock: C, config: LinkConfig) -> Self {
        Self {
            transport,
            clock,
            config,
            inbound: FrameBuffer::new(config.role.inbound()),
            next_counter: 0,
            last_counter: None,
            state: LinkState::Idle,
            last_message: None,
            last_error: None,
            stats: LinkStats::default(),
        }
    }

    pub fn role(&self) -> Role {
        self.config.role
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Counter assigned to the most recent outgoing message
    pub fn last_counter(&self) -> Option<u16> {
        self.last_counter
    }

    /// Copy of the most recently received message
    pub fn last_message(&self) -> Option<Message> {
        self.last_message.clone()
    }

    /// Most recent non-fatal error absorbed while receiving
    pub fn last_error(&self) -> Option<ProtocolError> {
        self.last_error
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give back the transport and clock
    pub fn into_parts(self) -> (T, C) {
        (self.transport, self.clock)
    }

    /// Take the next outgoing counter (post-increment, wraps)
    pub fn next_counter(&mut self) -> u16 {
        let counter = self.next_counter;
        self.next_counter = counter.wrapping_add(1);
        self.last_counter = Some(counter);
        counter
    }

    /// Continue numbering from `next`, e.g. after `MissedExpectedCount`
    pub fn resync_counter(&mut self, next: u16) {
        debug!("counter resync {} -> {}", self.next_counter, next);
        self.next_counter = next;
    }

    /// Send a message, optionally waiting up to `timeout_ms` for its reply
    ///
    /// Returns `Ok(None)` for fire-and-forget sends.
    pub fn send(
        &mut self,
        mut message: Message,
        await_reply: bool,
        timeout_ms: u32,
    ) -> Result<Option<Message>, LinkError<T::Error>> {
        message.token().validate()?;

        let counter = self.next_counter();
        message.set_counter(counter);
        self.write_message(&message, self.config.role.outbound())?;
        if !await_reply {
            return Ok(None);
        }

        self.state = LinkState::AwaitingReply { counter };
        let deadline = self.clock.now_ms().saturating_add(timeout_ms as u64);
        if self.transport.poll(timeout_ms) == PollResult::TimedOut {
            trace!("poll timed out awaiting counter {}", counter);
        }
        self.receive(Some(counter), deadline)
            .map(|received| Some(received.into_message()))
    }

    /// Send a message and wait for its reply with the configured timeout
    pub fn request(&mut self, message: Message) -> Result<Message, LinkError<T::Error>> {
        let timeout = self.config.default_timeout_ms;
        match self.send(message, true, timeout)? {
            Some(reply) => Ok(reply),
            None => Err(LinkError::Timeout),
        }
    }

    /// Answer `request`, reusing its counter so the peer can pair them
    pub fn reply(
        &mut self,
        request: &Message,
        mut reply: Message,
    ) -> Result<(), LinkError<T::Error>> {
        reply.token().validate()?;
        reply.set_counter(request.counter());
        self.write_message(&reply, self.config.role.outbound())
    }

    /// Wait until `deadline_ms` for a message
    ///
    /// With `expected` set, only the frame carrying that counter ends the
    /// wait successfully. Without it, the first valid frame is returned as
    /// unsolicited. Whatever the transport already holds is read and
    /// scanned before the deadline is checked, even if it has already
    /// passed.
    pub fn receive(
        &mut self,
        expected: Option<u16>,
        deadline_ms: u64,
    ) -> Result<Received, LinkError<T::Error>> {
        if let Some(counter) = expected {
            self.state = LinkState::AwaitingReply { counter };
        }
        let result = self.receive_until(expected, deadline_ms);
        self.state = LinkState::Idle;
        if let Err(LinkError::Timeout) = result {
            self.stats.timeouts = self.stats.timeouts.saturating_add(1);
            warn!("timed out awaiting counter {:?}", expected);
        }
        result
    }

    /// Non-blocking check for messages pushed by the peer
    ///
    /// Reads until a message is found or the transport has nothing left.
    pub fn poll_unsolicited(&mut self) -> Result<Option<Message>, LinkError<T::Error>> {
        loop {
            let read = self.pump()?;
            if let Some(message) = self.next_inbound() {
                return Ok(self
                    .classify(message, None)?
                    .map(Received::into_message));
            }
            if read == 0 || !self.transport.has_data() {
                return Ok(None);
            }
        }
    }

    fn receive_until(
        &mut self,
        expected: Option<u16>,
        deadline_ms: u64,
    ) -> Result<Received, LinkError<T::Error>> {
        loop {
            // Drain everything the transport holds before checking the deadline
            loop {
                let read = self.pump()?;
                while let Some(message) = self.next_inbound() {
                    if let Some(received) = self.classify(message, expected)? {
                        return Ok(received);
                    }
                }
                if read == 0 || !self.transport.has_data() {
                    break;
                }
            }

            let now = self.clock.now_ms();
            if now >= deadline_ms {
                return Err(LinkError::Timeout);
            }
            if !self.transport.has_data() {
                let slice = (deadline_ms - now).min(self.config.poll_slice_ms as u64);
                let _ = self.transport.poll(slice as u32);
            }
        }
    }

    fn write_message(
        &mut self,
        message: &Message,
        direction: Direction,
    ) -> Result<(), LinkError<T::Error>> {
        let frame = codec::to_wire(message, direction)?;
        self.transport.write(&frame).map_err(LinkError::Send)?;
        self.stats.frames_sent = self.stats.frames_sent.saturating_add(1);
        trace!("sent {:?} counter {}", message.token(), message.counter());
        Ok(())
    }

    /// Move one chunk of available bytes into the frame buffer
    ///
    /// Returns the number of bytes read.
    fn pump(&mut self) -> Result<usize, LinkError<T::Error>> {
        if !self.transport.has_data() {
            return Ok(0);
        }
        let mut buf = [0u8; READ_CHUNK];
        let n = self.transport.read_available(&mut buf).map_err(|err| {
            error!("transport read failed");
            LinkError::Receive(err)
        })?;
        if let Err(err) = self.inbound.feed(&buf[..n]) {
            self.absorb(err);
        }
        Ok(n)
    }

    /// Next decodable message in the buffer; bad frames are absorbed
    fn next_inbound(&mut self) -> Option<Message> {
        loop {
            match self.inbound.try_extract() {
                Ok(Some(raw)) => match raw.decode() {
                    Ok(message) => return Some(message),
                    Err(err) => self.absorb(err),
                },
                Ok(None) => return None,
                Err(err) => self.absorb(err),
            }
        }
    }

    fn classify(
        &mut self,
        message: Message,
        expected: Option<u16>,
    ) -> Result<Option<Received>, LinkError<T::Error>> {
        let received = message.counter();
        let Some(expected) = expected else {
            trace!("unsolicited {:?} counter {}", message.token(), received);
            self.stats.unsolicited = self.stats.unsolicited.saturating_add(1);
            self.last_message = Some(message.clone());
            return Ok(Some(Received::Unsolicited(message)));
        };

        match counter_order(received, expected) {
            Ordering::Equal => {
                trace!("reply {:?} counter {}", message.token(), received);
                self.stats.replies = self.stats.replies.saturating_add(1);
                self.last_message = Some(message.clone());
                Ok(Some(Received::Reply(message)))
            }
            Ordering::Less => {
                debug!("stale reply counter {} (awaiting {})", received, expected);
                self.absorb(ProtocolError::StaleReply);
                Ok(None)
            }
            Ordering::Greater => {
                warn!("reply counter {} ahead of {}", received, expected);
                Err(LinkError::MissedExpectedCount { expected, received })
            }
        }
    }

    fn absorb(&mut self, err: ProtocolError) {
        match err {
            ProtocolError::StaleReply => {
                self.stats.stale_replies = self.stats.stale_replies.saturating_add(1);
            }
            ProtocolError::BufferOverrun => {
                warn!("receive buffer overrun, pending bytes dropped");
                self.stats.overruns = self.stats.overruns.saturating_add(1);
            }
            _ => {
                warn!("dropping bad frame: {:?}", err);
                self.stats.corrupt_frames = self.stats.corrupt_frames.saturating_add(1);
            }
        }
        self.last_error = Some(err);
    }
}
