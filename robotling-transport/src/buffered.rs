//! Callback-fed transport
//!
//! Some channels deliver bytes by callback rather than on request: a BLE
//! peripheral gets a GATT write event on its RX characteristic, and
//! answers by notifying on its TX characteristic. The callback pushes
//! bytes in with [`BufferedTransport::on_received`]; the link engine
//! drains them through the [`Transport`] interface.
//!
//! The buffer is not synchronized. If the callback runs in interrupt
//! context, guard the transport with the platform's critical section.

use heapless::Deque;
use robotling_hal::Transport;

/// Outgoing side of a callback-driven channel
pub trait Notify {
    /// Error type for notify operations
    type Error;

    /// Hand bytes to the peer (e.g. GATT notify to all connections)
    fn notify(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

/// Transport with a fixed-size receive ring of `N` bytes
pub struct BufferedTransport<S, const N: usize> {
    rx: Deque<u8, N>,
    sink: S,
    dropped: usize,
}

impl<S: Notify, const N: usize> BufferedTransport<S, N> {
    pub fn new(sink: S) -> Self {
        Self {
            rx: Deque::new(),
            sink,
            dropped: 0,
        }
    }

    /// Queue bytes received from the peer
    ///
    /// Returns the number of bytes accepted; bytes beyond the ring's
    /// capacity are dropped and counted.
    pub fn on_received(&mut self, data: &[u8]) -> usize {
        let mut accepted = 0;
        for &b in data {
            if self.rx.push_back(b).is_err() {
                break;
            }
            accepted += 1;
        }
        self.dropped += data.len() - accepted;
        accepted
    }

    /// Bytes waiting to be read
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Bytes lost to a full ring since creation
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

impl<S: Notify, const N: usize> Transport for BufferedTransport<S, N> {
    type Error = S::Error;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.sink.notify(data)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        for slot in buf.iter_mut() {
            match self.rx.pop_front() {
                Some(b) => {
                    *slot = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn has_data(&mut self) -> bool {
        !self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    #[derive(Default)]
    struct Captured(Vec<u8>);

    impl Notify for Captured {
        type Error = ();

        fn notify(&mut self, data: &[u8]) -> Result<(), ()> {
            self.0.extend_from_slice(data);
            Ok(())
        }
    }

    struct Disconnected;

    impl Notify for Disconnected {
        type Error = &'static str;

        fn notify(&mut self, _data: &[u8]) -> Result<(), Self::Error> {
            Err("no central connected")
        }
    }

    #[test]
    fn test_received_bytes_are_readable() {
        let mut t: BufferedTransport<Captured, 16> = BufferedTransport::new(Captured::default());
        assert!(!t.has_data());
        assert_eq!(t.on_received(b"<0102;"), 6);
        assert!(t.has_data());

        let mut buf = [0u8; 4];
        assert_eq!(t.read_available(&mut buf), Ok(4));
        assert_eq!(&buf, b"<010");
        assert_eq!(t.read_available(&mut buf), Ok(2));
        assert_eq!(&buf[..2], b"2;");
        assert_eq!(t.read_available(&mut buf), Ok(0));
    }

    #[test]
    fn test_overflow_is_counted() {
        let mut t: BufferedTransport<Captured, 4> = BufferedTransport::new(Captured::default());
        assert_eq!(t.on_received(b"abcdef"), 4);
        assert_eq!(t.dropped(), 2);
        assert_eq!(t.pending(), 4);
    }

    #[test]
    fn test_write_goes_to_sink() {
        let mut t: BufferedTransport<Captured, 4> = BufferedTransport::new(Captured::default());
        t.write(b">ab;").unwrap();
        t.write(b">cd;").unwrap();
        assert_eq!(t.sink().0, b">ab;>cd;");
    }

    #[test]
    fn test_sink_error_propagates() {
        let mut t: BufferedTransport<Disconnected, 4> = BufferedTransport::new(Disconnected);
        assert_eq!(t.write(b">;"), Err("no central connected"));
    }
}
