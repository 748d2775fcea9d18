//! Robotling Hardware Abstraction Layer
//!
//! Capability traits the inter-board link is written against. The
//! protocol crate only ever sees these traits; each physical channel
//! (UART peripheral, BLE characteristic pair, OS serial port) provides
//! one implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  robotling-protocol (LinkEngine)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  robotling-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┼───────────┐
//!         ▼           ▼           ▼
//!     embedded-io   buffered    serialport
//!       UART        (BLE)       (host)
//! ```
//!
//! # Traits
//!
//! - [`transport::Transport`] - Byte-level duplex channel
//! - [`clock::Clock`] - Monotonic millisecond time source

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod clock;
pub mod transport;
pub mod uart;

pub use clock::Clock;
#[cfg(feature = "std")]
pub use clock::StdClock;
#[cfg(feature = "embassy")]
pub use clock::EmbassyClock;
pub use transport::{PollResult, Transport};
pub use uart::{DataBits, Parity, StopBits, UartConfig};
