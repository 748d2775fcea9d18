//! Transports for the robotling link
//!
//! One [`Transport`](robotling_hal::Transport) implementation per kind of
//! channel:
//!
//! - [`EmbeddedIoTransport`] - a UART (or any byte stream) exposed by an
//!   `embedded-io` HAL driver
//! - [`BufferedTransport`] - bytes pushed in from an interrupt or event
//!   callback, writes handed to a [`Notify`] sink; the shape of a BLE
//!   UART peripheral
//! - [`SerialTransport`] - an OS serial port on a host (feature `serial`)

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod buffered;
pub mod embedded;
#[cfg(feature = "serial")]
pub mod serial;

pub use buffered::{BufferedTransport, Notify};
pub use embedded::EmbeddedIoTransport;
#[cfg(feature = "serial")]
pub use serial::SerialTransport;
