//! Robotling inter-board link protocol
//!
//! Commands and telemetry between a client (compute) board and a server
//! (motion-control) board over a byte transport with no framing of its
//! own: a UART, a BLE notify/write characteristic pair, or a host serial
//! port.
//!
//! # Protocol Overview
//!
//! A message is serialized as little-endian 16-bit cells, hex-encoded and
//! wrapped between a direction marker and a terminator:
//!
//! ```text
//! ┌─────┬───────────────────────────────────────────────────┬─────┐
//! │ DIR │ hex( TOKEN COUNTER LENGTH NUMSETS {KEY N V…}* )   │  ;  │
//! │ > < │ 2 hex digits per byte                             │     │
//! └─────┴───────────────────────────────────────────────────┴─────┘
//! ```
//!
//! Hex encoding means the payload can never contain `>`, `<` or `;`, so
//! frames are found again after arbitrary chunking without escaping.
//!
//! The [`LinkEngine`] pairs each request with its reply through the
//! COUNTER cell and tolerates stale replies and unsolicited telemetry
//! on the same line.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod link;
pub mod message;
pub mod text;
pub mod token;

pub use codec::{
    decode, encode, from_wire, to_wire, Direction, MAX_FRAME_LEN, MAX_PAYLOAD_LEN, MIN_FRAME_LEN,
};
pub use config::{LinkConfig, Role};
pub use error::{LinkError, ProtocolError};
pub use frame::{FrameBuffer, RawFrame, PENDING_CAPACITY};
pub use link::{LinkEngine, LinkState, LinkStats, Received};
pub use message::{Message, ParameterSet, MAX_PARAM_SETS, MAX_VALUES};
pub use token::{ErrorCode, Token};
