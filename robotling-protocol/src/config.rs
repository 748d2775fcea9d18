//! Link configuration
//!
//! Protocol limits are compile-time constants; what varies per board is
//! which side of the link it is and how long it waits for replies.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::codec::Direction;

/// Which end of the link this board is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Role {
    /// Compute board: sends requests, receives replies and events
    #[default]
    Client,
    /// Motion-control board: receives requests, sends replies and events
    Server,
}

impl Role {
    /// Direction of frames this board writes
    pub fn outbound(self) -> Direction {
        match self {
            Role::Client => Direction::Request,
            Role::Server => Direction::Reply,
        }
    }

    /// Direction of frames this board reads
    pub fn inbound(self) -> Direction {
        match self {
            Role::Client => Direction::Reply,
            Role::Server => Direction::Request,
        }
    }
}

/// Link engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkConfig {
    /// Side of the link
    pub role: Role,
    /// Reply timeout used by [`LinkEngine::request`](crate::LinkEngine::request)
    pub default_timeout_ms: u32,
    /// Longest single transport poll while waiting, so the deadline is
    /// rechecked regularly
    pub poll_slice_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            role: Role::Client,
            default_timeout_ms: 100,
            poll_slice_ms: 10,
        }
    }
}

impl LinkConfig {
    /// Default configuration for the given role
    pub fn for_role(role: Role) -> Self {
        Self {
            role,
            ..Self::default()
        }
    }
}
