//! Adaptive Common - Shared types for adaptive traffic engineering
//!
//! This crate provides the vocabulary shared by the routing engines and the
//! traffic-engineering loop:
//! - Switch and port identifiers
//! - Links, paths and topology snapshots
//! - Flow matches and forwarding rules
//! - Listener fan-out for path and session events
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod flow;
pub mod listener;
pub mod topology;

pub use error::*;
pub use flow::*;
pub use listener::*;
pub use topology::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Datapath identifier of an OpenFlow switch
///
/// Rendered as eight colon-separated hex octets
/// (`00:00:00:00:00:00:00:01`). Parsing also accepts a plain decimal or
/// `0x`-prefixed value. The derived ordering is the total order used for
/// routing tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(transparent)]
pub struct SwitchId(u64);

impl SwitchId {
    /// Create from raw datapath id
    #[inline(always)]
    pub const fn new(dpid: u64) -> Self {
        Self(dpid)
    }

    /// Raw datapath id
    #[inline(always)]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        for (i, b) in bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for SwitchId {
    type Err = AdaptiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || AdaptiveError::InvalidSwitchId(s.to_string());

        if s.contains(':') {
            let octets: Vec<&str> = s.split(':').collect();
            if octets.len() != 8 {
                return Err(invalid());
            }
            let mut value = 0u64;
            for octet in octets {
                if octet.is_empty() || octet.len() > 2 {
                    return Err(invalid());
                }
                let b = u8::from_str_radix(octet, 16).map_err(|_| invalid())?;
                value = (value << 8) | b as u64;
            }
            Ok(Self(value))
        } else if let Some(hex) = s.strip_prefix("0x") {
            u64::from_str_radix(hex, 16).map(Self).map_err(|_| invalid())
        } else {
            s.parse::<u64>().map(Self).map_err(|_| invalid())
        }
    }
}

impl TryFrom<String> for SwitchId {
    type Error = AdaptiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SwitchId> for String {
    fn from(id: SwitchId) -> Self {
        id.to_string()
    }
}

impl From<u64> for SwitchId {
    fn from(dpid: u64) -> Self {
        Self(dpid)
    }
}

/// Switch port number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortNo(pub u32);

impl fmt::Display for PortNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
