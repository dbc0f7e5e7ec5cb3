//! Error types for adaptive routing

use crate::SwitchId;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Adaptive routing error type
#[derive(Error, Debug)]
pub enum AdaptiveError {
    /// Edge lookup for a pair that has no link (graph consistency fault)
    #[error("missing edge {src} -> {dst}")]
    MissingEdge {
        /// Source switch
        src: SwitchId,
        /// Destination switch
        dst: SwitchId,
    },

    /// Link references a switch outside the snapshot's switch set
    #[error("link references unknown switch {0}")]
    UnknownSwitch(SwitchId),

    /// No graph installed yet (topology incomplete)
    #[error("routing disabled: topology not fully discovered")]
    RoutingDisabled,

    /// Address has no host binding
    #[error("unknown host: {0}")]
    UnknownHost(Ipv4Addr),

    /// Malformed datapath id
    #[error("invalid switch id: {0}")]
    InvalidSwitchId(String),

    /// Flow actuator rejected a rule
    #[error("flow actuator error: {0}")]
    Actuator(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for adaptive routing
pub type AdaptiveResult<T> = Result<T, AdaptiveError>;
