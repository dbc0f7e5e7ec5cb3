//! Flow matches, forwarding rules and host bindings

use crate::{PortNo, SwitchId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Default rule priority for steered flows
pub const DEFAULT_RULE_PRIORITY: u16 = 100;

/// Ethernet payload type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EthType {
    /// IPv4 (0x0800)
    Ipv4,
    /// ARP (0x0806)
    Arp,
    /// Anything else, carrying the raw ether type
    Other(u16),
}

impl EthType {
    /// Raw ether type value
    pub const fn as_u16(&self) -> u16 {
        match self {
            Self::Ipv4 => 0x0800,
            Self::Arp => 0x0806,
            Self::Other(v) => *v,
        }
    }

    /// Whether packets of this type are routed by the engine
    pub const fn is_routable(&self) -> bool {
        matches!(self, Self::Ipv4 | Self::Arp)
    }
}

impl From<u16> for EthType {
    fn from(value: u16) -> Self {
        match value {
            0x0800 => Self::Ipv4,
            0x0806 => Self::Arp,
            v => Self::Other(v),
        }
    }
}

/// Exact-match criteria for a forwarding rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowMatch {
    /// Ether type
    pub eth_type: EthType,
    /// IPv4 source
    pub ipv4_src: Ipv4Addr,
    /// IPv4 destination
    pub ipv4_dst: Ipv4Addr,
}

/// Forwarding rule handed to the flow actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowRule {
    /// Switch to program
    pub switch: SwitchId,
    /// Match criteria
    pub flow_match: FlowMatch,
    /// Output port
    pub out_port: PortNo,
    /// Rule priority
    pub priority: u16,
    /// Idle timeout in seconds (0 = permanent)
    pub idle_timeout: u16,
    /// Hard timeout in seconds (0 = permanent)
    pub hard_timeout: u16,
}

impl FlowRule {
    /// Permanent rule at the default priority
    pub fn permanent(switch: SwitchId, flow_match: FlowMatch, out_port: PortNo) -> Self {
        Self {
            switch,
            flow_match,
            out_port,
            priority: DEFAULT_RULE_PRIORITY,
            idle_timeout: 0,
            hard_timeout: 0,
        }
    }
}

impl fmt::Display for FlowRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[SW-{}] {:?} {} -> {} out:{}",
            self.switch, self.flow_match.eth_type, self.flow_match.ipv4_src, self.flow_match.ipv4_dst, self.out_port
        )
    }
}

/// Where a host attaches to the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostBinding {
    /// Host address
    pub ip: Ipv4Addr,
    /// Attachment switch
    pub switch: SwitchId,
    /// Switch port facing the host
    pub port: PortNo,
}

/// Two hosts whose traffic is steered together, in both directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowPair(pub Ipv4Addr, pub Ipv4Addr);

impl FlowPair {
    /// Same pair with endpoints swapped
    pub fn reversed(&self) -> Self {
        Self(self.1, self.0)
    }
}

/// Packet punted to the controller by a switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketIn {
    /// Switch that received the packet
    pub switch: SwitchId,
    /// Ether type of the payload
    pub eth_type: EthType,
    /// Sender address (IPv4 source or ARP sender)
    pub src: Ipv4Addr,
    /// Target address (IPv4 destination or ARP target)
    pub dst: Ipv4Addr,
}
