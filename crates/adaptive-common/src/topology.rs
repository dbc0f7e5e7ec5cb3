//! Topology primitives: links, paths and discovery snapshots

use crate::{PortNo, SwitchId};
use serde::{Deserialize, Serialize};
use std::fmt;

const fn default_weight() -> u32 {
    1
}

/// Directed link between two switches
///
/// A bidirectional cable is reported as two reciprocal links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Source switch
    pub src: SwitchId,
    /// Egress port on the source switch
    pub src_port: PortNo,
    /// Destination switch
    pub dst: SwitchId,
    /// Link weight used by the shortest-path engine
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl Link {
    /// Create link with the default weight of 1
    pub fn new(src: SwitchId, src_port: PortNo, dst: SwitchId) -> Self {
        Self {
            src,
            src_port,
            dst,
            weight: default_weight(),
        }
    }

    /// Override the weight
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }
}

/// Ordered switch sequence from source to destination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<SwitchId>);

impl Path {
    /// Create path from hops
    pub fn new(hops: Vec<SwitchId>) -> Self {
        Self(hops)
    }

    /// Single-switch path
    pub fn single(switch: SwitchId) -> Self {
        Self(vec![switch])
    }

    /// First switch
    pub fn source(&self) -> Option<SwitchId> {
        self.0.first().copied()
    }

    /// Last switch
    pub fn destination(&self) -> Option<SwitchId> {
        self.0.last().copied()
    }

    /// Final hop (second-to-last, last), if the path has at least one link
    pub fn last_hop(&self) -> Option<(SwitchId, SwitchId)> {
        match self.0.as_slice() {
            [.., a, b] => Some((*a, *b)),
            _ => None,
        }
    }

    /// Adjacent switch pairs in path order
    pub fn hops(&self) -> impl Iterator<Item = (SwitchId, SwitchId)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }

    /// Position of a switch on the path
    pub fn position(&self, switch: SwitchId) -> Option<usize> {
        self.0.iter().position(|s| *s == switch)
    }

    /// Switches as slice
    pub fn switches(&self) -> &[SwitchId] {
        &self.0
    }

    /// Number of switches
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", s)?;
        }
        f.write_str("]")
    }
}

impl From<Vec<SwitchId>> for Path {
    fn from(hops: Vec<SwitchId>) -> Self {
        Self(hops)
    }
}

/// One topology report from the discovery service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    /// Known switches
    pub switches: Vec<SwitchId>,
    /// Known directed links, in discovery order
    pub links: Vec<Link>,
}

impl TopologySnapshot {
    /// Create snapshot
    pub fn new(switches: Vec<SwitchId>, links: Vec<Link>) -> Self {
        Self { switches, links }
    }
}

/// Topology size that must be observed before routing is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedTopology {
    /// Expected switch count
    pub switches: usize,
    /// Expected directed link count
    pub links: usize,
}

impl ExpectedTopology {
    /// Create expectation
    pub const fn new(switches: usize, links: usize) -> Self {
        Self { switches, links }
    }

    /// Check whether observed counts match exactly
    pub fn is_met(&self, switches: usize, links: usize) -> bool {
        self.switches == switches && self.links == links
    }
}

impl Default for ExpectedTopology {
    fn default() -> Self {
        Self::new(5, 12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(n: u64) -> SwitchId {
        SwitchId::new(n)
    }

    #[test]
    fn test_path_last_hop() {
        let path = Path::new(vec![s(1), s(2), s(3)]);
        assert_eq!(path.last_hop(), Some((s(2), s(3))));
        assert_eq!(Path::single(s(1)).last_hop(), None);
    }

    #[test]
    fn test_path_hops() {
        let path = Path::new(vec![s(1), s(2), s(3)]);
        let hops: Vec<_> = path.hops().collect();
        assert_eq!(hops, vec![(s(1), s(2)), (s(2), s(3))]);
        assert_eq!(path.position(s(3)), Some(2));
        assert_eq!(path.position(s(4)), None);
    }

    #[test]
    fn test_link_default_weight() {
        let json = r#"{"src":"1","src_port":2,"dst":"3"}"#;
        let link: Link = serde_json::from_str(json).unwrap();
        assert_eq!(link.weight, 1);
        assert_eq!(link.src_port, PortNo(2));
    }

    #[test]
    fn test_expected_topology() {
        let expected = ExpectedTopology::default();
        assert!(expected.is_met(5, 12));
        assert!(!expected.is_met(5, 10));
    }
}
