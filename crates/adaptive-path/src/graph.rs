//! Immutable topology graph

use adaptive_common::{AdaptiveError, AdaptiveResult, Link, PortNo, SwitchId, TopologySnapshot};
use std::collections::{HashMap, HashSet};

/// Directed weighted graph built from one topology snapshot
///
/// Never mutated after construction; a topology change builds a new graph.
/// Adjacency lists keep link discovery order, which fixes DFS enumeration
/// order and shortest-path tie-breaks on equal distances.
#[derive(Debug, Clone)]
pub struct Graph {
    switches: HashSet<SwitchId>,
    links: Vec<Link>,
    adjacency: HashMap<SwitchId, Vec<SwitchId>>,
    edges: HashMap<(SwitchId, SwitchId), Link>,
}

impl Graph {
    /// Build graph from switch and link sets
    ///
    /// Fails with `UnknownSwitch` when a link endpoint is not a known switch.
    /// When several links join the same ordered pair, the first one wins.
    pub fn new(switches: impl IntoIterator<Item = SwitchId>, links: Vec<Link>) -> AdaptiveResult<Self> {
        let switches: HashSet<SwitchId> = switches.into_iter().collect();
        let mut adjacency: HashMap<SwitchId, Vec<SwitchId>> = HashMap::with_capacity(switches.len());
        let mut edges = HashMap::with_capacity(links.len());

        for link in &links {
            for endpoint in [link.src, link.dst] {
                if !switches.contains(&endpoint) {
                    return Err(AdaptiveError::UnknownSwitch(endpoint));
                }
            }

            if edges.contains_key(&(link.src, link.dst)) {
                tracing::debug!("Duplicate link {} -> {} ignored", link.src, link.dst);
                continue;
            }
            edges.insert((link.src, link.dst), *link);
            adjacency.entry(link.src).or_default().push(link.dst);
        }

        Ok(Self {
            switches,
            links,
            adjacency,
            edges,
        })
    }

    /// Build from a discovery snapshot
    pub fn from_snapshot(snapshot: &TopologySnapshot) -> AdaptiveResult<Self> {
        Self::new(snapshot.switches.iter().copied(), snapshot.links.clone())
    }

    /// Outgoing neighbors of `switch` in link discovery order
    #[inline]
    pub fn neighbors(&self, switch: SwitchId) -> &[SwitchId] {
        self.adjacency.get(&switch).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Weight of the edge `src -> dst`
    ///
    /// A missing edge is a consistency fault, never defaulted.
    #[inline]
    pub fn weight(&self, src: SwitchId, dst: SwitchId) -> AdaptiveResult<u32> {
        self.edge(src, dst).map(|link| link.weight)
    }

    /// Egress port on `src` towards `dst`
    #[inline]
    pub fn egress_port(&self, src: SwitchId, dst: SwitchId) -> AdaptiveResult<PortNo> {
        self.edge(src, dst).map(|link| link.src_port)
    }

    /// Link `src -> dst`
    pub fn edge(&self, src: SwitchId, dst: SwitchId) -> AdaptiveResult<&Link> {
        self.edges.get(&(src, dst)).ok_or(AdaptiveError::MissingEdge { src, dst })
    }

    /// Check switch membership
    pub fn contains(&self, switch: SwitchId) -> bool {
        self.switches.contains(&switch)
    }

    /// Switch set
    pub fn switches(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.switches.iter().copied()
    }

    /// Links as reported, in discovery order
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Number of switches
    pub fn vertex_count(&self) -> usize {
        self.switches.len()
    }

    /// Number of reported directed links
    pub fn edge_count(&self) -> usize {
        self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(n: u64) -> SwitchId {
        SwitchId::new(n)
    }

    fn line() -> Graph {
        let links = vec![
            Link::new(s(1), PortNo(2), s(2)),
            Link::new(s(2), PortNo(1), s(1)),
            Link::new(s(2), PortNo(3), s(3)).with_weight(4),
            Link::new(s(3), PortNo(1), s(2)).with_weight(4),
        ];
        Graph::new([s(1), s(2), s(3)], links).unwrap()
    }

    #[test]
    fn test_neighbors_keep_discovery_order() {
        let g = line();
        assert_eq!(g.neighbors(s(2)), &[s(1), s(3)]);
        assert!(g.neighbors(s(9)).is_empty());
    }

    #[test]
    fn test_weight_lookup() {
        let g = line();
        assert_eq!(g.weight(s(2), s(3)).unwrap(), 4);
        assert_eq!(g.egress_port(s(2), s(3)).unwrap(), PortNo(3));
    }

    #[test]
    fn test_missing_edge_fails() {
        let g = line();
        let err = g.weight(s(1), s(3)).unwrap_err();
        assert!(matches!(err, AdaptiveError::MissingEdge { src, dst } if src == s(1) && dst == s(3)));
    }

    #[test]
    fn test_unknown_switch_rejected() {
        let links = vec![Link::new(s(1), PortNo(1), s(7))];
        let err = Graph::new([s(1), s(2)], links).unwrap_err();
        assert!(matches!(err, AdaptiveError::UnknownSwitch(id) if id == s(7)));
    }

    #[test]
    fn test_duplicate_link_first_wins() {
        let links = vec![
            Link::new(s(1), PortNo(1), s(2)),
            Link::new(s(1), PortNo(5), s(2)).with_weight(9),
        ];
        let g = Graph::new([s(1), s(2)], links).unwrap();
        assert_eq!(g.neighbors(s(1)), &[s(2)]);
        assert_eq!(g.weight(s(1), s(2)).unwrap(), 1);
        assert_eq!(g.edge_count(), 2);
    }
}
