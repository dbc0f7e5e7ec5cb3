//! Single-source shortest paths (label-setting Dijkstra)

use crate::graph::Graph;
use adaptive_common::{AdaptiveResult, Path, SwitchId};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Shortest-path engine bound to one graph
#[derive(Debug, Clone)]
pub struct ShortestPathEngine {
    graph: Arc<Graph>,
}

impl ShortestPathEngine {
    /// Bind engine to a graph
    pub fn new(graph: Arc<Graph>) -> Self {
        Self { graph }
    }

    /// Graph this engine runs on
    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Compute the full shortest-path tree from `source`
    ///
    /// The unsettled set is ordered by `(distance, SwitchId)`, so among equal
    /// minimum distances the lowest switch id is settled first. A
    /// predecessor is only replaced by a strictly shorter distance.
    pub fn execute(&self, source: SwitchId) -> AdaptiveResult<RoutingState> {
        let mut settled: HashSet<SwitchId> = HashSet::new();
        let mut unsettled: BTreeSet<(u64, SwitchId)> = BTreeSet::new();
        let mut distance: HashMap<SwitchId, u64> = HashMap::new();
        let mut predecessor: HashMap<SwitchId, SwitchId> = HashMap::new();

        distance.insert(source, 0);
        unsettled.insert((0, source));

        while let Some((dist, node)) = unsettled.pop_first() {
            settled.insert(node);

            for &target in self.graph.neighbors(node) {
                if settled.contains(&target) {
                    continue;
                }
                let candidate = dist + self.graph.weight(node, target)? as u64;
                let current = distance.get(&target).copied();
                if current.map_or(true, |d| candidate < d) {
                    if let Some(old) = current {
                        unsettled.remove(&(old, target));
                    }
                    distance.insert(target, candidate);
                    predecessor.insert(target, node);
                    unsettled.insert((candidate, target));
                }
            }
        }

        Ok(RoutingState {
            source,
            distance,
            predecessor,
        })
    }
}

/// Result of one shortest-path run, valid only for its source
#[derive(Debug, Clone)]
pub struct RoutingState {
    source: SwitchId,
    distance: HashMap<SwitchId, u64>,
    predecessor: HashMap<SwitchId, SwitchId>,
}

impl RoutingState {
    /// Source this state was computed for
    pub fn source(&self) -> SwitchId {
        self.source
    }

    /// Shortest distance to `target`, `None` if unreached
    pub fn distance(&self, target: SwitchId) -> Option<u64> {
        self.distance.get(&target).copied()
    }

    /// Shortest path to `target`
    ///
    /// `None` means no path. The source itself yields `[source]`.
    pub fn path(&self, target: SwitchId) -> Option<Path> {
        if target == self.source {
            return Some(Path::single(target));
        }
        if !self.predecessor.contains_key(&target) {
            return None;
        }

        let mut hops = vec![target];
        let mut step = target;
        while let Some(&prev) = self.predecessor.get(&step) {
            hops.push(prev);
            step = prev;
        }
        hops.reverse();
        Some(Path::new(hops))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adaptive_common::{Link, PortNo};
    use proptest::prelude::*;

    fn s(n: u64) -> SwitchId {
        SwitchId::new(n)
    }

    fn bidirectional(pairs: &[(u64, u64, u32)]) -> Vec<Link> {
        let mut links = Vec::new();
        for &(a, b, w) in pairs {
            links.push(Link::new(s(a), PortNo(b as u32), s(b)).with_weight(w));
            links.push(Link::new(s(b), PortNo(a as u32), s(a)).with_weight(w));
        }
        links
    }

    fn engine(switches: &[u64], pairs: &[(u64, u64, u32)]) -> ShortestPathEngine {
        let graph = Graph::new(switches.iter().map(|&n| s(n)), bidirectional(pairs)).unwrap();
        ShortestPathEngine::new(Arc::new(graph))
    }

    #[test]
    fn test_source_path_is_single_switch() {
        let e = engine(&[1, 2], &[(1, 2, 1)]);
        let state = e.execute(s(1)).unwrap();
        assert_eq!(state.path(s(1)), Some(Path::single(s(1))));
        assert_eq!(state.distance(s(1)), Some(0));
    }

    #[test]
    fn test_prefers_lighter_route() {
        // 1-2-4 costs 2, 1-3-4 costs 10
        let e = engine(&[1, 2, 3, 4], &[(1, 3, 5), (3, 4, 5), (1, 2, 1), (2, 4, 1)]);
        let state = e.execute(s(1)).unwrap();
        assert_eq!(state.path(s(4)), Some(Path::new(vec![s(1), s(2), s(4)])));
        assert_eq!(state.distance(s(4)), Some(2));
    }

    #[test]
    fn test_unreachable_is_no_path() {
        let e = engine(&[1, 2, 3], &[(1, 2, 1)]);
        let state = e.execute(s(1)).unwrap();
        assert_eq!(state.path(s(3)), None);
        assert_eq!(state.distance(s(3)), None);
    }

    #[test]
    fn test_ring_tie_break_is_stable() {
        // 4-node ring, two equal-cost routes from 1 to 3
        let e = engine(&[1, 2, 3, 4], &[(1, 2, 1), (2, 3, 1), (3, 4, 1), (4, 1, 1)]);
        let first = e.execute(s(1)).unwrap().path(s(3)).unwrap();
        for _ in 0..50 {
            assert_eq!(e.execute(s(1)).unwrap().path(s(3)).unwrap(), first);
        }
        assert_eq!(first, Path::new(vec![s(1), s(2), s(3)]));
    }

    #[test]
    fn test_equal_distance_settles_lowest_id_first() {
        // 1 reaches 5 and 2 at equal cost; both lead to 9 at equal cost.
        // Switch 2 is settled first, so it becomes 9's predecessor.
        let links = vec![
            Link::new(s(1), PortNo(1), s(5)),
            Link::new(s(1), PortNo(2), s(2)),
            Link::new(s(5), PortNo(1), s(9)),
            Link::new(s(2), PortNo(1), s(9)),
        ];
        let graph = Graph::new([s(1), s(2), s(5), s(9)], links).unwrap();
        let e = ShortestPathEngine::new(Arc::new(graph));
        let path = e.execute(s(1)).unwrap().path(s(9)).unwrap();
        assert_eq!(path, Path::new(vec![s(1), s(2), s(9)]));
    }

    fn arb_graph() -> impl Strategy<Value = (usize, Vec<(u64, u64, u32)>)> {
        (2usize..8).prop_flat_map(|n| {
            let edge = (0..n as u64, 0..n as u64, 1u32..20);
            (Just(n), prop::collection::vec(edge, 0..24))
        })
    }

    proptest! {
        #[test]
        fn prop_distances_non_decreasing_along_path((n, edges) in arb_graph()) {
            let pairs: Vec<_> = edges.into_iter().filter(|(a, b, _)| a != b).collect();
            let switches: Vec<u64> = (0..n as u64).collect();
            let e = engine(&switches, &pairs);
            let state = e.execute(s(0)).unwrap();

            for target in 0..n as u64 {
                if let Some(path) = state.path(s(target)) {
                    prop_assert_eq!(path.source(), Some(s(0)));
                    prop_assert_eq!(path.destination(), Some(s(target)));
                    let mut last = 0u64;
                    for hop in path.switches() {
                        let d = state.distance(*hop).unwrap();
                        prop_assert!(d >= last);
                        last = d;
                    }
                    for (a, b) in path.hops() {
                        prop_assert!(e.graph().weight(a, b).is_ok());
                    }
                }
            }
        }
    }
}
