//! Path selector owning the routing snapshot and the active path

use crate::{
    all_paths::{AllPathsEngine, PathSet},
    dijkstra::{RoutingState, ShortestPathEngine},
    graph::Graph,
};
use adaptive_common::{
    AdaptiveListener, AdaptiveResult, AdaptiveError, ChangeReason, ExpectedTopology, ListenerId,
    ListenerRegistry, Path, PathChange, SwitchId, TopologySnapshot,
};
use arc_swap::ArcSwapOption;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Graph plus the engines bound to it, swapped as one unit
#[derive(Debug)]
pub struct RoutingSnapshot {
    /// Monotonic id of this graph installation
    pub generation: u64,
    graph: Arc<Graph>,
    shortest: ShortestPathEngine,
    all_paths: AllPathsEngine,
}

impl RoutingSnapshot {
    fn new(graph: Graph, generation: u64) -> Self {
        let graph = Arc::new(graph);
        Self {
            generation,
            shortest: ShortestPathEngine::new(graph.clone()),
            all_paths: AllPathsEngine::new(graph.clone()),
            graph,
        }
    }

    /// Graph of this snapshot
    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// Shortest-path tree from `source`
    pub fn routing_state(&self, source: SwitchId) -> AdaptiveResult<RoutingState> {
        self.shortest.execute(source)
    }

    /// All simple paths `src -> dst`
    pub fn paths(&self, src: SwitchId, dst: SwitchId) -> PathSet {
        self.all_paths.search(src, dst)
    }
}

/// Outcome of a path selection for one source/destination pair
#[derive(Debug, Clone)]
pub struct Selection {
    /// Graph generation the selection was computed on
    pub generation: u64,
    /// All candidate paths
    pub paths: Arc<PathSet>,
    /// Index of `path` within `paths`
    pub index: Option<usize>,
    /// Shortest path
    pub path: Path,
}

/// Read-only view of the current candidates and the active one
#[derive(Debug, Clone)]
pub struct PathSetSnapshot {
    /// Graph generation the path set belongs to
    pub generation: u64,
    /// Candidate paths
    pub paths: Arc<PathSet>,
    /// Active path index
    pub active: Option<usize>,
}

impl PathSetSnapshot {
    /// Active index and path
    pub fn active_path(&self) -> Option<(usize, &Path)> {
        let index = self.active?;
        self.paths.get(index).map(|p| (index, p))
    }
}

#[derive(Debug, Default)]
struct SelectionState {
    generation: u64,
    endpoints: Option<(SwitchId, SwitchId)>,
    paths: Arc<PathSet>,
    active: Option<usize>,
}

impl SelectionState {
    fn active_path(&self) -> Option<&Path> {
        self.active.and_then(|i| self.paths.get(i))
    }
}

/// Path selector
///
/// Reads of the routing snapshot are lock-free; a new graph replaces the old
/// one atomically and invalidates the stored path set.
pub struct PathSelector {
    engines: ArcSwapOption<RoutingSnapshot>,
    expected: ExpectedTopology,
    state: RwLock<SelectionState>,
    session_active: AtomicBool,
    generation: AtomicU64,
    listeners: ListenerRegistry,
}

impl PathSelector {
    /// Create selector with routing disabled
    pub fn new(expected: ExpectedTopology) -> Self {
        Self {
            engines: ArcSwapOption::empty(),
            expected,
            state: RwLock::new(SelectionState::default()),
            session_active: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Expected topology size
    pub fn expected_topology(&self) -> ExpectedTopology {
        self.expected
    }

    /// Register listener
    pub fn add_listener(&self, listener: Arc<dyn AdaptiveListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Unregister listener
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Apply a discovery snapshot
    ///
    /// Routing is enabled only when the observed switch and link counts
    /// match the expected topology; otherwise it is disabled. Returns whether
    /// routing is enabled afterwards. A snapshot that cannot be built into a
    /// graph also disables routing before the error is returned.
    pub fn update_topology(&self, snapshot: &TopologySnapshot) -> AdaptiveResult<bool> {
        if !self.expected.is_met(snapshot.switches.len(), snapshot.links.len()) {
            tracing::debug!(
                switches = snapshot.switches.len(),
                links = snapshot.links.len(),
                "Topology incomplete, routing disabled"
            );
            self.disable();
            return Ok(false);
        }

        let graph = match Graph::from_snapshot(snapshot) {
            Ok(graph) => graph,
            Err(e) => {
                tracing::warn!("Topology rejected, routing disabled: {}", e);
                self.disable();
                return Err(e);
            }
        };
        let generation = self.set_graph(graph);
        tracing::info!(generation, "Topology discovered, routing enabled");
        Ok(true)
    }

    /// Atomically install a new graph and its engines
    ///
    /// The stored path set and active index are cleared: they belonged to
    /// the previous graph. Returns the new generation.
    pub fn set_graph(&self, graph: Graph) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let mut state = self.state.write();
        self.engines.store(Some(Arc::new(RoutingSnapshot::new(graph, generation))));
        state.generation = generation;
        state.paths = Arc::new(PathSet::default());
        state.active = None;
        generation
    }

    /// Drop the current graph
    pub fn disable(&self) {
        if self.engines.load().is_none() {
            return;
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let mut state = self.state.write();
        self.engines.store(None);
        state.generation = generation;
        state.paths = Arc::new(PathSet::default());
        state.active = None;
    }

    /// Whether a graph is installed
    pub fn is_routing_enabled(&self) -> bool {
        self.engines.load().is_some()
    }

    /// Current routing snapshot
    pub fn snapshot(&self) -> Option<Arc<RoutingSnapshot>> {
        self.engines.load_full()
    }

    /// Current graph
    pub fn graph(&self) -> Option<Arc<Graph>> {
        self.snapshot().map(|s| s.graph.clone())
    }

    fn require_snapshot(&self) -> AdaptiveResult<Arc<RoutingSnapshot>> {
        self.snapshot().ok_or(AdaptiveError::RoutingDisabled)
    }

    /// Shortest path `src -> dst`, `Ok(None)` when unreachable
    pub fn route(&self, src: SwitchId, dst: SwitchId) -> AdaptiveResult<Option<Path>> {
        let snapshot = self.require_snapshot()?;
        Ok(snapshot.routing_state(src)?.path(dst))
    }

    /// Fresh set of all simple paths `src -> dst`
    pub fn all_paths(&self, src: SwitchId, dst: SwitchId) -> AdaptiveResult<PathSet> {
        let snapshot = self.require_snapshot()?;
        Ok(snapshot.paths(src, dst))
    }

    /// Recompute candidates and shortest path for a flow and make the
    /// shortest path active
    ///
    /// Remembers `(src, dst)` as the last known endpoints for `reroute`.
    pub fn select(&self, src: SwitchId, dst: SwitchId) -> AdaptiveResult<Option<Selection>> {
        self.select_with(src, dst, ChangeReason::Selected)
    }

    fn select_with(
        &self,
        src: SwitchId,
        dst: SwitchId,
        reason: ChangeReason,
    ) -> AdaptiveResult<Option<Selection>> {
        let snapshot = self.require_snapshot()?;
        let paths = Arc::new(snapshot.paths(src, dst));
        let shortest = snapshot.routing_state(src)?.path(dst);
        let index = shortest.as_ref().and_then(|p| paths.position(p));

        let change = {
            let mut state = self.state.write();
            if state.generation != snapshot.generation {
                tracing::debug!("Graph replaced during selection, result not stored");
                return Ok(shortest.map(|path| Selection {
                    generation: snapshot.generation,
                    paths,
                    index,
                    path,
                }));
            }

            let previous = state.active_path().cloned();
            state.endpoints = Some((src, dst));
            state.paths = paths.clone();
            state.active = index;

            match (index, &shortest) {
                (Some(i), Some(path)) if reason != ChangeReason::Selected || previous.as_ref() != Some(path) => {
                    Some(PathChange {
                        index: i,
                        path: path.clone(),
                        reason,
                    })
                }
                _ => None,
            }
        };

        tracing::debug!(candidates = paths.len(), index = ?index, "Selected paths {} -> {}", src, dst);

        if reason == ChangeReason::Rerouted {
            self.listeners.notify_reroute();
        }
        if let Some(change) = change {
            self.listeners.notify_path_changed(&change);
        }

        Ok(shortest.map(|path| Selection {
            generation: snapshot.generation,
            paths,
            index,
            path,
        }))
    }

    /// Force a fresh shortest-path computation for the last known endpoints
    ///
    /// Returns `Ok(None)` when no flow has been seen yet.
    pub fn reroute(&self) -> AdaptiveResult<Option<Selection>> {
        let endpoints = self.state.read().endpoints;
        match endpoints {
            Some((src, dst)) => {
                tracing::info!("Rerouting {} -> {}", src, dst);
                self.select_with(src, dst, ChangeReason::Rerouted)
            }
            None => {
                tracing::debug!("Reroute requested before any flow was routed");
                Ok(None)
            }
        }
    }

    /// Index of the active path within the last computed path set
    pub fn current_path_index(&self) -> Option<usize> {
        self.state.read().active
    }

    /// Current candidates and active index
    pub fn path_set(&self) -> PathSetSnapshot {
        let state = self.state.read();
        PathSetSnapshot {
            generation: state.generation,
            paths: state.paths.clone(),
            active: state.active,
        }
    }

    /// Last known flow endpoints
    pub fn endpoints(&self) -> Option<(SwitchId, SwitchId)> {
        self.state.read().endpoints
    }

    /// Make `index` the active path of the path set from `generation`
    ///
    /// Rejected (returns `false`) when the path set has been replaced since,
    /// or when the index is out of range.
    pub fn commit_active_index(&self, generation: u64, index: usize) -> bool {
        let change = {
            let mut state = self.state.write();
            if state.generation != generation {
                tracing::warn!(generation, current = state.generation, "Stale path commit rejected");
                return false;
            }
            let Some(path) = state.paths.get(index).cloned() else {
                tracing::warn!(index, "Path index out of range");
                return false;
            };
            let changed = state.active != Some(index);
            state.active = Some(index);
            changed.then(|| PathChange {
                index,
                path,
                reason: ChangeReason::Switched,
            })
        };

        if let Some(change) = change {
            self.listeners.notify_path_changed(&change);
        }
        true
    }

    /// Start the traffic session (enables monitoring)
    pub fn start(&self) {
        self.session_active.store(true, Ordering::Release);
        tracing::info!("Traffic session started");
        self.listeners.notify_start();
    }

    /// Stop the traffic session
    pub fn stop(&self) {
        self.session_active.store(false, Ordering::Release);
        tracing::info!("Traffic session stopped");
        self.listeners.notify_stop();
    }

    /// Whether the monitor may act
    pub fn is_session_active(&self) -> bool {
        self.session_active.load(Ordering::Acquire)
    }
}

impl Default for PathSelector {
    fn default() -> Self {
        Self::new(ExpectedTopology::default())
    }
}
