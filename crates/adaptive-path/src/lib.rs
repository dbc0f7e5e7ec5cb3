//! Adaptive Path - Topology graph and path computation
//!
//! # Components
//!
//! - [`Graph`]: immutable snapshot of switches and directed weighted links
//! - [`ShortestPathEngine`]: deterministic label-setting Dijkstra
//! - [`AllPathsEngine`]: DFS enumeration of all simple paths
//! - [`PathSelector`]: owns the current graph and engines, tracks the active
//!   path and fans out path/session events
//!
//! A topology change never mutates a graph in place. A new [`Graph`] is
//! built and swapped in atomically together with its engines.

#![warn(missing_docs)]

pub mod all_paths;
pub mod dijkstra;
pub mod graph;
pub mod selector;

pub use all_paths::{AllPathsEngine, PathSet};
pub use dijkstra::{RoutingState, ShortestPathEngine};
pub use graph::Graph;
pub use selector::{PathSelector, PathSetSnapshot, RoutingSnapshot, Selection};
