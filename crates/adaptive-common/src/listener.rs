//! Listener fan-out for session and path events
//!
//! Components register an [`AdaptiveListener`] with a [`ListenerRegistry`]
//! and are called back synchronously, in registration order, whenever the
//! owner broadcasts an event.

use crate::Path;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Why the active path changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// Shortest path picked for a new flow
    Selected,
    /// Forced recomputation (remote `Reroute`)
    Rerouted,
    /// Best candidate committed after probing
    Switched,
}

/// Active path replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathChange {
    /// Index of the new active path in the current path set
    pub index: usize,
    /// The new active path
    pub path: Path,
    /// Cause of the change
    pub reason: ChangeReason,
}

/// Receiver of session and path events
///
/// All methods default to no-ops so listeners implement only what they need.
pub trait AdaptiveListener: Send + Sync {
    /// Traffic session started
    fn start(&self) {}
    /// Traffic session stopped
    fn stop(&self) {}
    /// Re-evaluation forced
    fn reroute(&self) {}
    /// Active path replaced
    fn path_changed(&self, _change: &PathChange) {}
}

/// Handle returned on registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Explicit callback registration list
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn AdaptiveListener>)>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register listener
    pub fn add(&self, listener: Arc<dyn AdaptiveListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Unregister listener, returns whether it was registered
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Call `f` on every listener
    ///
    /// The list is snapshotted first so callbacks may register or remove
    /// listeners without deadlocking.
    pub fn notify(&self, f: impl Fn(&dyn AdaptiveListener)) {
        let snapshot: Vec<Arc<dyn AdaptiveListener>> =
            self.listeners.read().iter().map(|(_, l)| l.clone()).collect();
        for listener in snapshot {
            f(listener.as_ref());
        }
    }

    /// Broadcast session start
    pub fn notify_start(&self) {
        self.notify(|l| l.start());
    }

    /// Broadcast session stop
    pub fn notify_stop(&self) {
        self.notify(|l| l.stop());
    }

    /// Broadcast reroute
    pub fn notify_reroute(&self) {
        self.notify(|l| l.reroute());
    }

    /// Broadcast path change
    pub fn notify_path_changed(&self, change: &PathChange) {
        tracing::debug!(index = change.index, reason = ?change.reason, "Path changed: {}", change.path);
        self.notify(|l| l.path_changed(change));
    }
}
