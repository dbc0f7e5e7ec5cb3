//! Path switching: measure every candidate, keep the fastest

use crate::forwarding::PathInstaller;
use crate::throughput::ThroughputRecorder;
use adaptive_path::PathSelector;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Mutual exclusion for path switching
///
/// At most one [`SwitchPermit`] exists at a time. While it is held the
/// monitor does not act and manual reroutes are ignored.
#[derive(Debug, Default)]
pub struct SwitchGuard {
    busy: AtomicBool,
}

impl SwitchGuard {
    /// Create released guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the permit if nobody holds it
    pub fn try_begin(self: &Arc<Self>) -> Option<SwitchPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SwitchPermit { guard: self.clone() })
    }

    /// Whether a switch is in progress
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Held for the duration of a switch; released on drop
#[derive(Debug)]
pub struct SwitchPermit {
    guard: Arc<SwitchGuard>,
}

impl Drop for SwitchPermit {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

/// Coordinator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchPhase {
    /// Not switching
    Idle,
    /// Measuring candidate `i`
    Probing(usize),
    /// Installing the winner
    Installing,
}

/// Result of one switching run
#[derive(Debug, Clone)]
pub struct SwitchReport {
    /// Path set generation that was measured
    pub generation: u64,
    /// Recorded throughput of every candidate (kbps)
    pub throughputs: Vec<u32>,
    /// Winning candidate
    pub selected: Option<usize>,
    /// Whether the winner became the active path
    pub committed: bool,
    /// Wall time of the run
    pub elapsed: Duration,
}

/// Runs path switches on their own task
pub struct PathSwitchCoordinator {
    selector: Arc<PathSelector>,
    installer: Arc<PathInstaller>,
    recorder: Arc<ThroughputRecorder>,
    guard: Arc<SwitchGuard>,
    settle: Duration,
    phase: Mutex<SwitchPhase>,
}

impl PathSwitchCoordinator {
    /// Create coordinator
    pub fn new(
        selector: Arc<PathSelector>,
        installer: Arc<PathInstaller>,
        recorder: Arc<ThroughputRecorder>,
        guard: Arc<SwitchGuard>,
        settle: Duration,
    ) -> Self {
        Self {
            selector,
            installer,
            recorder,
            guard,
            settle,
            phase: Mutex::new(SwitchPhase::Idle),
        }
    }

    /// Current phase
    pub fn phase(&self) -> SwitchPhase {
        *self.phase.lock()
    }

    /// Switching guard shared with the monitor and control channel
    pub fn guard(&self) -> &Arc<SwitchGuard> {
        &self.guard
    }

    /// Start a switch on a new task unless one is already running
    pub fn trigger(self: &Arc<Self>) -> Option<JoinHandle<SwitchReport>> {
        let Some(permit) = self.guard.try_begin() else {
            tracing::debug!("Switch already in progress");
            return None;
        };
        let this = self.clone();
        Some(tokio::spawn(async move { this.switch_paths(permit).await }))
    }

    /// Measure every candidate of the current path set, then install the best
    pub async fn switch_paths(&self, permit: SwitchPermit) -> SwitchReport {
        let started = Instant::now();
        let set = self.selector.path_set();
        let mut report = SwitchReport {
            generation: set.generation,
            throughputs: Vec::new(),
            selected: None,
            committed: false,
            elapsed: Duration::ZERO,
        };

        let routing = match self.selector.snapshot() {
            Some(routing) if routing.generation == set.generation && !set.paths.is_empty() => routing,
            _ => {
                tracing::warn!("No candidate paths to switch between");
                return report;
            }
        };
        let graph = routing.graph().clone();
        tracing::info!(candidates = set.paths.len(), "Congestion, probing paths");
        self.recorder.table().align(set.generation, set.paths.len());

        for (i, path) in set.paths.iter().enumerate() {
            self.set_phase(SwitchPhase::Probing(i));
            if let Err(e) = self.installer.install_path(&graph, path) {
                tracing::warn!(path = i, "Cannot install {}: {}", path, e);
                continue;
            }
            tokio::time::sleep(self.settle).await;
            match self.recorder.measure(&graph, set.generation, &set.paths, i) {
                Some(kbps) => tracing::info!(path = i, kbps, "Measured {}", path),
                None => tracing::warn!(path = i, "No throughput for {}", path),
            }
        }

        self.set_phase(SwitchPhase::Installing);
        report.throughputs = self.recorder.table().samples();
        report.selected = self.recorder.table().best().map(|(i, _)| i);

        if let Some((index, path)) = report.selected.and_then(|i| set.paths.get(i).map(|p| (i, p))) {
            match self.installer.install_path(&graph, path) {
                Ok(_) => {
                    report.committed = self.selector.commit_active_index(set.generation, index);
                    tracing::info!(path = index, committed = report.committed, "Switched to {}", path);
                }
                Err(e) => tracing::warn!(path = index, "Cannot install {}: {}", path, e),
            }
        }

        self.set_phase(SwitchPhase::Idle);
        report.elapsed = started.elapsed();
        drop(permit);
        report
    }

    fn set_phase(&self, phase: SwitchPhase) {
        *self.phase.lock() = phase;
    }
}
