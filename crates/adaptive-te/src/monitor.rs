//! Periodic congestion check on the active path

use crate::config::CongestionBand;
use crate::coordinator::PathSwitchCoordinator;
use crate::throughput::ThroughputRecorder;
use adaptive_path::PathSelector;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// What one monitoring cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Session not started
    Inactive,
    /// A switch is running
    Busy,
    /// No flow routed yet
    NoActivePath,
    /// Telemetry had nothing for the measured port
    NoData,
    /// At or below the congestion band
    Idle {
        /// Active path
        index: usize,
        /// Recorded throughput
        kbps: u32,
    },
    /// At or above the congestion band
    Healthy {
        /// Active path
        index: usize,
        /// Recorded throughput
        kbps: u32,
    },
    /// Inside the band; a switch was started
    Scheduled {
        /// Active path
        index: usize,
        /// Recorded throughput
        kbps: u32,
    },
}

/// Samples the active path every period and starts a switch on congestion
pub struct ThroughputMonitor {
    selector: Arc<PathSelector>,
    recorder: Arc<ThroughputRecorder>,
    coordinator: Arc<PathSwitchCoordinator>,
    band: CongestionBand,
    period: Duration,
}

impl ThroughputMonitor {
    /// Create monitor
    pub fn new(
        selector: Arc<PathSelector>,
        recorder: Arc<ThroughputRecorder>,
        coordinator: Arc<PathSwitchCoordinator>,
        band: CongestionBand,
        period: Duration,
    ) -> Self {
        Self {
            selector,
            recorder,
            coordinator,
            band,
            period,
        }
    }

    /// Run one cycle
    pub fn tick(&self) -> MonitorOutcome {
        if !self.selector.is_session_active() {
            return MonitorOutcome::Inactive;
        }
        if self.coordinator.guard().is_busy() {
            return MonitorOutcome::Busy;
        }

        let set = self.selector.path_set();
        let Some((index, _)) = set.active_path() else {
            return MonitorOutcome::NoActivePath;
        };
        let graph = match self.selector.snapshot() {
            Some(routing) if routing.generation == set.generation => routing.graph().clone(),
            _ => return MonitorOutcome::NoActivePath,
        };

        let Some(kbps) = self.recorder.measure(&graph, set.generation, &set.paths, index) else {
            return MonitorOutcome::NoData;
        };
        tracing::debug!(throughputs = ?self.recorder.table().samples(), "Monitor");

        if self.band.is_congested(kbps) {
            tracing::info!(path = index, kbps, "Congestion detected");
            match self.coordinator.trigger() {
                Some(_) => MonitorOutcome::Scheduled { index, kbps },
                None => MonitorOutcome::Busy,
            }
        } else if kbps <= self.band.lower_kbps {
            MonitorOutcome::Idle { index, kbps }
        } else {
            MonitorOutcome::Healthy { index, kbps }
        }
    }

    /// Tick every period until `shutdown` flips
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("Monitoring every {:?}", self.period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let outcome = self.tick();
                    tracing::trace!(?outcome, "Monitor cycle");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Monitor stopped");
    }
}
