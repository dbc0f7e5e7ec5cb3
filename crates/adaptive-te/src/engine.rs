//! Traffic engine wiring selection, installation, monitoring and switching

use crate::actuator::FlowActuator;
use crate::config::AdaptiveConfig;
use crate::control::ControlTarget;
use crate::coordinator::{PathSwitchCoordinator, SwitchGuard};
use crate::forwarding::PathInstaller;
use crate::monitor::ThroughputMonitor;
use crate::telemetry::TelemetryProvider;
use crate::throughput::{ThroughputLog, ThroughputRecorder};
use adaptive_common::{AdaptiveResult, FlowRule, PacketIn, TopologySnapshot};
use adaptive_path::{PathSelector, Selection};
use std::sync::Arc;

/// Adaptive traffic engine
pub struct TrafficEngine {
    selector: Arc<PathSelector>,
    installer: Arc<PathInstaller>,
    recorder: Arc<ThroughputRecorder>,
    coordinator: Arc<PathSwitchCoordinator>,
    monitor: Arc<ThroughputMonitor>,
}

impl TrafficEngine {
    /// Build the engine from configuration
    ///
    /// Truncates the throughput log when one is configured and applies the
    /// static topology, if any.
    pub fn new(
        config: &AdaptiveConfig,
        telemetry: Arc<dyn TelemetryProvider>,
        actuator: Arc<dyn FlowActuator>,
    ) -> AdaptiveResult<Self> {
        config.validate()?;

        let log = config.throughput_log.as_ref().map(ThroughputLog::create).transpose()?;
        let selector = Arc::new(PathSelector::new(config.expected_topology));
        let installer = Arc::new(PathInstaller::new(
            config.hosts.iter().copied(),
            config.flow_pairs.clone(),
            actuator,
        ));
        let recorder = Arc::new(ThroughputRecorder::new(telemetry, log));
        let coordinator = Arc::new(PathSwitchCoordinator::new(
            selector.clone(),
            installer.clone(),
            recorder.clone(),
            Arc::new(SwitchGuard::new()),
            config.settle_period(),
        ));
        let monitor = Arc::new(ThroughputMonitor::new(
            selector.clone(),
            recorder.clone(),
            coordinator.clone(),
            config.congestion,
            config.monitor_period(),
        ));

        let engine = Self {
            selector,
            installer,
            recorder,
            coordinator,
            monitor,
        };
        if let Some(topology) = &config.topology {
            engine.apply_topology(topology)?;
        }
        Ok(engine)
    }

    /// Path selector
    pub fn selector(&self) -> &Arc<PathSelector> {
        &self.selector
    }

    /// Throughput recorder
    pub fn recorder(&self) -> &Arc<ThroughputRecorder> {
        &self.recorder
    }

    /// Switch coordinator
    pub fn coordinator(&self) -> &Arc<PathSwitchCoordinator> {
        &self.coordinator
    }

    /// Throughput monitor, to be run on its own task
    pub fn monitor(&self) -> Arc<ThroughputMonitor> {
        self.monitor.clone()
    }

    /// Apply a topology report; returns whether routing is enabled
    pub fn apply_topology(&self, snapshot: &TopologySnapshot) -> AdaptiveResult<bool> {
        self.selector.update_topology(snapshot)
    }

    /// Route a punted packet and program the switch it came from
    ///
    /// Returns the installed rule. Packets are ignored while routing is
    /// disabled and for ether types other than IPv4 and ARP.
    pub fn handle_packet_in(&self, packet: &PacketIn) -> AdaptiveResult<Option<FlowRule>> {
        if !packet.eth_type.is_routable() || !self.selector.is_routing_enabled() {
            return Ok(None);
        }
        tracing::debug!("[PKT-IN] [SW-{}] {:?} {} -> {}", packet.switch, packet.eth_type, packet.src, packet.dst);

        let src = self.installer.host(packet.src)?.switch;
        let dst = self.installer.host(packet.dst)?.switch;
        let Some(selection) = self.selector.select(src, dst)? else {
            tracing::debug!("No path {} -> {}", src, dst);
            return Ok(None);
        };
        let Some(graph) = self.selector.graph() else {
            return Ok(None);
        };

        let rule = self.installer.rule_for_packet(&graph, &selection.path, packet)?;
        if let Some(rule) = &rule {
            self.installer.install(rule)?;
        }
        Ok(rule)
    }

    /// Begin the traffic session
    pub fn start(&self) {
        self.selector.start();
    }

    /// End the traffic session
    pub fn stop(&self) {
        self.selector.stop();
    }

    /// Recompute the shortest path for the last flow and install it
    ///
    /// Ignored while a path switch is running.
    pub fn reroute(&self) -> AdaptiveResult<Option<Selection>> {
        let Some(_permit) = self.coordinator.guard().try_begin() else {
            tracing::info!("Switch in progress, reroute ignored");
            return Ok(None);
        };
        let Some(selection) = self.selector.reroute()? else {
            return Ok(None);
        };
        if let Some(graph) = self.selector.graph() {
            self.installer.install_path(&graph, &selection.path)?;
        }
        Ok(Some(selection))
    }
}

impl ControlTarget for TrafficEngine {
    fn start(&self) {
        TrafficEngine::start(self);
    }

    fn stop(&self) {
        TrafficEngine::stop(self);
    }

    fn reroute(&self) {
        if let Err(e) = TrafficEngine::reroute(self) {
            tracing::warn!("Reroute failed: {}", e);
        }
    }
}
