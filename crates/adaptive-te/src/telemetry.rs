//! Per-port bandwidth telemetry

use adaptive_common::{Path, PortNo, SwitchId};
use adaptive_path::Graph;
use dashmap::DashMap;

/// Port bandwidth as of the last statistics poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortBandwidth {
    /// Received bits per second
    pub rx_bps: u64,
    /// Transmitted bits per second
    pub tx_bps: u64,
}

impl PortBandwidth {
    /// Create reading
    pub const fn new(rx_bps: u64, tx_bps: u64) -> Self {
        Self { rx_bps, tx_bps }
    }

    /// Combined throughput in kbps, floored
    #[inline]
    pub fn kbps(&self) -> u32 {
        let kbps = self.rx_bps.saturating_add(self.tx_bps) / 1000;
        u32::try_from(kbps).unwrap_or(u32::MAX)
    }
}

/// Source of port bandwidth readings
///
/// `None` means no data is available for the port yet.
pub trait TelemetryProvider: Send + Sync {
    /// Latest reading for `(switch, port)`
    fn port_bandwidth(&self, switch: SwitchId, port: PortNo) -> Option<PortBandwidth>;
}

/// In-memory telemetry fed by an external poller
#[derive(Debug, Default)]
pub struct StaticTelemetry {
    readings: DashMap<(SwitchId, PortNo), PortBandwidth>,
}

impl StaticTelemetry {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading
    pub fn set(&self, switch: SwitchId, port: PortNo, reading: PortBandwidth) {
        self.readings.insert((switch, port), reading);
    }

    /// Forget a port
    pub fn clear(&self, switch: SwitchId, port: PortNo) {
        self.readings.remove(&(switch, port));
    }
}

impl TelemetryProvider for StaticTelemetry {
    fn port_bandwidth(&self, switch: SwitchId, port: PortNo) -> Option<PortBandwidth> {
        self.readings.get(&(switch, port)).map(|r| *r)
    }
}

/// Throughput of `path` in kbps, measured on its final hop
///
/// Reads the egress port of the second-to-last switch towards the last one.
/// `None` when the path has no link, the hop is not in the graph, or the
/// provider has no data.
pub fn sample_path(graph: &Graph, telemetry: &dyn TelemetryProvider, path: &Path) -> Option<u32> {
    let (measured, last) = path.last_hop()?;
    let port = match graph.egress_port(measured, last) {
        Ok(port) => port,
        Err(e) => {
            tracing::warn!("Cannot measure {}: {}", path, e);
            return None;
        }
    };

    let reading = telemetry.port_bandwidth(measured, port)?;
    let kbps = reading.kbps();
    tracing::debug!("[SW-{}-{}] {}kbps", measured, port, kbps);
    Some(kbps)
}
