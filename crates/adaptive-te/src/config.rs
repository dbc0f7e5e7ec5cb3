//! Controller configuration

use adaptive_common::{
    AdaptiveError, AdaptiveResult, ExpectedTopology, FlowPair, HostBinding, TopologySnapshot,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Adaptive routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Remote control listen address
    pub control_addr: SocketAddr,
    /// Monitoring period in milliseconds
    pub monitor_period_ms: u64,
    /// Wait after installing a candidate before sampling it
    pub settle_period_ms: u64,
    /// Throughput band that triggers a path switch
    pub congestion: CongestionBand,
    /// Topology size required before routing
    pub expected_topology: ExpectedTopology,
    /// Host attachment points
    pub hosts: Vec<HostBinding>,
    /// Host pairs steered together
    pub flow_pairs: Vec<FlowPair>,
    /// Static topology applied at startup
    pub topology: Option<TopologySnapshot>,
    /// Append-only throughput record
    pub throughput_log: Option<PathBuf>,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            control_addr: SocketAddr::from(([127, 0, 0, 1], 6655)),
            monitor_period_ms: 2000,
            settle_period_ms: 2000,
            congestion: CongestionBand::default(),
            expected_topology: ExpectedTopology::default(),
            hosts: Vec::new(),
            flow_pairs: Vec::new(),
            topology: None,
            throughput_log: None,
        }
    }
}

impl AdaptiveConfig {
    /// Load from a JSON file and validate
    pub fn load(path: &str) -> AdaptiveResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| AdaptiveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &str) -> AdaptiveResult<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| AdaptiveError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> AdaptiveResult<()> {
        if self.monitor_period_ms == 0 || self.settle_period_ms == 0 {
            return Err(AdaptiveError::Config("periods must be non-zero".into()));
        }
        if self.congestion.lower_kbps >= self.congestion.upper_kbps {
            return Err(AdaptiveError::Config(format!(
                "congestion band ({}, {}) is empty",
                self.congestion.lower_kbps, self.congestion.upper_kbps
            )));
        }
        for pair in &self.flow_pairs {
            for ip in [pair.0, pair.1] {
                if !self.hosts.iter().any(|h| h.ip == ip) {
                    return Err(AdaptiveError::Config(format!("flow pair host {} has no binding", ip)));
                }
            }
        }
        Ok(())
    }

    /// Monitoring period
    pub fn monitor_period(&self) -> Duration {
        Duration::from_millis(self.monitor_period_ms)
    }

    /// Settle period
    pub fn settle_period(&self) -> Duration {
        Duration::from_millis(self.settle_period_ms)
    }
}

/// Open throughput interval `(lower, upper)` in kbps
///
/// Only mid-range throughput counts as congestion. At or below `lower` the
/// path is considered idle, at or above `upper` healthy; neither triggers a
/// switch. The open interval is intentional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CongestionBand {
    /// Exclusive lower bound
    pub lower_kbps: u32,
    /// Exclusive upper bound
    pub upper_kbps: u32,
}

impl CongestionBand {
    /// Create band
    pub const fn new(lower_kbps: u32, upper_kbps: u32) -> Self {
        Self { lower_kbps, upper_kbps }
    }

    /// Whether `kbps` lies strictly inside the band
    #[inline]
    pub fn is_congested(&self, kbps: u32) -> bool {
        self.lower_kbps < kbps && kbps < self.upper_kbps
    }
}

impl Default for CongestionBand {
    fn default() -> Self {
        Self::new(100, 1000)
    }
}
