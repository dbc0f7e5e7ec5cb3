//! Forwarding rule sinks

use adaptive_common::{AdaptiveResult, FlowRule};
use parking_lot::Mutex;

/// Programs forwarding rules into the data plane
///
/// Installing the same rule twice must be harmless.
pub trait FlowActuator: Send + Sync {
    /// Install one rule
    fn install(&self, rule: &FlowRule) -> AdaptiveResult<()>;
}

/// Actuator that only logs the rules it receives
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingActuator;

impl FlowActuator for LoggingActuator {
    fn install(&self, rule: &FlowRule) -> AdaptiveResult<()> {
        tracing::info!(priority = rule.priority, "Install {}", rule);
        Ok(())
    }
}

/// Actuator keeping every installed rule in memory
#[derive(Debug, Default)]
pub struct MemoryActuator {
    rules: Mutex<Vec<FlowRule>>,
}

impl MemoryActuator {
    /// Create empty actuator
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules installed so far, in order
    pub fn rules(&self) -> Vec<FlowRule> {
        self.rules.lock().clone()
    }

    /// Drain recorded rules
    pub fn take(&self) -> Vec<FlowRule> {
        std::mem::take(&mut *self.rules.lock())
    }
}

impl FlowActuator for MemoryActuator {
    fn install(&self, rule: &FlowRule) -> AdaptiveResult<()> {
        tracing::debug!("Install {}", rule);
        self.rules.lock().push(*rule);
        Ok(())
    }
}
