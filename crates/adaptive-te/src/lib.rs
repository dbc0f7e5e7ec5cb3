//! Adaptive Traffic Engineering
//!
//! Watches the throughput of the active path and, when it falls into the
//! congestion band, measures every candidate path and moves the flow to the
//! fastest one.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   tick    ┌─────────────────────┐measure/install┌──────────────┐
//! │   Monitor    │ ────────▶ │  Switch coordinator │ ──────────────▶ │ FlowActuator │
//! └──────┬───────┘           └──────────┬──────────┘                 └──────────────┘
//!        │ sample                       │ commit
//!        ▼                              ▼
//! ┌──────────────┐           ┌─────────────────────┐
//! │  Telemetry   │           │    PathSelector     │ ◀── topology, packet-in, control
//! └──────────────┘           └─────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod actuator;
pub mod config;
pub mod control;
pub mod coordinator;
pub mod engine;
pub mod forwarding;
pub mod monitor;
pub mod telemetry;
pub mod throughput;

#[cfg(test)]
mod testing;

pub use actuator::{FlowActuator, LoggingActuator, MemoryActuator};
pub use config::{AdaptiveConfig, CongestionBand};
pub use control::{ControlCommand, ControlTarget, RemoteControlChannel};
pub use coordinator::{PathSwitchCoordinator, SwitchGuard, SwitchPermit, SwitchPhase, SwitchReport};
pub use engine::TrafficEngine;
pub use forwarding::PathInstaller;
pub use monitor::{MonitorOutcome, ThroughputMonitor};
pub use telemetry::{sample_path, PortBandwidth, StaticTelemetry, TelemetryProvider};
pub use throughput::{ThroughputLog, ThroughputRecorder, ThroughputTable};
