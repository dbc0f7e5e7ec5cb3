//! Recorded per-path throughput

use crate::telemetry::{sample_path, TelemetryProvider};
use adaptive_common::AdaptiveResult;
use adaptive_path::{Graph, PathSet};
use chrono::Utc;
use parking_lot::Mutex;
use std::fs::File;
use std::io::Write;
use std::path::Path as FsPath;
use std::sync::Arc;

#[derive(Debug, Default)]
struct TableState {
    generation: u64,
    samples: Vec<u32>,
}

/// Last recorded throughput (kbps) of each candidate path
///
/// Slots are aligned with one path set generation. A zero sample means the
/// switch has not reported yet and never replaces a recorded non-zero value.
#[derive(Debug, Default)]
pub struct ThroughputTable {
    state: Mutex<TableState>,
}

impl ThroughputTable {
    /// Create empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the table track `len` paths of `generation`
    ///
    /// Samples are kept when both already match, otherwise reset to zero.
    pub fn align(&self, generation: u64, len: usize) {
        let mut state = self.state.lock();
        if state.generation != generation || state.samples.len() != len {
            state.generation = generation;
            state.samples = vec![0; len];
        }
    }

    /// Record a sample, returning the value stored afterwards
    ///
    /// `None` when the slot belongs to another generation or is out of range.
    pub fn record(&self, generation: u64, index: usize, kbps: u32) -> Option<u32> {
        let mut state = self.state.lock();
        if state.generation != generation {
            return None;
        }
        let slot = state.samples.get_mut(index)?;
        if kbps != 0 {
            *slot = kbps;
        }
        Some(*slot)
    }

    /// Recorded value of one path
    pub fn get(&self, index: usize) -> Option<u32> {
        self.state.lock().samples.get(index).copied()
    }

    /// All recorded values in path order
    pub fn samples(&self) -> Vec<u32> {
        self.state.lock().samples.clone()
    }

    /// Index and value of the highest sample; the first one wins a tie
    pub fn best(&self) -> Option<(usize, u32)> {
        let state = self.state.lock();
        let mut best: Option<(usize, u32)> = None;
        for (i, &kbps) in state.samples.iter().enumerate() {
            if best.map_or(true, |(_, max)| kbps > max) {
                best = Some((i, kbps));
            }
        }
        best
    }
}

/// Append-only text record of throughput samples
#[derive(Debug)]
pub struct ThroughputLog {
    file: Mutex<File>,
}

impl ThroughputLog {
    /// Create or truncate the log file
    pub fn create(path: impl AsRef<FsPath>) -> AdaptiveResult<Self> {
        let file = File::create(path.as_ref())?;
        tracing::info!("Throughput log at {}", path.as_ref().display());
        Ok(Self { file: Mutex::new(file) })
    }

    /// Append one sample line; failures are only logged
    pub fn append(&self, index: usize, kbps: u32) {
        let line = format!("{} path={} kbps={}\n", Utc::now().to_rfc3339(), index, kbps);
        let mut file = self.file.lock();
        if let Err(e) = file.write_all(line.as_bytes()).and_then(|_| file.flush()) {
            tracing::warn!("Throughput log write failed: {}", e);
        }
    }
}

/// Samples paths through telemetry and records the results
pub struct ThroughputRecorder {
    telemetry: Arc<dyn TelemetryProvider>,
    table: ThroughputTable,
    log: Option<ThroughputLog>,
}

impl ThroughputRecorder {
    /// Create recorder
    pub fn new(telemetry: Arc<dyn TelemetryProvider>, log: Option<ThroughputLog>) -> Self {
        Self {
            telemetry,
            table: ThroughputTable::new(),
            log,
        }
    }

    /// Recorded values
    pub fn table(&self) -> &ThroughputTable {
        &self.table
    }

    /// Sample candidate `index` of `paths` and record it
    ///
    /// Returns the recorded value, which differs from the raw sample when a
    /// zero reading was ignored. `None` when no reading is available.
    pub fn measure(&self, graph: &Graph, generation: u64, paths: &PathSet, index: usize) -> Option<u32> {
        let path = paths.get(index)?;
        let kbps = sample_path(graph, self.telemetry.as_ref(), path)?;

        self.table.align(generation, paths.len());
        let recorded = self.table.record(generation, index, kbps)?;
        tracing::debug!(path = index, kbps = recorded, raw = kbps, "Recorded throughput");
        if let Some(log) = &self.log {
            log.append(index, recorded);
        }
        Some(recorded)
    }
}
