//! Shared fixtures for unit tests

use crate::actuator::MemoryActuator;
use crate::coordinator::{PathSwitchCoordinator, SwitchGuard};
use crate::forwarding::PathInstaller;
use crate::telemetry::{PortBandwidth, StaticTelemetry};
use crate::throughput::ThroughputRecorder;
use adaptive_common::{FlowPair, HostBinding, Link, PortNo, SwitchId, TopologySnapshot};
use adaptive_path::PathSelector;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const SETTLE_MS: u64 = 2000;
pub(crate) const CLIENT: Ipv4Addr = Ipv4Addr::new(10, 0, 4, 2);
pub(crate) const SERVER: Ipv4Addr = Ipv4Addr::new(10, 0, 2, 2);

pub(crate) fn s(n: u64) -> SwitchId {
    SwitchId::new(n)
}

/// Switch 1 reaches switch 5 through 2, 3 or 4; each branch leaves on port 2
/// towards 5, which is where its throughput is read.
pub(crate) fn star_topology() -> TopologySnapshot {
    let mut links = Vec::new();
    for k in [2u64, 3, 4] {
        links.push(Link::new(s(1), PortNo(k as u32), s(k)));
        links.push(Link::new(s(k), PortNo(1), s(1)));
        links.push(Link::new(s(k), PortNo(2), s(5)));
        links.push(Link::new(s(5), PortNo(k as u32), s(k)));
    }
    TopologySnapshot::new((1..=5).map(s).collect(), links)
}

pub(crate) fn hosts() -> Vec<HostBinding> {
    vec![
        HostBinding { ip: CLIENT, switch: s(1), port: PortNo(10) },
        HostBinding { ip: SERVER, switch: s(5), port: PortNo(10) },
    ]
}

/// Report `kbps` on the measured port of branch `index` (0 = via switch 2)
pub(crate) fn set_branch(telemetry: &StaticTelemetry, index: usize, kbps: u32) {
    let switch = s(index as u64 + 2);
    telemetry.set(switch, PortNo(2), PortBandwidth::new(u64::from(kbps) * 1000, 0));
}

pub(crate) struct Fixture {
    pub selector: Arc<PathSelector>,
    pub telemetry: Arc<StaticTelemetry>,
    pub actuator: Arc<MemoryActuator>,
    pub recorder: Arc<ThroughputRecorder>,
    pub coordinator: Arc<PathSwitchCoordinator>,
}

pub(crate) fn star(kbps: [u32; 3]) -> Fixture {
    let selector = Arc::new(PathSelector::default());
    assert!(selector.update_topology(&star_topology()).unwrap());

    let telemetry = Arc::new(StaticTelemetry::new());
    for (i, v) in kbps.into_iter().enumerate() {
        set_branch(&telemetry, i, v);
    }

    let actuator = Arc::new(MemoryActuator::new());
    let installer = Arc::new(PathInstaller::new(hosts(), vec![FlowPair(CLIENT, SERVER)], actuator.clone()));
    let recorder = Arc::new(ThroughputRecorder::new(telemetry.clone(), None));
    let coordinator = Arc::new(PathSwitchCoordinator::new(
        selector.clone(),
        installer,
        recorder.clone(),
        Arc::new(SwitchGuard::new()),
        Duration::from_millis(SETTLE_MS),
    ));

    Fixture {
        selector,
        telemetry,
        actuator,
        recorder,
        coordinator,
    }
}
