//! Forwarding rule computation and installation along paths

use crate::actuator::FlowActuator;
use adaptive_common::{
    AdaptiveError, AdaptiveResult, EthType, FlowMatch, FlowPair, FlowRule, HostBinding, PacketIn, Path,
};
use adaptive_path::Graph;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Turns paths into per-switch rules and hands them to the actuator
pub struct PathInstaller {
    hosts: HashMap<Ipv4Addr, HostBinding>,
    pairs: Vec<FlowPair>,
    actuator: Arc<dyn FlowActuator>,
}

impl PathInstaller {
    /// Create installer for the given hosts and steered pairs
    pub fn new(
        hosts: impl IntoIterator<Item = HostBinding>,
        pairs: Vec<FlowPair>,
        actuator: Arc<dyn FlowActuator>,
    ) -> Self {
        Self {
            hosts: hosts.into_iter().map(|h| (h.ip, h)).collect(),
            pairs,
            actuator,
        }
    }

    /// Attachment point of a host
    pub fn host(&self, ip: Ipv4Addr) -> AdaptiveResult<&HostBinding> {
        self.hosts.get(&ip).ok_or(AdaptiveError::UnknownHost(ip))
    }

    /// Steered flow pairs
    pub fn pairs(&self) -> &[FlowPair] {
        &self.pairs
    }

    /// Bidirectional IPv4 rules for every flow pair anchored at the ends of `path`
    pub fn rules_for_path(&self, graph: &Graph, path: &Path) -> AdaptiveResult<Vec<FlowRule>> {
        let (Some(first), Some(last)) = (path.source(), path.destination()) else {
            return Ok(Vec::new());
        };
        let hops = path.switches();
        let mut rules = Vec::with_capacity(self.pairs.len() * hops.len() * 2);

        for pair in &self.pairs {
            let (a, b) = (self.host(pair.0)?, self.host(pair.1)?);
            let (near, far) = if a.switch == first && b.switch == last {
                (a, b)
            } else if b.switch == first && a.switch == last {
                (b, a)
            } else {
                tracing::debug!("Pair {} <-> {} not anchored on {}", pair.0, pair.1, path);
                continue;
            };

            let forward = ipv4_match(near.ip, far.ip);
            let reverse = ipv4_match(far.ip, near.ip);
            for (i, &switch) in hops.iter().enumerate() {
                let out = match hops.get(i + 1) {
                    Some(&next) => graph.egress_port(switch, next)?,
                    None => far.port,
                };
                rules.push(FlowRule::permanent(switch, forward, out));

                let back = match i.checked_sub(1).map(|j| hops[j]) {
                    Some(prev) => graph.egress_port(switch, prev)?,
                    None => near.port,
                };
                rules.push(FlowRule::permanent(switch, reverse, back));
            }
        }
        Ok(rules)
    }

    /// Install every rule of `path`, returning the rule count
    pub fn install_path(&self, graph: &Graph, path: &Path) -> AdaptiveResult<usize> {
        let rules = self.rules_for_path(graph, path)?;
        for rule in &rules {
            self.actuator.install(rule)?;
        }
        tracing::debug!(rules = rules.len(), "Installed {}", path);
        Ok(rules.len())
    }

    /// Rule for a punted packet on its own switch, if that switch is on `path`
    ///
    /// Leaves towards the next hop, or to the destination host's port on the
    /// last switch.
    pub fn rule_for_packet(&self, graph: &Graph, path: &Path, packet: &PacketIn) -> AdaptiveResult<Option<FlowRule>> {
        let Some(i) = path.position(packet.switch) else {
            return Ok(None);
        };
        let out = match path.switches().get(i + 1) {
            Some(&next) => graph.egress_port(packet.switch, next)?,
            None => self.host(packet.dst)?.port,
        };
        let flow_match = FlowMatch {
            eth_type: packet.eth_type,
            ipv4_src: packet.src,
            ipv4_dst: packet.dst,
        };
        Ok(Some(FlowRule::permanent(packet.switch, flow_match, out)))
    }

    /// Install a single rule
    pub fn install(&self, rule: &FlowRule) -> AdaptiveResult<()> {
        self.actuator.install(rule)
    }
}

fn ipv4_match(src: Ipv4Addr, dst: Ipv4Addr) -> FlowMatch {
    FlowMatch {
        eth_type: EthType::Ipv4,
        ipv4_src: src,
        ipv4_dst: dst,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::MemoryActuator;
    use adaptive_common::{Link, PortNo, SwitchId};

    fn s(n: u64) -> SwitchId {
        SwitchId::new(n)
    }

    const CLIENT: Ipv4Addr = Ipv4Addr::new(10, 0, 4, 2);
    const SERVER: Ipv4Addr = Ipv4Addr::new(10, 0, 2, 2);

    /// 1 --(p2/p1)-- 2 --(p3/p2)-- 3, client on 1:1, server on 3:1
    fn line() -> Graph {
        let links = vec![
            Link::new(s(1), PortNo(2), s(2)),
            Link::new(s(2), PortNo(1), s(1)),
            Link::new(s(2), PortNo(3), s(3)),
            Link::new(s(3), PortNo(2), s(2)),
        ];
        Graph::new([s(1), s(2), s(3)], links).unwrap()
    }

    fn installer(actuator: Arc<MemoryActuator>, pair: FlowPair) -> PathInstaller {
        let hosts = [
            HostBinding { ip: CLIENT, switch: s(1), port: PortNo(1) },
            HostBinding { ip: SERVER, switch: s(3), port: PortNo(1) },
        ];
        PathInstaller::new(hosts, vec![pair], actuator)
    }

    fn out_port(rules: &[FlowRule], switch: u64, src: Ipv4Addr, dst: Ipv4Addr) -> Option<PortNo> {
        rules
            .iter()
            .find(|r| r.switch == s(switch) && r.flow_match.ipv4_src == src && r.flow_match.ipv4_dst == dst)
            .map(|r| r.out_port)
    }

    #[test]
    fn test_rules_in_both_directions() {
        let actuator = Arc::new(MemoryActuator::new());
        let installer = installer(actuator.clone(), FlowPair(CLIENT, SERVER));
        let path = Path::new(vec![s(1), s(2), s(3)]);

        let count = installer.install_path(&line(), &path).unwrap();
        let rules = actuator.rules();
        assert_eq!(count, 6);
        assert_eq!(rules.len(), 6);

        assert_eq!(out_port(&rules, 1, CLIENT, SERVER), Some(PortNo(2)));
        assert_eq!(out_port(&rules, 2, CLIENT, SERVER), Some(PortNo(3)));
        assert_eq!(out_port(&rules, 3, CLIENT, SERVER), Some(PortNo(1)));

        assert_eq!(out_port(&rules, 3, SERVER, CLIENT), Some(PortNo(2)));
        assert_eq!(out_port(&rules, 2, SERVER, CLIENT), Some(PortNo(1)));
        assert_eq!(out_port(&rules, 1, SERVER, CLIENT), Some(PortNo(1)));

        assert!(rules.iter().all(|r| r.flow_match.eth_type == EthType::Ipv4));
    }

    #[test]
    fn test_pair_orientation_follows_path() {
        let actuator = Arc::new(MemoryActuator::new());
        let installer = installer(actuator, FlowPair(SERVER, CLIENT));
        let rules = installer
            .rules_for_path(&line(), &Path::new(vec![s(1), s(2), s(3)]))
            .unwrap();
        assert_eq!(out_port(&rules, 1, CLIENT, SERVER), Some(PortNo(2)));
        assert_eq!(out_port(&rules, 1, SERVER, CLIENT), Some(PortNo(1)));
    }

    #[test]
    fn test_unanchored_pair_is_skipped() {
        let actuator = Arc::new(MemoryActuator::new());
        let installer = installer(actuator, FlowPair(CLIENT, SERVER));
        let rules = installer.rules_for_path(&line(), &Path::new(vec![s(1), s(2)])).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_missing_hop_is_error() {
        let actuator = Arc::new(MemoryActuator::new());
        let installer = installer(actuator, FlowPair(CLIENT, SERVER));
        let result = installer.rules_for_path(&line(), &Path::new(vec![s(1), s(3)]));
        assert!(matches!(result, Err(AdaptiveError::MissingEdge { .. })));
    }

    #[test]
    fn test_packet_rule_on_own_switch() {
        let actuator = Arc::new(MemoryActuator::new());
        let installer = installer(actuator, FlowPair(CLIENT, SERVER));
        let graph = line();
        let path = Path::new(vec![s(1), s(2), s(3)]);
        let packet = |switch| PacketIn {
            switch: s(switch),
            eth_type: EthType::Arp,
            src: CLIENT,
            dst: SERVER,
        };

        let mid = installer.rule_for_packet(&graph, &path, &packet(2)).unwrap().unwrap();
        assert_eq!(mid.switch, s(2));
        assert_eq!(mid.out_port, PortNo(3));
        assert_eq!(mid.flow_match.eth_type, EthType::Arp);

        let edge = installer.rule_for_packet(&graph, &path, &packet(3)).unwrap().unwrap();
        assert_eq!(edge.out_port, PortNo(1));

        assert!(installer.rule_for_packet(&graph, &path, &packet(9)).unwrap().is_none());
    }

    #[test]
    fn test_unknown_host() {
        let installer = installer(Arc::new(MemoryActuator::new()), FlowPair(CLIENT, SERVER));
        assert!(matches!(
            installer.host(Ipv4Addr::new(1, 2, 3, 4)),
            Err(AdaptiveError::UnknownHost(_))
        ));
    }
}
