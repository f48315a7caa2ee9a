//! Sideband & user-group disposition of a solved assignment, and the cost
//! aggregation that ranks the resulting [`BusMapping`]s.
//!
//! A solved [`crate::solver::solve_assignment`] result only distinguishes
//! "matched" from "unmatched". This module further splits the matched set
//! into a primary mapping and a *sideband* of weakly-named matches, folds in
//! physical ports that got no match at all, and — when the bus definition
//! declares user-port-groups — routes sideband ports into those groups by
//! prefix and direction. Every physical port ends up in exactly one of
//! `mapping`, `sideband_mapping`, `user_group_mapping`, `unmapped_ports`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bundle::Interface;
use crate::config::EngineConfig;
use crate::model::{BusDef, BusSignal, MatchCost, Port};
use crate::solver::{match_cost, solve_assignment};

/// A proposed bus-definition match for one candidate [`Interface`]: the
/// primary port↔signal mapping plus its sideband, user-group, and residual
/// dispositions, and the costs that rank it against sibling candidates.
#[derive(Debug, Clone)]
pub struct BusMapping {
    /// Cumulative cost of the full disposition (§4.5), width/direction
    /// cumulative and name-cost normalized to an average per physical port.
    pub cost: MatchCost,
    /// The coarse feasibility cost that got this bus-def selected as a
    /// candidate in the first place, carried along for diagnostics.
    pub fcost: MatchCost,
    /// Primary port→signal assignment (strong name match).
    pub mapping: Vec<(Port, BusSignal)>,
    /// Weakly-matched or entirely unmatched physical ports. `None` when the
    /// solver found no match for that port at all. Empty whenever the
    /// bus-def declares user-port-groups (everything here gets routed into
    /// `user_group_mapping` or `unmapped_ports` instead).
    pub sideband_mapping: Vec<(Port, Option<BusSignal>)>,
    /// User-group template signal name → physical ports assigned to it.
    pub user_group_mapping: HashMap<String, Vec<Port>>,
    /// Physical ports that matched no user group (only populated when the
    /// bus-def declares user-port-groups; otherwise everything that would
    /// land here instead sits in `sideband_mapping`).
    pub unmapped_ports: Vec<Port>,
    /// Non-owning back-reference to the bus-def this mapping was solved
    /// against.
    pub bus_def: Arc<BusDef>,
    /// The solver fell back to the LP relaxation because the greedy pass
    /// collided.
    pub used_lp_fallback: bool,
    /// The LP relaxation itself failed to solve; the greedy (possibly
    /// colliding) result was kept and this cost is degenerate. Spec
    /// §7 `LPInfeasible` — theoretically unreachable given the bipartite
    /// transportation structure, but surfaced rather than silently assumed.
    pub degenerate: bool,
}

impl BusMapping {
    /// All physical ports across all four buckets, for the partition
    /// invariant in spec §8.
    pub fn all_ports(&self) -> Vec<Port> {
        let mut out: Vec<Port> = self.mapping.iter().map(|(p, _)| p.clone()).collect();
        out.extend(self.sideband_mapping.iter().map(|(p, _)| p.clone()));
        out.extend(self.user_group_mapping.values().flatten().cloned());
        out.extend(self.unmapped_ports.iter().cloned());
        out
    }
}

/// Count of `signal`'s name tokens that do not appear among `port`'s name
/// tokens — the "missing tokens" measure used to separate a confident
/// primary match from a sideband guess.
fn missing_token_count(signal: &BusSignal, port: &Port) -> usize {
    let port_words: std::collections::HashSet<String> = port.words().into_iter().collect();
    signal.words().into_iter().filter(|w| !port_words.contains(w)).count()
}

fn median_usize(counts: &[usize]) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    let mut sorted = counts.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
    }
}

/// Solve the assignment between `interface` and `bus_def`, then partition it
/// into primary/sideband/user-group/unmapped buckets and compute the
/// aggregate cost (spec §4.4–§4.5).
pub fn build_bus_mapping(
    interface: &Interface,
    bus_def: &Arc<BusDef>,
    fcost: MatchCost,
    cfg: &EngineConfig,
) -> BusMapping {
    let ports = interface.ports_to_map();
    let mut signals: Vec<BusSignal> = interface_bus_signals(bus_def);
    signals.sort_by(|a, b| a.name.cmp(&b.name));
    let dup_tokens = interface.duplicated_tokens();

    let solved = solve_assignment(&ports, &signals, &dup_tokens, cfg);

    let missing_counts: Vec<usize> =
        solved.mapping.iter().map(|(p, s)| missing_token_count(s, p)).collect();
    let cutoff = median_usize(&missing_counts) + 1.0;

    let mut primary: Vec<(Port, BusSignal)> = Vec::new();
    let mut sideband: Vec<(Port, Option<BusSignal>)> = Vec::new();
    let mut mapped_names: std::collections::HashSet<String> = std::collections::HashSet::new();
    for (port, signal) in solved.mapping {
        mapped_names.insert(port.name.clone());
        if missing_token_count(&signal, &port) as f64 > cutoff {
            sideband.push((port, Some(signal)));
        } else {
            primary.push((port, signal));
        }
    }
    for port in &ports {
        if !mapped_names.contains(&port.name) {
            sideband.push((port.clone(), None));
        }
    }
    sideband.sort_by(|a, b| a.0.name.cmp(&b.0.name));

    let (sideband_mapping, user_group_mapping, unmapped_ports) =
        if bus_def.user_port_groups.is_empty() {
            (sideband, HashMap::new(), Vec::new())
        } else {
            let (groups, unmapped) = assign_user_groups(interface, sideband, bus_def);
            (Vec::new(), groups, unmapped)
        };

    let cost = aggregate_cost(&primary, &sideband_mapping, bus_def, &ports, &dup_tokens, cfg);

    BusMapping {
        cost,
        fcost,
        mapping: primary,
        sideband_mapping,
        user_group_mapping,
        unmapped_ports,
        bus_def: bus_def.clone(),
        used_lp_fallback: solved.used_lp_fallback,
        degenerate: solved.degenerate,
    }
}

fn interface_bus_signals(bus_def: &BusDef) -> Vec<BusSignal> {
    let mut out = bus_def.required_signals.clone();
    out.extend(bus_def.optional_signals.iter().cloned());
    out
}

/// Walk each sideband port: after stripping the interface's common prefix,
/// find the first user-group whose prefix a name token starts with and
/// whose direction matches the port's direction. Ports matching none of the
/// declared groups fall to `unmapped_ports`.
fn assign_user_groups(
    interface: &Interface,
    sideband: Vec<(Port, Option<BusSignal>)>,
    bus_def: &BusDef,
) -> (HashMap<String, Vec<Port>>, Vec<Port>) {
    let mut groups: HashMap<String, Vec<Port>> = HashMap::new();
    let mut unmapped: Vec<Port> = Vec::new();
    for (port, _) in sideband {
        let stem = port.name.strip_prefix(interface.prefix.as_str()).unwrap_or(port.name.as_str());
        let stem = stem.trim_start_matches('_');
        let tokens = crate::lexer::words_from_name(stem);
        let hit = tokens.iter().find_map(|tok| {
            bus_def
                .user_port_groups
                .iter()
                .find(|(prefix, template)| tok.starts_with(prefix.as_str()) && template.direction == port.direction)
        });
        match hit {
            Some((_, template)) => groups.entry(template.name.clone()).or_default().push(port),
            None => unmapped.push(port),
        }
    }
    for ports in groups.values_mut() {
        ports.sort();
    }
    unmapped.sort();
    (groups, unmapped)
}

/// `sum(match_cost over primary) + (0,1,1)*|sideband_mapping| (if enabled)
/// + (0,1,1)*|required signals unmapped by primary|`, then normalize `nc`
/// by the total physical port count so name cost reads as an average per
/// wire while width/direction stay cumulative (spec §4.5).
fn aggregate_cost(
    primary: &[(Port, BusSignal)],
    sideband_mapping: &[(Port, Option<BusSignal>)],
    bus_def: &BusDef,
    ports: &[Port],
    dup_tokens: &std::collections::HashSet<String>,
    cfg: &EngineConfig,
) -> MatchCost {
    let mut cost = primary
        .iter()
        .fold(MatchCost::zero(), |acc, (p, s)| acc.add(&match_cost(p, s, dup_tokens)));

    if cfg.penalize_sideband {
        cost = cost.add(&MatchCost::new(0.0, 1, 1).scale(sideband_mapping.len() as i64));
    }

    let mapped_signal_names: std::collections::HashSet<&str> =
        primary.iter().map(|(_, s)| s.name.as_str()).collect();
    let unmapped_required =
        bus_def.required_signals.iter().filter(|s| !mapped_signal_names.contains(s.name.as_str())).count();
    cost = cost.add(&MatchCost::new(0.0, 1, 1).scale(unmapped_required as i64));

    cost.normalize(ports.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::Bundle;
    use crate::model::{BusType, Direction, DriverType, Presence};

    fn port(name: &str, width: u32, dir: Direction) -> Port {
        Port::new(name, Some(width), dir)
    }

    fn sig(name: &str, width: u32, dir: Direction, presence: Presence) -> BusSignal {
        BusSignal { name: name.into(), width: Some(width), direction: dir, presence, user_group: None }
    }

    fn make_axi_bus_def() -> Arc<BusDef> {
        Arc::new(
            BusDef::new(
                BusType::default(),
                BusType { name: "axi4".into(), ..Default::default() },
                DriverType::Slave,
                vec![
                    sig("awvalid", 1, Direction::In, Presence::Required),
                    sig("awready", 1, Direction::Out, Presence::Required),
                ],
                vec![],
                vec![],
            )
            .unwrap(),
        )
    }

    #[test]
    fn strong_matches_stay_primary() {
        let ports =
            vec![port("axi0_awvalid", 1, Direction::In), port("axi0_awready", 1, Direction::Out)];
        let bundle = Bundle::non_vector("axi0".into(), ports);
        let iface = Interface::new("axi0".into(), vec![bundle]);
        let bus_def = make_axi_bus_def();
        let cfg = EngineConfig::default();
        let fcost = MatchCost::zero();
        let bm = build_bus_mapping(&iface, &bus_def, fcost, &cfg);
        assert_eq!(bm.mapping.len(), 2);
        assert!(bm.sideband_mapping.is_empty());
    }

    #[test]
    fn partition_covers_every_physical_port() {
        let ports = vec![
            port("axi0_awvalid", 1, Direction::In),
            port("axi0_awready", 1, Direction::Out),
            port("axi0_parity_extra", 1, Direction::In),
        ];
        let bundle = Bundle::non_vector("axi0".into(), ports.clone());
        let iface = Interface::new("axi0".into(), vec![bundle]);
        let bus_def = make_axi_bus_def();
        let cfg = EngineConfig::default();
        let bm = build_bus_mapping(&iface, &bus_def, MatchCost::zero(), &cfg);
        let mut covered: Vec<String> = bm.all_ports().into_iter().map(|p| p.name).collect();
        covered.sort();
        let mut expected: Vec<String> = ports.iter().map(|p| p.name.clone()).collect();
        expected.sort();
        assert_eq!(covered, expected);
    }

    #[test]
    fn user_groups_drain_sideband_bucket() {
        let ar = sig("ar_template", 1, Direction::In, Presence::Optional);
        let bus_def = Arc::new(
            BusDef::new(
                BusType::default(),
                BusType::default(),
                DriverType::Slave,
                vec![sig("awvalid", 1, Direction::In, Presence::Required)],
                vec![],
                vec![("ar".to_string(), ar)],
            )
            .unwrap(),
        );
        let ports = vec![
            port("axi0_awvalid", 1, Direction::In),
            port("axi0_ar_parity_en", 1, Direction::In),
            port("axi0_wlast", 1, Direction::Out),
        ];
        let bundle = Bundle::non_vector("axi0".into(), ports);
        let iface = Interface::new("axi0".into(), vec![bundle]);
        let cfg = EngineConfig::default();
        let bm = build_bus_mapping(&iface, &bus_def, MatchCost::zero(), &cfg);
        assert!(bm.sideband_mapping.is_empty());
        assert!(bm.user_group_mapping.get("ar_template").unwrap().iter().any(|p| p.name == "axi0_ar_parity_en"));
        assert!(bm.unmapped_ports.iter().any(|p| p.name == "axi0_wlast"));
    }

    /// The 24 classic AXI4 write/read channel signals, slave-side
    /// directions, `(name, width, direction)`.
    fn axi4_classic_signals() -> Vec<(&'static str, u32, Direction)> {
        use Direction::{In, Out};
        vec![
            // AW
            ("awid", 4, In),
            ("awaddr", 32, In),
            ("awlen", 8, In),
            ("awsize", 3, In),
            ("awburst", 2, In),
            ("awlock", 1, In),
            ("awcache", 4, In),
            ("awprot", 3, In),
            ("awvalid", 1, In),
            ("awready", 1, Out),
            // W
            ("wdata", 32, In),
            ("wstrb", 4, In),
            ("wlast", 1, In),
            ("wvalid", 1, In),
            ("wready", 1, Out),
            // B
            ("bid", 4, Out),
            ("bresp", 2, Out),
            ("bvalid", 1, Out),
            ("bready", 1, In),
            // AR
            ("arid", 4, In),
            ("araddr", 32, In),
            ("arlen", 8, In),
            ("arvalid", 1, In),
            ("arready", 1, Out),
        ]
    }

    fn flip(dir: Direction) -> Direction {
        match dir {
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
        }
    }

    fn axi4_classic_bus_def(driver_type: DriverType) -> Arc<BusDef> {
        let required = axi4_classic_signals()
            .into_iter()
            .map(|(name, width, dir)| {
                let dir = if driver_type == DriverType::Slave { dir } else { flip(dir) };
                sig(name, width, dir, Presence::Required)
            })
            .collect();
        Arc::new(
            BusDef::new(
                BusType::default(),
                BusType { name: "axi4".into(), ..Default::default() },
                driver_type,
                required,
                vec![],
                vec![],
            )
            .unwrap(),
        )
    }

    /// Scenario 4 (spec §8): 24 classic AXI4 channel ports plus six
    /// parity-style sideband ports. The best mapping must be the slave
    /// side, with the 24 real ports primary and the parity ports confined
    /// to `sideband_mapping`.
    #[test]
    fn scenario_axi4_classic_isolates_parity_sidebands_as_slave() {
        let mut ports: Vec<Port> = axi4_classic_signals()
            .into_iter()
            .map(|(name, width, dir)| port(&format!("axi0_{}", name.to_uppercase()), width, dir))
            .collect();
        let parity_ports = [
            ("axi0_AWADDR_PARITY", 32),
            ("axi0_WDATA_PARITY", 32),
            ("axi0_ARADDR_PARITY", 32),
            ("axi0_AWID_PARITY", 4),
            ("axi0_WSTRB_PARITY", 4),
            ("axi0_ARID_PARITY", 4),
        ];
        for (name, width) in parity_ports {
            ports.push(port(name, width, Direction::In));
        }

        let bundle = Bundle::non_vector("axi0".into(), ports);
        let iface = Interface::new("axi0".into(), vec![bundle]);
        let cfg = EngineConfig::default();

        let slave_def = axi4_classic_bus_def(DriverType::Slave);
        let master_def = axi4_classic_bus_def(DriverType::Master);
        let slave_bm = build_bus_mapping(&iface, &slave_def, MatchCost::zero(), &cfg);
        let master_bm = build_bus_mapping(&iface, &master_def, MatchCost::zero(), &cfg);

        assert!(slave_bm.cost.value(&cfg) < master_bm.cost.value(&cfg));
        assert_eq!(slave_bm.mapping.len(), 24);
        assert_eq!(slave_bm.sideband_mapping.len(), 6);

        for (name, _, _) in axi4_classic_signals() {
            let expected_port = format!("axi0_{}", name.to_uppercase());
            assert!(
                slave_bm.mapping.iter().any(|(p, s)| p.name == expected_port && s.name == name),
                "expected {expected_port} to map primarily to {name}"
            );
        }
        for (name, _) in parity_ports {
            assert!(slave_bm.sideband_mapping.iter().any(|(p, _)| p.name == name));
            assert!(!slave_bm.mapping.iter().any(|(p, _)| p.name == name));
        }
    }

    /// Scenario 6 (spec §8): declared user-groups `AR/AW/W/B/R`, all facing
    /// `+1`. Every `+1` sideband port is routed to its matching group; the
    /// one `-1` port lands in `unmapped_ports`.
    #[test]
    fn scenario_user_groups_route_by_prefix_and_direction() {
        let groups: Vec<(String, BusSignal)> = [("ar", "ar_user"), ("aw", "aw_user"), ("w", "w_user"), ("b", "b_user"), ("r", "r_user")]
            .into_iter()
            .map(|(prefix, name)| {
                (prefix.to_string(), sig(name, 1, Direction::In, Presence::Optional))
            })
            .collect();
        let bus_def = Arc::new(
            BusDef::new(
                BusType::default(),
                BusType::default(),
                DriverType::Slave,
                vec![sig("awvalid", 1, Direction::In, Presence::Required)],
                vec![],
                groups,
            )
            .unwrap(),
        );

        let ports = vec![
            port("axi0_awvalid", 1, Direction::In),
            port("axi0_AR_PARITY_EN", 1, Direction::In),
            port("axi0_AW_PARITY", 1, Direction::In),
            port("axi0_RPARITY_EN", 1, Direction::In),
            port("axi0_W_PARITY", 1, Direction::In),
            port("axi0_B_PARITY", 1, Direction::In),
            port("axi0_AR_PARITY_OUT", 1, Direction::Out),
        ];
        let bundle = Bundle::non_vector("axi0".into(), ports);
        let iface = Interface::new("axi0".into(), vec![bundle]);
        let cfg = EngineConfig::default();
        let bm = build_bus_mapping(&iface, &bus_def, MatchCost::zero(), &cfg);

        assert!(bm.sideband_mapping.is_empty());
        assert_eq!(bm.mapping.len(), 1);
        assert!(bm.user_group_mapping["ar_user"].iter().any(|p| p.name == "axi0_AR_PARITY_EN"));
        assert!(bm.user_group_mapping["aw_user"].iter().any(|p| p.name == "axi0_AW_PARITY"));
        assert!(bm.user_group_mapping["r_user"].iter().any(|p| p.name == "axi0_RPARITY_EN"));
        assert!(bm.user_group_mapping["w_user"].iter().any(|p| p.name == "axi0_W_PARITY"));
        assert!(bm.user_group_mapping["b_user"].iter().any(|p| p.name == "axi0_B_PARITY"));
        assert_eq!(bm.unmapped_ports.len(), 1);
        assert_eq!(bm.unmapped_ports[0].name, "axi0_AR_PARITY_OUT");
    }

    #[test]
    fn cost_is_never_negative() {
        let ports = vec![port("axi0_awvalid", 1, Direction::In)];
        let bundle = Bundle::non_vector("axi0".into(), ports);
        let iface = Interface::new("axi0".into(), vec![bundle]);
        let bus_def = make_axi_bus_def();
        let cfg = EngineConfig::default();
        let bm = build_bus_mapping(&iface, &bus_def, MatchCost::zero(), &cfg);
        assert!(bm.cost.value(&cfg) >= 0.0);
    }
}
