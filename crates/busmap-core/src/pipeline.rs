//! Top-level orchestration tying the grouper, fcost filter, assignment
//! solver, and disposition together into the global selector (spec §4.6):
//! a non-overlapping set of `(Interface, ranked BusMappings)` across the
//! whole candidate tree.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::bundle::Interface;
use crate::config::EngineConfig;
use crate::disposition::{build_bus_mapping, BusMapping};
use crate::fcost::{compute_fcost, rank_bus_defs, FcostFlavor};
use crate::model::{BusDef, Port};
use crate::tree::{BundleTree, Grouper, NodeId};

/// One grouper node's candidate interface, together with every surviving
/// bus-def mapping solved for it, cheapest first.
#[derive(Debug, Clone)]
pub struct CandidateGroup {
    pub interface: Interface,
    pub mappings: Vec<BusMapping>,
}

/// Infer bus-interface structure for a flat port list against a bus-def
/// library: build the default [`BundleTree`] grouper and run the full
/// pipeline over it.
pub fn infer_bus_interfaces(
    ports: &[Port],
    bus_defs: &[Arc<BusDef>],
    cfg: &EngineConfig,
) -> Vec<CandidateGroup> {
    let tree = BundleTree::new(ports.to_vec());
    infer_with_grouper(&tree, bus_defs, cfg)
}

/// Same as [`infer_bus_interfaces`] but against a caller-supplied
/// [`Grouper`] — the hook the optional Mahalanobis-clustering grouper
/// (`cluster-grouper` feature) plugs into, since both groupers expose the
/// same `initial_interfaces`/`optimal_nids` surface (spec §4.2).
pub fn infer_with_grouper<G: Grouper>(
    grouper: &G,
    bus_defs: &[Arc<BusDef>],
    cfg: &EngineConfig,
) -> Vec<CandidateGroup> {
    if bus_defs.is_empty() {
        return Vec::new();
    }
    let candidates = grouper.initial_interfaces(cfg.min_interface_size, cfg.max_interface_size);
    if candidates.is_empty() {
        return Vec::new();
    }

    let evaluated = evaluate_candidates(candidates, bus_defs, cfg);

    let mut cost_map: BTreeMap<NodeId, f64> = BTreeMap::new();
    for (nid, _, mappings) in &evaluated {
        if let Some(best) = mappings.first() {
            cost_map.insert(*nid, best.cost.value(cfg));
        }
    }

    let optimal = grouper.optimal_nids(&cost_map, cfg.min_leaves);

    let mut result: Vec<CandidateGroup> = evaluated
        .into_iter()
        .filter(|(nid, _, mappings)| optimal.contains(nid) && !mappings.is_empty())
        .map(|(_, interface, mappings)| CandidateGroup { interface, mappings })
        .collect();

    result.sort_by(|a, b| {
        let ca = a.mappings[0].cost.value(cfg);
        let cb = b.mappings[0].cost.value(cfg);
        ca.partial_cmp(&cb).unwrap().then_with(|| a.interface.prefix.cmp(&b.interface.prefix))
    });
    result
}

fn evaluate_candidates(
    candidates: Vec<(NodeId, Interface)>,
    bus_defs: &[Arc<BusDef>],
    cfg: &EngineConfig,
) -> Vec<(NodeId, Interface, Vec<BusMapping>)> {
    #[cfg(feature = "parallel")]
    if cfg.parallel {
        use rayon::prelude::*;
        return candidates
            .into_par_iter()
            .map(|(nid, iface)| {
                let mappings = evaluate_one(&iface, bus_defs, cfg);
                (nid, iface, mappings)
            })
            .collect();
    }
    candidates
        .into_iter()
        .map(|(nid, iface)| {
            let mappings = evaluate_one(&iface, bus_defs, cfg);
            (nid, iface, mappings)
        })
        .collect()
}

/// Fcost-rank bus-defs for one interface, solve the assignment for every
/// survivor, and return the resulting mappings cheapest first.
fn evaluate_one(iface: &Interface, bus_defs: &[Arc<BusDef>], cfg: &EngineConfig) -> Vec<BusMapping> {
    let survivors = rank_bus_defs(iface, bus_defs, cfg.fcost_top_k_global, cfg.fcost_top_k_local);
    let mut mappings: Vec<BusMapping> = survivors
        .into_iter()
        .map(|bus_def| {
            let fcost = compute_fcost(iface, &bus_def, FcostFlavor::Global);
            build_bus_mapping(iface, &bus_def, fcost, cfg)
        })
        .collect();
    // Tie-break (spec §5): bus-defs sort by (abstract_type.name, driver_type).
    mappings.sort_by(|a, b| {
        a.cost
            .value(cfg)
            .partial_cmp(&b.cost.value(cfg))
            .unwrap()
            .then_with(|| a.bus_def.abstract_type.name.cmp(&b.bus_def.abstract_type.name))
            .then_with(|| a.bus_def.driver_type.to_string().cmp(&b.bus_def.driver_type.to_string()))
    });
    mappings
}
