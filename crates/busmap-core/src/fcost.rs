//! Coarse feasibility cost (fcost): a cheap width/direction/name-token
//! pre-filter ranking `(Interface, BusDef)` pairs before the full
//! assignment solver runs.

use std::collections::{HashMap, HashSet};

use crate::bundle::Interface;
use crate::model::{jaccard_distance, BusDef, Direction, MatchCost, Port};

/// Global fcost multiplies its name-cost term by interface size and
/// penalizes leftover physical ports; local fcost is a bare fraction of
/// missing bus tokens with no such penalty. A caller ranks bus-defs by
/// both and keeps the top-5 global plus up to 4 additional top-local ones
/// not already selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FcostFlavor {
    Global,
    Local,
}

/// The set of all 1-, 2-, and 3-character substrings of the lowercased
/// name with underscores removed — an edit-distance-like proxy that is
/// `O(|name|)` to compute. Distinct from [`crate::lexer::words_from_name`],
/// which is used everywhere else (grouping, the solver's name cost).
pub fn fcost_tokens(name: &str) -> HashSet<String> {
    let cleaned: Vec<char> = name.chars().filter(|&c| c != '_').flat_map(|c| c.to_lowercase()).collect();
    let mut tokens = HashSet::new();
    for len in 1..=3usize {
        if cleaned.len() < len {
            continue;
        }
        for start in 0..=(cleaned.len() - len) {
            tokens.insert(cleaned[start..start + len].iter().collect::<String>());
        }
    }
    tokens
}

fn key_counts(ports: &[(Option<u32>, Direction)]) -> HashMap<(Option<u32>, Direction), i64> {
    let mut counts = HashMap::new();
    for key in ports {
        *counts.entry(*key).or_insert(0) += 1;
    }
    counts
}

/// Compute the coarse feasibility cost of matching `iface` against
/// `bus_def`.
pub fn compute_fcost(iface: &Interface, bus_def: &BusDef, flavor: FcostFlavor) -> MatchCost {
    let mapped: Vec<Port> = iface.ports_to_map();
    let phys_keys: Vec<(Option<u32>, Direction)> = mapped.iter().map(|p| (p.width, p.direction)).collect();
    let req_keys: Vec<(Option<u32>, Direction)> =
        bus_def.required_signals.iter().map(|s| (s.width, s.direction)).collect();
    let opt_keys: Vec<(Option<u32>, Direction)> =
        bus_def.optional_signals.iter().map(|s| (s.width, s.direction)).collect();

    let mut phys = key_counts(&phys_keys);
    let mut req = key_counts(&req_keys);
    let mut opt = key_counts(&opt_keys);

    let mut all_keys: HashSet<(Option<u32>, Direction)> = HashSet::new();
    all_keys.extend(phys.keys().copied());
    all_keys.extend(req.keys().copied());
    all_keys.extend(opt.keys().copied());

    let mut leftover_phys_by_dir: HashMap<Direction, i64> = HashMap::new();
    let mut leftover_req_by_dir: HashMap<Direction, i64> = HashMap::new();
    let mut leftover_opt_by_dir: HashMap<Direction, i64> = HashMap::new();

    for key in all_keys {
        let p = phys.remove(&key).unwrap_or(0);
        let r = req.remove(&key).unwrap_or(0);
        let o = opt.remove(&key).unwrap_or(0);
        let matched_req = p.min(r);
        let mut p = p - matched_req;
        let r = r - matched_req;
        let matched_opt = p.min(o);
        p -= matched_opt;
        let o = o - matched_opt;
        *leftover_phys_by_dir.entry(key.1).or_insert(0) += p;
        *leftover_req_by_dir.entry(key.1).or_insert(0) += r;
        *leftover_opt_by_dir.entry(key.1).or_insert(0) += o;
    }

    let mut cost = MatchCost::zero();
    for direction in [Direction::In, Direction::Out] {
        let mut p = *leftover_phys_by_dir.get(&direction).unwrap_or(&0);
        let r = *leftover_req_by_dir.get(&direction).unwrap_or(&0);
        let o = *leftover_opt_by_dir.get(&direction).unwrap_or(&0);

        let matched_req = p.min(r);
        cost = cost.add(&MatchCost::new(0.0, 1, 0).scale(matched_req));
        p -= matched_req;
        let unmatched_req = r - matched_req;
        cost = cost.add(&MatchCost::new(0.0, 4, 4).scale(unmatched_req));

        let matched_opt = p.min(o);
        cost = cost.add(&MatchCost::new(0.0, 1, 0).scale(matched_opt));
        p -= matched_opt;

        if matches!(flavor, FcostFlavor::Global) {
            cost = cost.add(&MatchCost::new(0.0, 1, 1).scale(p));
        }
    }

    let dup = duplicated_fcost_tokens(&mapped);
    let iface_tokens: HashSet<String> = mapped
        .iter()
        .flat_map(|p| fcost_tokens(&p.name))
        .filter(|tok| !dup.contains(tok))
        .collect();
    let bus_tokens: HashSet<String> = bus_def.all_signals().flat_map(|s| fcost_tokens(&s.name)).collect();

    let nc = match flavor {
        FcostFlavor::Global => jaccard_distance(&iface_tokens, &bus_tokens) * iface.size() as f64,
        FcostFlavor::Local => {
            if bus_tokens.is_empty() {
                0.0
            } else {
                let missing = bus_tokens.difference(&iface_tokens).count();
                missing as f64 / bus_tokens.len() as f64
            }
        }
    };

    MatchCost::new(nc, cost.wc, cost.dc)
}

fn duplicated_fcost_tokens(ports: &[Port]) -> HashSet<String> {
    let mut iter = ports.iter();
    let first = match iter.next() {
        Some(p) => fcost_tokens(&p.name),
        None => return HashSet::new(),
    };
    iter.fold(first, |acc, p| {
        let toks = fcost_tokens(&p.name);
        acc.intersection(&toks).cloned().collect()
    })
}

/// Rank bus-defs by fcost and keep the top-K global plus up to K' additional
/// top-local ones not already selected by the global ranking.
pub fn rank_bus_defs<'a>(
    iface: &Interface,
    bus_defs: &'a [std::sync::Arc<BusDef>],
    top_k_global: usize,
    top_k_local: usize,
) -> Vec<std::sync::Arc<BusDef>> {
    let mut by_global: Vec<(f64, usize)> = bus_defs
        .iter()
        .enumerate()
        .map(|(i, bd)| (compute_fcost(iface, bd, FcostFlavor::Global).value(&crate::config::EngineConfig::default()), i))
        .collect();
    by_global.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
    let global_selected: Vec<usize> = by_global.iter().take(top_k_global).map(|(_, i)| *i).collect();
    let global_set: HashSet<usize> = global_selected.iter().copied().collect();

    let mut by_local: Vec<(f64, usize)> = bus_defs
        .iter()
        .enumerate()
        .filter(|(i, _)| !global_set.contains(i))
        .map(|(i, bd)| (compute_fcost(iface, bd, FcostFlavor::Local).value(&crate::config::EngineConfig::default()), i))
        .collect();
    by_local.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
    let local_selected: Vec<usize> = by_local.iter().take(top_k_local).map(|(_, i)| *i).collect();

    global_selected
        .into_iter()
        .chain(local_selected)
        .map(|i| bus_defs[i].clone())
        .collect()
}
