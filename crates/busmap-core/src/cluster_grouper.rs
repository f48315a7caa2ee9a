//! The alternative grouper (spec §4.2, "present in earlier revisions,
//! retained as a design option"): Mahalanobis-weighted agglomerative
//! clustering over port names instead of a prefix trie.
//!
//! Each port name is vectorized into a sparse position-weighted token set
//! (`(N-i)^4` at token position `i`, strongly favoring a shared prefix),
//! single-linkage clustering builds a dendrogram over all ports, and
//! candidates are picked along each leaf's root path at its two largest
//! distance jumps. Behind the `cluster-grouper` feature and not wired into
//! the default pipeline — [`crate::tree::BundleTree`] is what
//! [`crate::pipeline::infer_bus_interfaces`] actually uses; this type only
//! exists so an embedder can plug it into
//! [`crate::pipeline::infer_with_grouper`] instead.
//!
//! This is quadratic-in-port-count (single-linkage over a full pairwise
//! distance matrix, recomputed per merge) and is not meant for components
//! with thousands of ports; the trie grouper has no such limit, which is
//! part of why it's the default.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::bundle::{Bundle, Interface};
use crate::lexer::{common_prefix, words_from_name};
use crate::model::Port;
use crate::tree::{Grouper, NodeId};

/// A node is too large to plausibly be one bus and is skipped as a
/// candidate outright, mirroring the `>=100`-port root-abbreviation rule
/// for the trie grouper but with the wider threshold the spec gives this
/// grouper specifically.
const MAX_CANDIDATE_SIZE: usize = 200;

#[derive(Debug, Clone)]
struct ClusterNode {
    parent: Option<NodeId>,
    children: (Option<NodeId>, Option<NodeId>),
    members: Vec<Port>,
    /// Single-linkage distance at which this node was formed; `0.0` for a
    /// leaf (a singleton cluster for one port).
    merge_distance: f64,
}

/// Single-linkage agglomerative clustering over port names, exposing the
/// same [`Grouper`] surface as [`crate::tree::BundleTree`].
#[derive(Debug, Clone)]
pub struct ClusterGrouper {
    nodes: Vec<ClusterNode>,
    root: NodeId,
    leaf_owner: HashMap<String, NodeId>,
}

impl ClusterGrouper {
    /// Build the dendrogram over `ports`. `O(n^3)` in the number of ports —
    /// fine for the hundreds-of-ports components this is meant for, not
    /// for huge flattened netlists.
    pub fn new(mut ports: Vec<Port>) -> Self {
        ports.sort();
        let n = ports.len();
        let vectors: Vec<HashMap<(usize, String), f64>> =
            ports.iter().map(|p| position_vector(&p.name)).collect();

        let mut nodes: Vec<ClusterNode> = Vec::with_capacity(2 * n.max(1));
        let mut leaf_owner = HashMap::new();
        let mut member_indices: HashMap<NodeId, Vec<usize>> = HashMap::new();
        let mut active: Vec<NodeId> = Vec::with_capacity(n);

        for (i, port) in ports.iter().enumerate() {
            let id = nodes.len();
            nodes.push(ClusterNode {
                parent: None,
                children: (None, None),
                members: vec![port.clone()],
                merge_distance: 0.0,
            });
            leaf_owner.insert(port.name.clone(), id);
            member_indices.insert(id, vec![i]);
            active.push(id);
        }

        while active.len() > 1 {
            let mut best: (usize, usize, f64) = (0, 1, f64::INFINITY);
            for a in 0..active.len() {
                for b in (a + 1)..active.len() {
                    let dist = single_linkage_distance(
                        &member_indices[&active[a]],
                        &member_indices[&active[b]],
                        &vectors,
                    );
                    if dist < best.2 {
                        best = (a, b, dist);
                    }
                }
            }
            let (a, b, dist) = best;
            let left = active[a];
            let right = active[b];
            let new_id = nodes.len();
            let mut members = nodes[left].members.clone();
            members.extend(nodes[right].members.iter().cloned());
            members.sort();
            let mut combined = member_indices[&left].clone();
            combined.extend(member_indices[&right].iter().cloned());

            nodes.push(ClusterNode {
                parent: None,
                children: (Some(left), Some(right)),
                members,
                merge_distance: dist,
            });
            nodes[left].parent = Some(new_id);
            nodes[right].parent = Some(new_id);
            member_indices.insert(new_id, combined);

            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            active.remove(hi);
            active.remove(lo);
            active.push(new_id);
        }

        let root = active.first().copied().unwrap_or(0);
        if nodes.is_empty() {
            nodes.push(ClusterNode { parent: None, children: (None, None), members: vec![], merge_distance: 0.0 });
        }
        ClusterGrouper { nodes, root, leaf_owner }
    }

    fn interface_of(&self, nid: NodeId) -> Interface {
        let members = self.nodes[nid].members.clone();
        let names: Vec<String> = members.iter().map(|p| p.name.clone()).collect();
        let prefix = common_prefix(&names);
        let bundle = Bundle::non_vector(prefix.clone(), members);
        Interface::new(prefix, vec![bundle])
    }

    /// Ancestor chain from `nid` up to the root, nearest first.
    fn ancestors(&self, nid: NodeId) -> Vec<NodeId> {
        let mut out = vec![nid];
        let mut cur = self.nodes[nid].parent;
        while let Some(p) = cur {
            out.push(p);
            cur = self.nodes[p].parent;
        }
        out
    }

    /// The two ancestor nodes (beyond the leaf itself) where the merge
    /// distance jumps the most, walking leaf-to-root — the spec's "two
    /// largest distance jumps" candidate-picking rule.
    fn jump_candidates(&self, leaf: NodeId) -> Vec<NodeId> {
        let chain = self.ancestors(leaf);
        if chain.len() < 2 {
            return chain;
        }
        let mut jumps: Vec<(usize, f64)> = (1..chain.len())
            .map(|i| (i, self.nodes[chain[i]].merge_distance - self.nodes[chain[i - 1]].merge_distance))
            .collect();
        jumps.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        jumps.truncate(2);
        jumps.into_iter().map(|(i, _)| chain[i]).collect()
    }
}

fn position_vector(name: &str) -> HashMap<(usize, String), f64> {
    let tokens = words_from_name(name);
    let n = tokens.len();
    let mut out = HashMap::with_capacity(n);
    for (i, tok) in tokens.into_iter().enumerate() {
        let weight = ((n - i) as f64).powi(4);
        out.insert((i, tok), weight);
    }
    out
}

/// Weighted Euclidean distance over the symmetric difference of two
/// position-weighted token sets (matching keys contribute zero, since the
/// weight at a given position is the same regardless of which port it came
/// from).
fn token_distance(a: &HashMap<(usize, String), f64>, b: &HashMap<(usize, String), f64>) -> f64 {
    let mut sum_sq = 0.0;
    for (key, w) in a {
        if !b.contains_key(key) {
            sum_sq += w * w;
        }
    }
    for (key, w) in b {
        if !a.contains_key(key) {
            sum_sq += w * w;
        }
    }
    sum_sq.sqrt()
}

fn single_linkage_distance(
    a_indices: &[usize],
    b_indices: &[usize],
    vectors: &[HashMap<(usize, String), f64>],
) -> f64 {
    let mut min_d = f64::INFINITY;
    for &i in a_indices {
        for &j in b_indices {
            let d = token_distance(&vectors[i], &vectors[j]);
            if d < min_d {
                min_d = d;
            }
        }
    }
    min_d
}

impl Grouper for ClusterGrouper {
    fn initial_interfaces(&self, min_size: usize, max_size: Option<usize>) -> Vec<(NodeId, Interface)> {
        let max = max_size.unwrap_or(MAX_CANDIDATE_SIZE).min(MAX_CANDIDATE_SIZE);
        let mut candidate_ids: HashSet<NodeId> = HashSet::new();
        for &leaf in self.leaf_owner.values() {
            candidate_ids.extend(self.jump_candidates(leaf));
        }
        let mut out: Vec<(NodeId, Interface)> = candidate_ids
            .into_iter()
            .filter(|&nid| {
                let size = self.nodes[nid].members.len();
                size >= min_size && size <= max
            })
            .map(|nid| (nid, self.interface_of(nid)))
            .collect();
        out.sort_by_key(|(nid, _)| *nid);
        out
    }

    fn optimal_nids(&self, cost_map: &BTreeMap<NodeId, f64>, min_leaves: usize) -> HashSet<NodeId> {
        let mut votes: BTreeMap<NodeId, usize> = BTreeMap::new();
        for &leaf in self.leaf_owner.values() {
            let mut best: Option<(NodeId, f64)> = None;
            let mut cur = Some(leaf);
            while let Some(nid) = cur {
                if let Some(&cost) = cost_map.get(&nid) {
                    if best.map(|(_, c)| cost < c).unwrap_or(true) {
                        best = Some((nid, cost));
                    }
                }
                cur = self.nodes[nid].parent;
            }
            if let Some((nid, _)) = best {
                *votes.entry(nid).or_insert(0) += 1;
            }
        }

        let mut threshold = min_leaves.max(1);
        loop {
            let winners: HashSet<NodeId> =
                votes.iter().filter(|(_, &v)| v >= threshold).map(|(&nid, _)| nid).collect();
            if !winners.is_empty() || threshold == 1 {
                if !winners.is_empty() {
                    return winners;
                }
                break;
            }
            threshold -= 1;
        }
        let fallback = votes.iter().max_by_key(|(_, &v)| v).map(|(&nid, _)| nid).unwrap_or(self.root);
        HashSet::from([fallback])
    }

    fn bundles(&self) -> Vec<Bundle> {
        self.interface_of(self.root).bundles.clone()
    }

    fn name(&self) -> &str {
        "cluster"
    }
}
