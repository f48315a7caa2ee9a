//! The [`BundleTree`] grouper: a prefix trie over port-name tokens enriched
//! with vector detection and passthrough-path flattening.
//!
//! Nodes live in a single contiguous arena (`Vec<BundleTreeNode>`); `parent`
//! is an index, not a pointer, per the dense-side-table redesign note for
//! the earlier per-node dynamic-attribute style.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::bundle::{Bundle, Interface};
use crate::lexer::{is_contiguous_range, words_from_name};
use crate::model::Port;

/// Index into a [`BundleTree`]'s node arena.
pub type NodeId = usize;

/// One node of the trie. A node either holds child pointers (one per
/// outgoing name-token edge) or has been tagged a vector (its digit
/// children collapsed into `vports`) — never both.
#[derive(Debug, Clone)]
pub struct BundleTreeNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// Edge token → child node id, ordered for deterministic traversal.
    pub children: BTreeMap<String, NodeId>,
    /// Full token path from the root, joined by `_` (this node's prefix).
    pub label: String,
    /// A port stored directly at this node (this node's own full name
    /// matched no further token).
    pub port: Option<Port>,
    pub is_vector: bool,
    /// Populated only when `is_vector`; sorted by numeric index ascending.
    pub vports: Vec<Port>,
    /// The actual `[min..max]` digit-token range collapsed into `vports`
    /// (not necessarily `0..len-1`: a vector may start at a nonzero index).
    pub vec_range: (u32, u32),
    interface: Option<Interface>,
}

impl BundleTreeNode {
    fn new(id: NodeId, parent: Option<NodeId>, label: String) -> Self {
        BundleTreeNode {
            id,
            parent,
            children: BTreeMap::new(),
            label,
            port: None,
            is_vector: false,
            vports: Vec::new(),
            vec_range: (0, 0),
            interface: None,
        }
    }
}

/// The prefix-tree grouper: produces a ranked stream of candidate
/// [`Interface`]s over a flat port list.
#[derive(Debug, Clone)]
pub struct BundleTree {
    nodes: Vec<BundleTreeNode>,
    root: NodeId,
    name: String,
    /// Port name → the leaf or vector-tagged node that owns it, for the
    /// leaf-to-root walk in `optimal_nids`.
    leaf_owner: HashMap<String, NodeId>,
}

/// Abstraction over "something that groups ports into candidate
/// interfaces". Both the prefix-tree grouper and the optional
/// Mahalanobis-clustering grouper implement this, so the rest of the
/// pipeline is indifferent to which produced the candidates.
pub trait Grouper {
    fn initial_interfaces(&self, min_size: usize, max_size: Option<usize>) -> Vec<(NodeId, Interface)>;
    fn optimal_nids(&self, cost_map: &BTreeMap<NodeId, f64>, min_leaves: usize) -> HashSet<NodeId>;
    /// Top-level bundles, for bundle-only documentation output.
    fn bundles(&self) -> Vec<Bundle>;
    fn name(&self) -> &str;
}

impl BundleTree {
    /// Build the trie from a flat port list, then run vector detection and
    /// passthrough flattening.
    pub fn new(mut ports: Vec<Port>) -> Self {
        ports.sort(); // tie-break: ports by name
        let mut nodes = vec![BundleTreeNode::new(0, None, String::new())];
        let root = 0;
        for port in &ports {
            insert_port(&mut nodes, root, port);
        }
        let mut tree = BundleTree { nodes, root, name: "root".to_string(), leaf_owner: HashMap::new() };
        tree.format_vectors(root);
        tree.flatten_passthru(root);
        tree.rename_root();
        tree.compute_interfaces(tree.root);
        tree.build_leaf_owner();
        tree
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &BundleTreeNode {
        &self.nodes[id]
    }

    /// Depth-first, root-first walk of every node currently reachable via
    /// the (post-flatten) children maps.
    pub fn reachable_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(nid) = stack.pop() {
            out.push(nid);
            for &child in self.nodes[nid].children.values() {
                stack.push(child);
            }
        }
        out
    }

    fn format_vectors(&mut self, node_id: NodeId) {
        let child_ids: Vec<NodeId> = self.nodes[node_id].children.values().cloned().collect();
        for &cid in &child_ids {
            self.format_vectors(cid);
        }
        self.try_tag_vector(node_id);
    }

    fn try_tag_vector(&mut self, node_id: NodeId) {
        let children = &self.nodes[node_id].children;
        if children.len() < 2 || self.nodes[node_id].port.is_some() {
            return;
        }
        // Every child must be a pure-digit edge token forming a singleton
        // path down to a leaf, and every child must itself have no children
        // of its own other than that singleton path.
        let mut indices: Vec<(u32, NodeId)> = Vec::new();
        for (token, &child_id) in children.iter() {
            let Ok(idx) = token.parse::<u32>() else { return };
            if !is_singleton_leaf_path(&self.nodes, child_id) {
                return;
            }
            indices.push((idx, child_id));
        }
        let idx_values: Vec<u32> = indices.iter().map(|(i, _)| *i).collect();
        if !is_contiguous_range(&idx_values) {
            return;
        }
        // Collect the leaf ports at the bottom of each singleton path and
        // verify uniform width/direction.
        let mut vports: Vec<(u32, Port)> = Vec::new();
        for &(idx, child_id) in &indices {
            let leaf = deepest_leaf(&self.nodes, child_id);
            let Some(port) = self.nodes[leaf].port.clone() else { return };
            vports.push((idx, port));
        }
        let (first_width, first_dir) = {
            let (_, p) = &vports[0];
            (p.width, p.direction)
        };
        if !vports.iter().all(|(_, p)| p.width == first_width && p.direction == first_dir) {
            return;
        }
        vports.sort_by_key(|(idx, _)| *idx);
        let min_index = vports.first().unwrap().0;
        let max_index = vports.last().unwrap().0;
        self.nodes[node_id].is_vector = true;
        self.nodes[node_id].vports = vports.into_iter().map(|(_, p)| p).collect();
        self.nodes[node_id].vec_range = (min_index, max_index);
        self.nodes[node_id].children.clear();
    }

    fn flatten_passthru(&mut self, node_id: NodeId) {
        let child_ids: Vec<NodeId> = self.nodes[node_id].children.values().cloned().collect();
        for &cid in &child_ids {
            self.flatten_passthru(cid);
        }
        loop {
            let entries: Vec<(String, NodeId)> =
                self.nodes[node_id].children.iter().map(|(k, v)| (k.clone(), *v)).collect();
            let mut spliced = false;
            for (token, child_id) in entries {
                let child = &self.nodes[child_id];
                if child.port.is_none() && !child.is_vector && child.children.len() == 1 {
                    let (gc_token, gc_id) = child.children.iter().next().map(|(k, v)| (k.clone(), *v)).unwrap();
                    let new_token = format!("{token}_{gc_token}");
                    self.nodes[node_id].children.remove(&token);
                    self.nodes[node_id].children.insert(new_token, gc_id);
                    self.nodes[gc_id].parent = Some(node_id);
                    spliced = true;
                }
            }
            if !spliced {
                break;
            }
        }
    }

    fn rename_root(&mut self) {
        if self.nodes[self.root].children.len() == 1 && self.nodes[self.root].port.is_none() {
            let (token, child_id) = self.nodes[self.root]
                .children
                .iter()
                .next()
                .map(|(k, v)| (k.clone(), *v))
                .unwrap();
            if !self.nodes[child_id].is_vector {
                self.nodes[child_id].parent = None;
                self.root = child_id;
                self.name = token.trim_matches('_').to_string();
                return;
            }
        }
        self.name = "root".to_string();
    }

    fn compute_interfaces(&mut self, node_id: NodeId) -> Interface {
        let child_ids: Vec<NodeId> = self.nodes[node_id].children.values().cloned().collect();
        let mut child_interfaces: Vec<(NodeId, Interface)> = Vec::new();
        for &cid in &child_ids {
            let iface = self.compute_interfaces(cid);
            child_interfaces.push((cid, iface));
        }

        let interface = if self.nodes[node_id].is_vector {
            let n = &self.nodes[node_id];
            let (w, d) = n
                .vports
                .first()
                .map(|p| (p.width, p.direction))
                .unwrap_or((None, crate::model::Direction::In));
            let (min_index, max_index) = n.vec_range;
            let bundle = Bundle::vector(n.label.clone(), n.vports.clone(), min_index, max_index, w, d);
            Interface::new(n.label.clone(), vec![bundle])
        } else {
            let mut passthrough_bundles: Vec<Bundle> = Vec::new();
            let mut leftover_ports: Vec<Port> = Vec::new();
            if let Some(port) = self.nodes[node_id].port.clone() {
                leftover_ports.push(port);
            }
            for (cid, child_iface) in child_interfaces {
                let is_plain_leaf =
                    self.nodes[cid].children.is_empty() && !self.nodes[cid].is_vector && self.nodes[cid].port.is_some();
                if is_plain_leaf {
                    leftover_ports.push(self.nodes[cid].port.clone().unwrap());
                } else {
                    passthrough_bundles.extend(child_iface.bundles);
                }
            }
            if !leftover_ports.is_empty() {
                let label = self.nodes[node_id].label.clone();
                passthrough_bundles.push(Bundle::non_vector(label, leftover_ports));
            }
            let label = self.nodes[node_id].label.clone();
            Interface::new(label, passthrough_bundles)
        };

        self.nodes[node_id].interface = Some(interface.clone());
        interface
    }

    fn build_leaf_owner(&mut self) {
        let mut owner = HashMap::new();
        for nid in self.reachable_nodes() {
            let node = &self.nodes[nid];
            if node.is_vector {
                for p in &node.vports {
                    owner.insert(p.name.clone(), nid);
                }
            } else if node.children.is_empty() {
                if let Some(p) = &node.port {
                    owner.insert(p.name.clone(), nid);
                }
            }
        }
        self.leaf_owner = owner;
    }

    fn interface_of(&self, node_id: NodeId) -> &Interface {
        self.nodes[node_id].interface.as_ref().expect("interfaces computed at construction")
    }

    /// The root's direct leaf children only (the spec's "rest"), used when
    /// the root's full interface spans ≥100 ports and is too large to
    /// plausibly be one bus. Deeper subgroups are already covered by the
    /// rest of `initial_interfaces`'s node walk, so only a port stored
    /// directly at the root, or at one of the root's immediate plain-leaf
    /// children, is collected here.
    fn abbreviated_root_interface(&self) -> Interface {
        let root = &self.nodes[self.root];
        let mut ports: Vec<Port> = Vec::new();
        if let Some(p) = &root.port {
            ports.push(p.clone());
        }
        for &child_id in root.children.values() {
            let child = &self.nodes[child_id];
            if !child.is_vector && child.children.is_empty() {
                if let Some(p) = &child.port {
                    ports.push(p.clone());
                }
            }
        }
        let label = format!("{}_rest", self.name);
        Interface::new(label.clone(), vec![Bundle::non_vector(label, ports)])
    }
}

impl Grouper for BundleTree {
    fn initial_interfaces(&self, min_size: usize, max_size: Option<usize>) -> Vec<(NodeId, Interface)> {
        let mut out = Vec::new();
        for nid in self.reachable_nodes() {
            let iface = self.interface_of(nid);
            let size = iface.size();

            // A huge undifferentiated root almost never maps to a real bus;
            // yield only its direct leaf children ("the rest") in abbreviated
            // form rather than the full span.
            if nid == self.root && size >= 100 {
                let abbreviated = self.abbreviated_root_interface();
                let abbrev_size = abbreviated.size();
                if abbrev_size >= min_size && max_size.map_or(true, |max| abbrev_size <= max) {
                    out.push((nid, abbreviated));
                }
                continue;
            }

            if size < min_size {
                continue;
            }
            if let Some(max) = max_size {
                if size > max {
                    continue;
                }
            }
            out.push((nid, iface.clone()));
        }
        out
    }

    fn optimal_nids(&self, cost_map: &BTreeMap<NodeId, f64>, min_leaves: usize) -> HashSet<NodeId> {
        optimal_nids_impl(&self.nodes, &self.leaf_owner, self.root, cost_map, min_leaves)
    }

    fn bundles(&self) -> Vec<Bundle> {
        self.interface_of(self.root).bundles.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Shared by both groupers: leaf-vote de-confliction. Never returns empty.
pub(crate) fn optimal_nids_impl(
    nodes: &[BundleTreeNode],
    leaf_owner: &HashMap<String, NodeId>,
    root: NodeId,
    cost_map: &BTreeMap<NodeId, f64>,
    min_leaves: usize,
) -> HashSet<NodeId> {
    let mut votes: BTreeMap<NodeId, usize> = BTreeMap::new();
    for &leaf_nid in leaf_owner.values() {
        let mut best: Option<(NodeId, f64)> = None;
        let mut cur = Some(leaf_nid);
        while let Some(nid) = cur {
            if let Some(&cost) = cost_map.get(&nid) {
                if best.map(|(_, c)| cost < c).unwrap_or(true) {
                    best = Some((nid, cost));
                }
            }
            cur = nodes[nid].parent;
        }
        if let Some((nid, _)) = best {
            *votes.entry(nid).or_insert(0) += 1;
        }
    }

    let mut threshold = min_leaves.max(1);
    loop {
        let winners: HashSet<NodeId> = votes.iter().filter(|(_, &v)| v >= threshold).map(|(&k, _)| k).collect();
        if !winners.is_empty() {
            return winners;
        }
        if threshold == 1 {
            break;
        }
        threshold -= 1;
    }

    if let Some((&best_nid, _)) = votes.iter().max_by_key(|(_, &v)| v) {
        return HashSet::from([best_nid]);
    }
    HashSet::from([root])
}

fn insert_port(nodes: &mut Vec<BundleTreeNode>, root: NodeId, port: &Port) {
    let tokens = words_from_name(&port.name);
    let mut cur = root;
    let mut label = String::new();
    for (i, token) in tokens.iter().enumerate() {
        label = if i == 0 { token.clone() } else { format!("{label}_{token}") };
        if let Some(&child) = nodes[cur].children.get(token) {
            cur = child;
        } else {
            let id = nodes.len();
            nodes.push(BundleTreeNode::new(id, Some(cur), label.clone()));
            nodes[cur].children.insert(token.clone(), id);
            cur = id;
        }
    }
    nodes[cur].port = Some(port.clone());
}

fn is_singleton_leaf_path(nodes: &[BundleTreeNode], mut node_id: NodeId) -> bool {
    loop {
        let node = &nodes[node_id];
        if node.is_vector {
            return false;
        }
        match node.children.len() {
            0 => return node.port.is_some(),
            1 => {
                node_id = *node.children.values().next().unwrap();
            }
            _ => return false,
        }
    }
}

fn deepest_leaf(nodes: &[BundleTreeNode], mut node_id: NodeId) -> NodeId {
    loop {
        let node = &nodes[node_id];
        match node.children.len() {
            1 => node_id = *node.children.values().next().unwrap(),
            _ => return node_id,
        }
    }
}
