//! Candidate-file and bundle-tree JSON emission (spec §6, "Output" and
//! "Bundle-only output").
//!
//! Two independent shapes:
//!
//! - [`build_candidate_file`] — the `map` command's output: one entry per
//!   accepted [`CandidateGroup`], best bus-def mapping first, alternates
//!   listed alongside by `$ref`.
//! - [`bundle_tree_json`] — the `bundle` command's output: the raw
//!   [`BundleTree`] with no bus-def matching at all.

use std::collections::BTreeMap;

use busmap_core::{Bundle, BusMapping, BundleTree, Interface, NodeId};
use busmap_core::pipeline::CandidateGroup;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct Ref {
    #[serde(rename = "$ref")]
    reference: String,
}

#[derive(Debug, Serialize)]
struct BusTypeOut {
    vendor: String,
    library: String,
    name: String,
    version: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum PortMapValue {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Serialize)]
struct AbstractionTypeOut {
    #[serde(rename = "portMaps")]
    port_maps: BTreeMap<String, PortMapValue>,
}

#[derive(Debug, Serialize)]
struct GeneratedBusInterface {
    name: String,
    #[serde(rename = "interfaceMode")]
    interface_mode: String,
    #[serde(rename = "busType")]
    bus_type: BusTypeOut,
    #[serde(rename = "abstractionTypes")]
    abstraction_types: Vec<AbstractionTypeOut>,
}

#[derive(Debug, Serialize)]
pub struct CandidateFile {
    #[serde(rename = "busInterfaces")]
    bus_interfaces: Vec<Ref>,
    #[serde(rename = "generatedBusInterfaces")]
    generated_bus_interfaces: BTreeMap<String, GeneratedBusInterface>,
}

/// Build the full candidate file from the inference pipeline's result:
/// every accepted portgroup's ranked bus-def mappings, each becoming one
/// `generatedBusInterfaces` entry referenced by the `busInterfaces` list,
/// best mapping first.
pub fn build_candidate_file(groups: &[CandidateGroup]) -> CandidateFile {
    let mut bus_interfaces = Vec::new();
    let mut generated = BTreeMap::new();

    for group in groups {
        for (rank, mapping) in group.mappings.iter().enumerate() {
            let key = generated_key(&group.interface, mapping, rank);
            bus_interfaces.push(Ref { reference: format!("#/generatedBusInterfaces/{key}") });
            generated.insert(key, generated_bus_interface(&group.interface, mapping));
        }
    }

    CandidateFile { bus_interfaces, generated_bus_interfaces: generated }
}

fn generated_key(interface: &Interface, mapping: &BusMapping, rank: usize) -> String {
    let base = format!(
        "{}_{}_{}",
        interface.prefix.trim_matches('_'),
        mapping.bus_def.abstract_type.name,
        mapping.bus_def.driver_type
    );
    if rank == 0 {
        base
    } else {
        format!("{base}_alt{rank}")
    }
}

fn generated_bus_interface(interface: &Interface, mapping: &BusMapping) -> GeneratedBusInterface {
    let bus_def = &mapping.bus_def;
    let mut port_maps: BTreeMap<String, PortMapValue> = BTreeMap::new();

    for (port, signal) in &mapping.mapping {
        let names = expand_port_names(interface, &port.name);
        port_maps.insert(signal.name.clone(), pack(names));
    }
    for (signal_name, ports) in &mapping.user_group_mapping {
        let names: Vec<String> =
            ports.iter().flat_map(|p| expand_port_names(interface, &p.name)).collect();
        port_maps.insert(signal_name.clone(), pack(names));
    }

    let mut residual: Vec<String> = mapping
        .sideband_mapping
        .iter()
        .map(|(p, _)| p.name.clone())
        .chain(mapping.unmapped_ports.iter().map(|p| p.name.clone()))
        .flat_map(|name| expand_port_names(interface, &name))
        .collect();
    residual.sort();
    if !residual.is_empty() {
        port_maps.insert("__UMAP__".to_string(), pack(residual));
    }

    GeneratedBusInterface {
        name: interface.prefix.trim_matches('_').to_string(),
        interface_mode: bus_def.driver_type.to_string(),
        bus_type: BusTypeOut {
            vendor: bus_def.bus_type.vendor.clone(),
            library: bus_def.bus_type.library.clone(),
            name: bus_def.bus_type.name.clone(),
            version: bus_def.bus_type.version.clone(),
        },
        abstraction_types: vec![AbstractionTypeOut { port_maps }],
    }
}

fn pack(mut names: Vec<String>) -> PortMapValue {
    if names.len() == 1 {
        PortMapValue::One(names.pop().unwrap())
    } else {
        PortMapValue::Many(names)
    }
}

/// A name produced by [`Interface::ports_to_map`] may be a vector bundle's
/// representative (named by the bundle prefix); expand it back to the full
/// list of physical port names in index order. Any other name passes
/// through unchanged.
fn expand_port_names(interface: &Interface, name: &str) -> Vec<String> {
    for bundle in &interface.bundles {
        if let Bundle::Vector(v) = bundle {
            if v.prefix == name {
                return v.ports.iter().map(|p| p.name.clone()).collect();
            }
        }
    }
    vec![name.to_string()]
}

/// Serialize a [`BundleTree`] with no bus-def matching: vector leaves
/// become JSON arrays (index order), singleton leaves become bare port-name
/// strings, and internal nodes become objects keyed by edge token — except
/// a node whose parent has exactly one child, which is keyed `_` instead.
pub fn bundle_tree_json(tree: &BundleTree) -> Value {
    node_to_value(tree, tree.root_id())
}

fn node_to_value(tree: &BundleTree, nid: NodeId) -> Value {
    let node = tree.node(nid);

    if node.is_vector {
        return Value::Array(node.vports.iter().map(|p| Value::String(p.name.clone())).collect());
    }
    if node.children.is_empty() {
        return match &node.port {
            Some(port) => Value::String(port.name.clone()),
            None => Value::Object(serde_json::Map::new()),
        };
    }

    let single_child = node.children.len() == 1;
    let mut map = serde_json::Map::new();
    for (token, &child_id) in node.children.iter() {
        let key = if single_child { "_".to_string() } else { token.clone() };
        map.insert(key, node_to_value(tree, child_id));
    }
    if let Some(port) = &node.port {
        map.insert(port.name.clone(), Value::String(port.name.clone()));
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use busmap_core::pipeline::CandidateGroup;
    use busmap_core::{BusDef, BusSignal, BusType, Direction, DriverType, EngineConfig, Port, Presence};
    use std::sync::Arc;

    fn port(name: &str, width: u32, dir: Direction) -> Port {
        Port::new(name, Some(width), dir)
    }

    fn sig(name: &str, width: u32, dir: Direction, presence: Presence) -> BusSignal {
        BusSignal { name: name.into(), width: Some(width), direction: dir, presence, user_group: None }
    }

    #[test]
    fn candidate_file_references_generated_entries() {
        let bus_def = Arc::new(
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
        );
        let ports = vec![port("axi0_awvalid", 1, Direction::In), port("axi0_awready", 1, Direction::Out)];
        let bundle = Bundle::non_vector("axi0".into(), ports);
        let interface = Interface::new("axi0".into(), vec![bundle]);
        let cfg = EngineConfig::default();
        let mapping = busmap_core::disposition::build_bus_mapping(
            &interface,
            &bus_def,
            busmap_core::MatchCost::zero(),
            &cfg,
        );
        let groups = vec![CandidateGroup { interface, mappings: vec![mapping] }];
        let file = build_candidate_file(&groups);
        assert_eq!(file.bus_interfaces.len(), 1);
        assert_eq!(file.generated_bus_interfaces.len(), 1);
        let key = &file.bus_interfaces[0].reference;
        assert!(key.starts_with("#/generatedBusInterfaces/axi0_axi4_slave"));
    }

    #[test]
    fn bundle_tree_json_renders_vector_leaf_as_array() {
        let ports = vec![
            port("test_bit0", 1, Direction::In),
            port("test_bit1", 1, Direction::In),
            port("test_bit2", 1, Direction::In),
        ];
        let tree = BundleTree::new(ports);
        let value = bundle_tree_json(&tree);
        assert!(value.is_object() || value.is_array());
    }
}
