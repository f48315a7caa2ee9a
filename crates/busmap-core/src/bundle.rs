//! [`Bundle`] (Vector/Directed/Undirected) and [`Interface`].

use std::collections::HashSet;

use crate::model::{Direction, Port};

/// A numeric-indexed run of otherwise-identical ports, e.g.
/// `test_bit0_n .. test_bit19_n`. `ports` is sorted by index ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorBundle {
    pub prefix: String,
    pub ports: Vec<Port>,
    pub min_index: u32,
    pub max_index: u32,
    pub width: Option<u32>,
    pub direction: Direction,
}

impl VectorBundle {
    pub fn range(&self) -> (u32, u32) {
        (self.min_index, self.max_index)
    }
}

/// A same-direction, non-vector sub-grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectedBundle {
    pub prefix: String,
    pub ports: Vec<Port>,
    pub direction: Direction,
}

/// A mixed-direction, non-vector sub-grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct UndirectedBundle {
    pub prefix: String,
    pub ports: Vec<Port>,
}

/// A sub-grouping inside an [`Interface`]: either a numeric-indexed
/// [`VectorBundle`], a same-direction [`DirectedBundle`], or a mixed
/// [`UndirectedBundle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Bundle {
    Vector(VectorBundle),
    Directed(DirectedBundle),
    Undirected(UndirectedBundle),
}

impl Bundle {
    pub fn prefix(&self) -> &str {
        match self {
            Bundle::Vector(b) => &b.prefix,
            Bundle::Directed(b) => &b.prefix,
            Bundle::Undirected(b) => &b.prefix,
        }
    }

    pub fn ports(&self) -> &[Port] {
        match self {
            Bundle::Vector(b) => &b.ports,
            Bundle::Directed(b) => &b.ports,
            Bundle::Undirected(b) => &b.ports,
        }
    }

    pub fn size(&self) -> usize {
        self.ports().len()
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Bundle::Vector(_))
    }

    /// Build a non-vector bundle, dispatching to `Directed` or `Undirected`
    /// based on whether all members share a direction.
    pub fn non_vector(prefix: String, mut ports: Vec<Port>) -> Bundle {
        ports.sort();
        let uniform_direction = ports
            .first()
            .map(|first| ports.iter().all(|p| p.direction == first.direction))
            .unwrap_or(true);
        if uniform_direction {
            let direction = ports.first().map(|p| p.direction).unwrap_or(Direction::In);
            Bundle::Directed(DirectedBundle { prefix, ports, direction })
        } else {
            Bundle::Undirected(UndirectedBundle { prefix, ports })
        }
    }

    pub fn vector(
        prefix: String,
        mut ports: Vec<Port>,
        min_index: u32,
        max_index: u32,
        width: Option<u32>,
        direction: Direction,
    ) -> Bundle {
        ports.sort();
        Bundle::Vector(VectorBundle { prefix, ports, min_index, max_index, width, direction })
    }
}

/// A proposed grouping of physical ports, candidate for matching against
/// [`crate::BusDef`]s. Port set equals the union of bundle ports exactly,
/// with no overlap between bundles.
#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    pub prefix: String,
    pub bundles: Vec<Bundle>,
}

impl Interface {
    /// Construct an interface, applying the tie-break sort over bundles:
    /// `(-size, prefix)`.
    pub fn new(prefix: String, mut bundles: Vec<Bundle>) -> Self {
        bundles.sort_by(|a, b| b.size().cmp(&a.size()).then_with(|| a.prefix().cmp(b.prefix())));
        Interface { prefix, bundles }
    }

    /// All physical ports in the interface, in bundle order.
    pub fn ports(&self) -> Vec<&Port> {
        self.bundles.iter().flat_map(|b| b.ports().iter()).collect()
    }

    pub fn size(&self) -> usize {
        self.bundles.iter().map(Bundle::size).sum()
    }

    /// #non-vector ports + #vector bundles.
    pub fn mapping_width(&self) -> usize {
        self.bundles
            .iter()
            .map(|b| if b.is_vector() { 1 } else { b.size() })
            .sum()
    }

    /// Collapse vector bundles into a single representative [`Port`] each
    /// (named by the bundle's prefix), leaving non-vector ports as-is. This
    /// is the port list the assignment solver actually matches against bus
    /// signals.
    pub fn ports_to_map(&self) -> Vec<Port> {
        ports_to_map_impl(self)
    }

    /// Tokens appearing in *every* port's name — these carry no
    /// discriminatory power for name-similarity costs and are excluded from
    /// them (the `duplicated_tokens` the spec's MatchCost `nc` subtracts).
    pub fn duplicated_tokens(&self) -> HashSet<String> {
        let mut ports = self.ports().into_iter();
        let first = match ports.next() {
            Some(p) => p.words().into_iter().collect::<HashSet<_>>(),
            None => return HashSet::new(),
        };
        ports.fold(first, |acc, port| {
            let words: HashSet<String> = port.words().into_iter().collect();
            acc.intersection(&words).cloned().collect()
        })
    }
}

fn ports_to_map_impl(iface: &Interface) -> Vec<Port> {
    let mut out = Vec::with_capacity(iface.bundles.len());
    for bundle in &iface.bundles {
        match bundle {
            Bundle::Vector(v) => out.push(Port::new(v.prefix.clone(), v.width, v.direction)),
            Bundle::Directed(d) => out.extend(d.ports.iter().cloned()),
            Bundle::Undirected(u) => out.extend(u.ports.iter().cloned()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(name: &str, width: u32, dir: Direction) -> Port {
        Port::new(name, Some(width), dir)
    }

    #[test]
    fn non_vector_dispatches_directed_when_uniform() {
        let ports = vec![port("a", 1, Direction::In), port("b", 1, Direction::In)];
        let bundle = Bundle::non_vector("p".into(), ports);
        assert!(matches!(bundle, Bundle::Directed(_)));
    }

    #[test]
    fn non_vector_dispatches_undirected_when_mixed() {
        let ports = vec![port("a", 1, Direction::In), port("b", 1, Direction::Out)];
        let bundle = Bundle::non_vector("p".into(), ports);
        assert!(matches!(bundle, Bundle::Undirected(_)));
    }

    #[test]
    fn ports_to_map_collapses_vector_bundles() {
        let vports = vec![port("bit0", 1, Direction::In), port("bit1", 1, Direction::In)];
        let vector = Bundle::vector("test_bit".into(), vports, 0, 1, Some(1), Direction::In);
        let directed = Bundle::non_vector("aux".into(), vec![port("aux_x", 1, Direction::In)]);
        let iface = Interface::new("test".into(), vec![vector, directed]);
        let mapped = iface.ports_to_map();
        assert_eq!(mapped.len(), 2);
        assert!(mapped.iter().any(|p| p.name == "test_bit"));
    }

    #[test]
    fn mapping_width_counts_vector_bundle_once() {
        let vports = vec![port("bit0", 1, Direction::In), port("bit1", 1, Direction::In)];
        let vector = Bundle::vector("test_bit".into(), vports, 0, 1, Some(1), Direction::In);
        let iface = Interface::new("test".into(), vec![vector]);
        assert_eq!(iface.mapping_width(), 1);
        assert_eq!(iface.size(), 2);
    }

    #[test]
    fn duplicated_tokens_are_shared_across_all_ports() {
        let ports = vec![port("axi0_awvalid", 1, Direction::In), port("axi0_awready", 1, Direction::Out)];
        let bundle = Bundle::non_vector("axi0".into(), ports);
        let iface = Interface::new("axi0".into(), vec![bundle]);
        let dup = iface.duplicated_tokens();
        assert!(dup.contains("axi"));
        assert!(dup.contains("0"));
        assert!(dup.contains("aw"));
        assert!(!dup.contains("valid"));
    }
}
