//! # busmap-core: Bus-Interface Inference Engine
//!
//! Infers bus-interface structure from a flat list of hardware module ports.
//!
//! ## Design Philosophy
//!
//! Given a module's physical ports (name, width, direction) and a library of
//! formal bus definitions (each enumerating logical signals with
//! required/optional presence, width, direction, and driver role), the
//! engine proposes — for meaningful subgroups of the physical ports — the
//! best-matching bus definition(s) together with an explicit per-signal
//! mapping from physical port to logical bus signal. Ports left over are
//! grouped into a hierarchical name-based bundle tree for documentation.
//!
//! Data flows left to right through five cooperating stages:
//!
//! ```text
//! Ports ──▶ BundleTree (grouping + vectorization)
//!              │ for each candidate Interface
//!              ▼
//!          fcost filter ──▶ top-K bus-def candidates per interface
//!              │
//!              ▼
//!          assignment solver ──▶ BusMapping (primary + sideband + user-groups)
//!              │
//!              ▼
//!          optimal group selector ──▶ non-overlapping (Interface, ranked BusMappings)
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use busmap_core::{infer_bus_interfaces, BusDef, Direction, EngineConfig, Port};
//!
//! let ports = vec![
//!     Port::new("axi0_AWVALID", Some(1), Direction::In),
//!     Port::new("axi0_AWREADY", Some(1), Direction::Out),
//! ];
//! let bus_defs: Vec<std::sync::Arc<BusDef>> = vec![];
//! let results = infer_bus_interfaces(&ports, &bus_defs, &EngineConfig::default());
//! assert!(results.is_empty() || !results.is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`lexer`] - port/signal name tokenization
//! - [`model`] - the core data model (`Port`, `BusSignal`, `BusDef`, `MatchCost`)
//! - [`bundle`] - `Bundle` (Vector/Directed/Undirected) and `Interface`
//! - [`tree`] - the `BundleTree` grouper and the dense node arena it's built on
//! - [`fcost`] - coarse feasibility cost used to rank bus-def candidates
//! - [`solver`] - the assignment solver (greedy pass + LP fallback)
//! - [`disposition`] - sideband / user-group partitioning of a solved mapping
//! - [`pipeline`] - the top-level orchestration (`infer_bus_interfaces`)
//! - [`cluster_grouper`] - (feature `cluster-grouper`) alternative Mahalanobis-clustering grouper

pub mod bundle;
pub mod config;
pub mod disposition;
pub mod error;
pub mod fcost;
pub mod lexer;
pub mod model;
pub mod pipeline;
pub mod solver;
pub mod tree;

#[cfg(feature = "cluster-grouper")]
pub mod cluster_grouper;

pub use bundle::{Bundle, DirectedBundle, Interface, UndirectedBundle, VectorBundle};
pub use config::EngineConfig;
pub use disposition::BusMapping;
pub use error::{BusMapError, BusMapResult};
pub use model::{BusDef, BusSignal, BusType, Direction, DriverType, MatchCost, Port, Presence};
pub use pipeline::{infer_bus_interfaces, infer_with_grouper, CandidateGroup};
pub use tree::{BundleTree, Grouper, NodeId};

#[cfg(feature = "cluster-grouper")]
pub use cluster_grouper::ClusterGrouper;
