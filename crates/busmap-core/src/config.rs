//! Engine-construction configuration.
//!
//! Everything that earlier revisions threaded through as scattered globals
//! (`show_progress`, solver message verbosity, cost weights) lives here
//! instead, constructed once per run and passed down the pipeline.

/// Tunables for a single inference run.
///
/// Constructed once (typically by the CLI adapter from flags/defaults) and
/// passed by reference through [`crate::infer_bus_interfaces`]. There is no
/// global mutable state in the core.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Weight on the name-cost term of [`crate::MatchCost::value`].
    pub name_weight: f64,
    /// Weight on the width-cost term.
    pub width_weight: f64,
    /// Weight on the direction-cost term.
    pub dir_weight: f64,
    /// Minimum number of leaf-port votes an `optimal_nids` candidate needs
    /// before threshold relaxation kicks in.
    pub min_leaves: usize,
    /// Minimum port count for a grouper node to be yielded as a candidate
    /// `Interface` by `initial_interfaces`.
    pub min_interface_size: usize,
    /// Maximum port count for a grouper node to be yielded uncollapsed;
    /// `None` means only the ≥100-port root-abbreviation rule applies.
    pub max_interface_size: Option<usize>,
    /// Number of top-ranked bus-defs to keep by global fcost.
    pub fcost_top_k_global: usize,
    /// Number of additional top-ranked bus-defs to keep by local fcost that
    /// were not already selected by the global ranking.
    pub fcost_top_k_local: usize,
    /// Evaluate (interface, bus-def) pairs across a `rayon` thread pool
    /// instead of sequentially. Requires the `parallel` feature.
    pub parallel: bool,
    /// Whether [`crate::disposition::build_bus_mapping`]'s cost aggregation
    /// charges a flat `(0,1,1)` penalty per sideband port — the "all ports
    /// should map cleanly" semantics called out as conditional in spec
    /// §4.5. On by default, matching the reference implementation's only
    /// configuration (it never ran with this disabled); an engine embedded
    /// in a tool that treats sideband signals as expected noise can turn it
    /// off to stop that from dragging down an otherwise-clean mapping.
    pub penalize_sideband: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            name_weight: 2.0,
            width_weight: 1.0,
            dir_weight: 4.0,
            min_leaves: 4,
            min_interface_size: 4,
            max_interface_size: None,
            fcost_top_k_global: 5,
            fcost_top_k_local: 4,
            parallel: false,
            penalize_sideband: true,
        }
    }
}
