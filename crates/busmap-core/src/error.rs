//! Crate-wide error type for busmap-core.

use thiserror::Error;

/// Errors the inference engine can surface.
///
/// Most of the pipeline is a pure-function "no-error" path — a bad match
/// simply scores a high [`crate::MatchCost`]. The variants here are the
/// handful of places construction or input validation can genuinely fail.
#[derive(Debug, Error)]
pub enum BusMapError {
    /// A bus-definition signal description was missing `wire`/`direction`,
    /// or declared a presence outside `{required, optional, illegal}`.
    /// Fatal to the load of that one spec; the caller should skip the file
    /// and log, not abort the whole run.
    #[error("malformed bus definition: {0}")]
    MalformedBusDef(String),

    /// Two user-group prefixes where one starts with the other, or an
    /// anonymous group coexists with named groups. Fatal at construction.
    #[error("ambiguous user-port groups in bus definition: {0}")]
    AmbiguousUserGroups(String),

    /// A physical port was claimed by more than one pre-existing bus
    /// interface on load. Not fatal — the adapter drops the duplicate
    /// assignments and the core proceeds with the rest — but surfaced here
    /// so adapters can report it consistently.
    #[error("port `{0}` duplicated across interfaces")]
    PortDuplicatedAcrossInterfaces(String),

    /// Failure to parse an input document (adapter boundary: JSON5, JSON).
    #[error("parse error: {0}")]
    Parse(String),

    /// Filesystem I/O failure at the adapter boundary.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type BusMapResult<T> = Result<T, BusMapError>;
