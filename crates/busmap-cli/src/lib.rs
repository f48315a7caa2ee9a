//! # busmap-cli: CLI adapter for busmap
//!
//! Everything the core inference engine in `busmap-core` deliberately stays
//! out of: command-line parsing, JSON5/JSON I/O and schema, bus-definition
//! file discovery and loading, progress-bar rendering, and candidate-file
//! emission.
//!
//! ## Command Structure
//!
//! ```text
//! busmap
//! ├── propose <component.json5> -b <bus-def-dir>   # propose bus interfaces
//! └── bundle  <component.json5>                    # bundle tree only
//! ```
//!
//! ## Modules
//!
//! - [`cli`] - command structures and arg parsing (via clap)
//! - [`component`] - component.json5 port-list loading
//! - [`busdef`] - bus-definition spec discovery and parsing
//! - [`emitter`] - candidate-file and bundle-tree JSON emission

pub mod busdef;
pub mod cli;
pub mod component;
pub mod emitter;

pub use cli::{build_cli_command, Cli, Commands};
