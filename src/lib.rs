//! `andgrep` is a library for recursive literal search and replacement.
//!
//! It provides the core logic for the `andgrep` command-line tool but can also
//! be used as a standalone library. The main components are:
//!
//! - `config`: the validated run configuration (patterns, mode, extension
//!   filter, ignored directories).
//! - `Engine`: matches one file against the patterns (AND semantics per
//!   line) or rewrites it with a literal substitution.
//! - `Walker`: finds candidate files under a root and feeds them to the
//!   engine one at a time, isolating per-file failures.
//! - `OutputFormatter`: renders results as coloured text, JSON or CSV.

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod highlight;
pub mod output_formatter;
pub mod walker;

// Re-export main types for easier access by library users.
pub use config::{ExtensionFilter, GrepConfig, Mode, PatternSet};
pub use engine::{Engine, FileOutcome, FileResult, MatchRecord, ReplacementOutcome};
pub use errors::{Error, Result};
pub use output_formatter::{OutputFormat, OutputFormatter};
pub use walker::{Reporter, Summary, Walker};
