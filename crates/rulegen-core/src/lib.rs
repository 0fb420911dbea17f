//! Core engine for the rulegen build generator.
//!
//! This crate turns a declarative description of build steps into an
//! in-memory graph of rules and emits it as a flat, standalone artifact: a
//! classic Makefile, a ninja file, or a plain shell script. It is designed
//! to be consumed by the `rulegen` CLI without coupling to any particular
//! front-end; the whole construction surface is public.
//!
//! The engine is single-threaded and synchronous: rule construction,
//! hashing, and emission happen in program order. Parallelism is the
//! downstream runner's concern.

/// Housekeeping rules injected before emission: self-rebuild, clean, phony
/// collector, input verifier.
pub mod bootstrap;
/// Artifact emitters for the three output formats.
pub mod emit;
/// Rule-model error taxonomy.
pub mod error;
/// Single-pass variable expansion for command strings.
pub mod expand;
/// Content-hash marker rules that force reruns on command changes.
pub mod hashes;
/// Library-alias flattening and link-input expansion.
pub mod links;
/// Filesystem-free path canonicalization.
pub mod paths;
/// The project under construction and its rule constructors.
pub mod project;
/// The rule record and the arena-backed rule store.
pub mod rule;
/// Declarative TOML rules-file front-end.
pub mod rules_file;
/// Layered variable store with directory rebasing.
pub mod vars;

pub use bootstrap::RegenContext;
pub use error::Error;
pub use paths::{normalize_filename, split_filename};
pub use project::Project;
pub use rules_file::{Loader, to_list};
