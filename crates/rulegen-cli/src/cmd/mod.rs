//! Subcommand implementations.

/// Artifact emission subcommands (`makefile`, `ninjafile`, `scriptfile`).
pub mod emit;
/// The `show-vars` subcommand.
pub mod show_vars;
