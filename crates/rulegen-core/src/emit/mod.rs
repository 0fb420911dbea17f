//! Artifact emitters.
//!
//! Three output formats share one walk: rules in descending priority (ties
//! broken by lexical output name), each rule emitted once even when reached
//! through several of its output keys. Artifacts are written to
//! `<artifact>.new` and renamed into place, so an aborted run never leaves a
//! half-written file behind.

/// Classic dependency-driven Makefile emitter.
pub mod makefile;
/// Graph-driven ninja emitter.
pub mod ninja;
/// Linear shell-script emitter.
pub mod script;

use anyhow::Context;
use std::fs;

use crate::links;
use crate::rule::{RuleId, RuleStore};

/// The `@` (silent) and `-` (ignore-errors) command prefixes, split off the
/// command body. The silent marker never survives into a joined pipeline or
/// a shell script, so only ignorability is kept.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CommandPrefix<'a> {
    pub ignore_errors: bool,
    pub body: &'a str,
}

impl<'a> CommandPrefix<'a> {
    pub(crate) fn parse(command: &'a str) -> Self {
        let mut ignore_errors = false;
        let mut body = command;
        loop {
            if let Some(rest) = body.strip_prefix('@') {
                body = rest;
            } else if let Some(rest) = body.strip_prefix('-') {
                ignore_errors = true;
                body = rest;
            } else {
                break;
            }
        }
        Self { ignore_errors, body }
    }
}

/// Dependency list as the runner should see it: alias-expanded for buildable
/// rules, raw for phony ones, linker switches dropped either way.
pub(crate) fn effective_inputs(store: &RuleStore, id: RuleId) -> Vec<String> {
    let rule = store.rule(id);
    let items = if rule.is_phony {
        rule.inputs.clone()
    } else {
        links::inputs_of(store, id)
    };
    items.into_iter().filter(|item| !item.starts_with('-')).collect()
}

/// Join a rule's commands into one shell pipeline: ignorable commands chain
/// with `;`, strict ones with `&&`; the silent marker is dropped. A trailing
/// `;` is closed with `true`, a trailing `&&` is removed.
pub(crate) fn join_commands(commands: &[String]) -> String {
    let mut joined = String::new();
    for command in commands {
        let prefix = CommandPrefix::parse(command);
        joined.push_str(prefix.body);
        joined.push_str(if prefix.ignore_errors { " ; " } else { " && " });
    }
    if let Some(trimmed) = joined.strip_suffix(" && ") {
        trimmed.to_string()
    } else if joined.ends_with(" ; ") {
        joined.push_str("true");
        joined
    } else {
        joined
    }
}

/// Write `content` to `<path>.new`, then rename over `path`.
pub(crate) fn write_atomic(path: &str, content: &str) -> anyhow::Result<()> {
    let staged = format!("{path}.new");
    fs::write(&staged, content).with_context(|| format!("Failed to write '{staged}'"))?;
    fs::rename(&staged, path)
        .with_context(|| format!("Failed to rename '{staged}' to '{path}'"))?;
    Ok(())
}
