//! Shell-script emitter.
//!
//! Unlike the two runner formats, a script has no dependency engine: the
//! emitter performs an iterative depth-first walk from the requested targets
//! and writes commands in dependency order. Strict commands abort the script
//! via `|| exit 1`; ignorable ones (leading `-`) run bare.

use std::collections::HashSet;

use crate::bootstrap::{self, RegenContext};
use crate::emit::{CommandPrefix, effective_inputs, write_atomic};
use crate::error::Error;
use crate::paths::normalize_filename;
use crate::project::Project;
use crate::rule::RuleId;

/// Inject the bootstrap rules, render for the requested targets, and
/// atomically write the script.
///
/// # Errors
///
/// Fails without targets, on a target that names no rule, on rule-model
/// failures from the bootstrap, and on I/O failures from the final write.
pub fn emit(project: &mut Project, regen: &RegenContext) -> anyhow::Result<()> {
    bootstrap::install(project, regen)?;
    let content = render(project, &regen.targets)?;
    write_atomic(&regen.artifact_path(), &content)
}

/// Render the dependency closure of `targets` in execution order.
pub(crate) fn render(project: &mut Project, targets: &[String]) -> anyhow::Result<String> {
    anyhow::ensure!(!targets.is_empty(), "scriptfile requires at least one target");

    let mut out = String::new();
    out.push_str("#!/bin/sh\n# Generated by rulegen; do not edit.\n\n");

    // (id, expanded): a rule is pushed once to schedule its dependencies and
    // revisited once to be written.
    let mut stack: Vec<(RuleId, bool)> = Vec::new();
    let mut scheduled: HashSet<RuleId> = HashSet::new();
    for target in targets.iter().rev() {
        let name = normalize_filename(&[target]);
        let id = project
            .rules
            .lookup(&name)
            .ok_or(Error::UnknownRule { name })?;
        stack.push((id, false));
    }

    while let Some((id, expanded)) = stack.pop() {
        if project.rules.rule(id).emitted {
            continue;
        }
        if !expanded {
            if !scheduled.insert(id) {
                continue;
            }
            stack.push((id, true));
            let deps = effective_inputs(&project.rules, id);
            for dep in deps.iter().rev() {
                if let Some(dep_id) = project.rules.lookup(dep) {
                    if !project.rules.rule(dep_id).emitted {
                        stack.push((dep_id, false));
                    }
                }
            }
            continue;
        }

        project.rules.rule_mut(id).emitted = true;
        let rule = project.rules.rule(id);
        if rule.comments.is_empty() && rule.info.is_none() && rule.commands.is_empty() {
            continue;
        }
        for comment in &rule.comments {
            out.push_str(&format!("# {comment}\n"));
        }
        if let Some(info) = &rule.info {
            out.push_str(&format!("echo \"{info}...\"\n"));
        }
        for command in &rule.commands {
            let prefix = CommandPrefix::parse(command);
            if prefix.ignore_errors {
                out.push_str(&format!("{}\n", prefix.body));
            } else {
                out.push_str(&format!("{} || exit 1\n", prefix.body));
            }
        }
        out.push('\n');
    }

    Ok(out)
}
