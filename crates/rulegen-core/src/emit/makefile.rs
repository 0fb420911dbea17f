//! Classic-runner (Makefile) emitter.
//!
//! The artifact is deliberately flat: no variables, no functions, no pattern
//! rules, no conditionals. Every command line starts with a tab, dependency
//! files come in through `-include`, and long input lists continue with a
//! backslash and two-space indent.

use crate::bootstrap::{self, RegenContext};
use crate::emit::{CommandPrefix, effective_inputs, write_atomic};
use crate::project::Project;

/// Maximum width of a target-and-inputs line before continuations kick in.
const WRAP_COLUMN: usize = 140;

/// Inject the bootstrap rules, render, and atomically write the Makefile.
///
/// # Errors
///
/// Propagates rule-model failures from the bootstrap and I/O failures from
/// the final write.
pub fn emit(project: &mut Project, regen: &RegenContext) -> anyhow::Result<()> {
    bootstrap::install(project, regen)?;
    let content = render(project);
    write_atomic(&regen.artifact_path(), &content)
}

/// Render the whole store in emission order.
pub(crate) fn render(project: &mut Project) -> String {
    let mut out = String::new();
    out.push_str("# Generated by rulegen; do not edit.\n\n");

    for (_, id) in project.rules.emission_keys() {
        if project.rules.rule(id).emitted {
            continue;
        }
        project.rules.rule_mut(id).emitted = true;

        let inputs = effective_inputs(&project.rules, id);
        let rule = project.rules.rule(id);

        for comment in &rule.comments {
            out.push_str(&format!("# {comment}\n"));
        }

        let targets: Vec<&str> = rule
            .outputs
            .iter()
            .filter(|output| !output.ends_with(".d"))
            .map(String::as_str)
            .collect();
        if !targets.is_empty() {
            push_header(&mut out, &targets, &inputs);
            match &rule.info {
                Some(info) => {
                    out.push_str(&format!("\t@echo \"\t{info}...\"\n"));
                    for command in &rule.commands {
                        let prefix = CommandPrefix::parse(command);
                        let ignore = if prefix.ignore_errors { "-" } else { "" };
                        out.push_str(&format!("\t{ignore}@{}\n", prefix.body));
                    }
                }
                None => {
                    for command in &rule.commands {
                        out.push_str(&format!("\t{command}\n"));
                    }
                }
            }
        }

        for output in &rule.outputs {
            if output.ends_with(".d") {
                out.push_str(&format!("-include {output}\n"));
            }
        }
        out.push('\n');
    }
    out
}

/// `targets : inputs`, wrapped with `\`-newline-two-spaces past the column
/// limit.
fn push_header(out: &mut String, targets: &[&str], inputs: &[String]) {
    let mut line = format!("{} :", targets.join(" "));
    let total: usize = line.len() + inputs.iter().map(|i| i.len() + 1).sum::<usize>();
    if total <= WRAP_COLUMN {
        for input in inputs {
            line.push(' ');
            line.push_str(input);
        }
        out.push_str(&line);
        out.push('\n');
        return;
    }
    for input in inputs {
        if line.len() + 1 + input.len() > WRAP_COLUMN && !line.ends_with(':') {
            out.push_str(&line);
            out.push_str(" \\\n");
            line = "  ".to_string();
        } else {
            line.push(' ');
        }
        line.push_str(input);
    }
    out.push_str(&line);
    out.push('\n');
}
