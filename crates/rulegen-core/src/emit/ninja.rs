//! Modern-runner (ninja) emitter.
//!
//! One shared `generic` rule template; each build statement supplies its
//! full command as a joined pipeline. Rules with no commands become `phony`
//! build edges, which is ninja's idiom for label nodes.

use crate::bootstrap::{self, RegenContext};
use crate::emit::{effective_inputs, join_commands, write_atomic};
use crate::project::Project;

/// Inject the bootstrap rules, render, and atomically write the ninja file.
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
    out.push_str("rule generic\n  command = $command\n  description = $description\n\n");

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
        if targets.is_empty() {
            continue;
        }

        if rule.commands.is_empty() {
            out.push_str(&build_line("phony", &targets, &inputs));
            out.push('\n');
            continue;
        }

        out.push_str(&build_line("generic", &targets, &inputs));
        out.push_str(&format!(
            "  command = {}\n",
            escape(&join_commands(&rule.commands))
        ));
        if let Some(info) = &rule.info {
            out.push_str(&format!("  description = {}\n", escape(info)));
        }
        if let Some(depfile) = rule.outputs.iter().find(|output| output.ends_with(".d")) {
            out.push_str(&format!("  depfile = {depfile}\n"));
        }
        out.push('\n');
    }

    out.push_str("default all\n");
    out
}

fn build_line(kind: &str, targets: &[&str], inputs: &[String]) -> String {
    let mut line = format!("build {}: {kind}", targets.join(" "));
    for input in inputs {
        line.push(' ');
        line.push_str(input);
    }
    line.push('\n');
    line
}

/// Ninja reads `$` as its own escape character.
fn escape(text: &str) -> String {
    text.replace('$', "$$")
}
