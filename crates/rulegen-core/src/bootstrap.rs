//! Housekeeping rules injected before emission.
//!
//! Every emitter calls [`install`] first. Ordering matters: hash markers are
//! attached before the bootstrap rules exist, so the self-rebuild, clean,
//! and phony-collector rules never get hashed themselves.

use std::collections::HashSet;
use std::path::Path;

use crate::error::Result;
use crate::hashes::add_hash_markers;
use crate::paths::normalize_filename;
use crate::project::Project;
use crate::rule::push_unique;
use crate::vars::VarStore;

/// How the driver was invoked, for re-embedding into the self-rebuild rule.
#[derive(Debug, Clone)]
pub struct RegenContext {
    /// The driver executable (argv\[0\]).
    pub program: String,
    /// Source root (`--in`).
    pub in_dir: String,
    /// Output root (`--out`).
    pub out_dir: String,
    /// Entry rules-file name (`--infile`).
    pub infile: String,
    /// Artifact file name (`--outfile` or the subcommand default).
    pub outfile: String,
    /// The subcommand to re-run (`makefile`, `ninjafile`, `scriptfile`).
    pub subcommand: String,
    /// Explicit script targets, when the subcommand takes them.
    pub targets: Vec<String>,
}

impl RegenContext {
    /// Where the artifact lands: `<out>/<outfile>`, canonicalized.
    pub fn artifact_path(&self) -> String {
        normalize_filename(&[&self.out_dir, &self.outfile])
    }

    /// The full regeneration command line, with the user's variable
    /// overrides re-embedded in their original order.
    fn regen_command(&self, vars: &VarStore) -> String {
        let mut words = vec![
            shell_quote(&self.program),
            shell_quote(&format!("--in={}", self.in_dir)),
            shell_quote(&format!("--out={}", self.out_dir)),
            shell_quote(&format!("--infile={}", self.infile)),
            shell_quote(&format!("--outfile={}", self.outfile)),
        ];
        for (name, value) in vars.user_overrides() {
            words.push(shell_quote(&format!("{name}={value}")));
        }
        words.push(shell_quote(&self.subcommand));
        for target in &self.targets {
            words.push(shell_quote(target));
        }
        // The command goes through construction-time expansion like any
        // other; double the dollars so it survives unchanged.
        words.join(" ").replace('$', "$$")
    }
}

/// Quote a word for `/bin/sh` unless it is plainly safe.
fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

/// Inject hash markers and the bootstrap rules, then verify inputs.
///
/// # Errors
///
/// Propagates rule-model failures from the injected rules.
pub fn install(project: &mut Project, regen: &RegenContext) -> Result<()> {
    add_hash_markers(project)?;
    add_self_rebuild(project, regen)?;
    add_clean_rule(project)?;
    add_phony_collector(project)?;
    verify_inputs(project);
    Ok(())
}

/// The rule that rebuilds the artifact itself when any registered input (or
/// the driver) changes.
fn add_self_rebuild(project: &mut Project, regen: &RegenContext) -> Result<()> {
    let artifact = regen.artifact_path();
    let mut inputs: Vec<String> = project.input_files().to_vec();
    push_unique(&mut inputs, &regen.program);

    let command = regen.regen_command(&project.vars);
    project.generate(&[artifact.clone()], &inputs, &[command])?;
    if let Some(id) = project.rules.lookup(&artifact) {
        project.rules.rule_mut(id).is_precious = true;
    }

    // A removed include or rules file must not halt the runner, so every
    // input gets a bare rule of its own.
    for input in inputs {
        project.add_bare_rule(&input);
    }
    Ok(())
}

/// The phony `clean` rule: removes every output of every rule that is
/// neither precious nor phony, in `rm -f` batches kept near 120 columns.
fn add_clean_rule(project: &mut Project) -> Result<()> {
    let mut files: Vec<String> = Vec::new();
    for id in project.rules.ids() {
        let rule = project.rules.rule(id);
        if rule.is_precious || rule.is_phony {
            continue;
        }
        for output in &rule.outputs {
            push_unique(&mut files, output);
        }
    }

    let total = files.len();
    let mut commands: Vec<String> = Vec::new();
    let mut current = String::from("@rm -f");
    let mut batches = 0usize;
    let mut removed = 0usize;
    for file in files {
        if current.len() + 1 + file.len() > 120 && current != "@rm -f" {
            commands.push(current);
            current = String::from("@rm -f");
            batches += 1;
            if batches % 100 == 0 {
                commands.push(format!("@echo \"\t{removed}/{total} files\""));
            }
        }
        current.push(' ');
        current.push_str(&file);
        removed += 1;
    }
    if current != "@rm -f" {
        commands.push(current);
    }

    project.generate(&["clean".to_string()], &[], &commands)?;
    if let Some(id) = project.rules.lookup("clean") {
        let rule = project.rules.rule_mut(id);
        rule.is_phony = true;
        rule.info = Some("Cleaning".to_string());
    }
    Ok(())
}

/// The `.PHONY` collector rule listing every phony target.
fn add_phony_collector(project: &mut Project) -> Result<()> {
    let mut phonies: Vec<String> = Vec::new();
    for id in project.rules.ids() {
        let rule = project.rules.rule(id);
        if rule.is_phony {
            for output in &rule.outputs {
                push_unique(&mut phonies, output);
            }
        }
    }
    project.generate(&[".PHONY".to_string()], &phonies, &[])?;
    if let Some(id) = project.rules.lookup(".PHONY") {
        let rule = project.rules.rule_mut(id);
        rule.is_phony = true;
        rule.is_precious = true;
    }
    Ok(())
}

/// Warn for every rule input that is neither generated by the graph nor
/// present on the filesystem.
fn verify_inputs(project: &Project) {
    let mut warned: HashSet<String> = HashSet::new();
    for id in project.rules.ids() {
        for input in &project.rules.rule(id).inputs {
            if input.starts_with('-') || project.rules.is_generated(input) {
                continue;
            }
            if !Path::new(input).exists() && warned.insert(input.clone()) {
                tracing::warn!("input '{input}' is neither generated nor present");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn regen() -> RegenContext {
        RegenContext {
            program: "target/debug/rulegen".to_string(),
            in_dir: ".".to_string(),
            out_dir: ".".to_string(),
            infile: "Rules.toml".to_string(),
            outfile: "Makefile".to_string(),
            subcommand: "makefile".to_string(),
            targets: Vec::new(),
        }
    }

    #[test]
    fn self_rebuild_embeds_user_overrides() {
        let mut p = Project::new();
        p.vars.set_user_variable("WITH_SSL", "1");
        p.vars.set_user_variable("CC", "clang -m64");
        p.register_input("Rules.toml");
        install(&mut p, &regen()).unwrap();

        let rule = p.rules.rule(p.rules.lookup("Makefile").unwrap());
        assert!(rule.is_precious);
        assert!(rule.inputs.contains(&"Rules.toml".to_string()));
        assert!(rule.inputs.contains(&"target/debug/rulegen".to_string()));
        let cmd = &rule.commands[0];
        assert!(cmd.contains("WITH_SSL=1"));
        assert!(cmd.contains("'CC=clang -m64'"));
        assert!(cmd.ends_with("makefile"));
        // Inputs got bare rules so a deleted file cannot halt the runner.
        assert!(p.rules.lookup("Rules.toml").is_some());
    }

    #[test]
    fn clean_skips_precious_and_phony() {
        let mut p = Project::new();
        p.generate(&strs(&["prog"]), &strs(&["main.o"]), &strs(&["cc"])).unwrap();
        p.generate(&strs(&["keep"]), &[], &strs(&["tool"])).unwrap();
        let keep = p.rules.lookup("keep").unwrap();
        p.rules.rule_mut(keep).is_precious = true;
        p.generate(&strs(&["all"]), &strs(&["prog"]), &[]).unwrap();
        let all = p.rules.lookup("all").unwrap();
        p.rules.rule_mut(all).is_phony = true;
        install(&mut p, &regen()).unwrap();

        let clean = p.rules.rule(p.rules.lookup("clean").unwrap());
        assert!(clean.is_phony);
        let joined = clean.commands.join("\n");
        assert!(joined.contains("prog"));
        assert!(!joined.contains(" keep"));
        assert!(!joined.contains(" all"));
    }

    #[test]
    fn clean_batches_stay_short() {
        let mut p = Project::new();
        for i in 0..60 {
            p.generate(
                &strs(&[&format!("artifact-number-{i:04}.bin")]),
                &[],
                &strs(&["gen"]),
            )
            .unwrap();
        }
        install(&mut p, &regen()).unwrap();
        let clean = p.rules.rule(p.rules.lookup("clean").unwrap());
        assert!(clean.commands.len() > 1);
        for cmd in &clean.commands {
            assert!(cmd.len() <= 145, "overlong batch: {cmd}");
        }
    }

    #[test]
    fn phony_collector_lists_phony_targets() {
        let mut p = Project::new();
        p.generate(&strs(&["all"]), &[], &[]).unwrap();
        let all = p.rules.lookup("all").unwrap();
        p.rules.rule_mut(all).is_phony = true;
        install(&mut p, &regen()).unwrap();

        let phony = p.rules.rule(p.rules.lookup(".PHONY").unwrap());
        assert!(phony.is_phony && phony.is_precious);
        assert_eq!(phony.priority, 2);
        assert!(phony.inputs.contains(&"all".to_string()));
        assert!(phony.inputs.contains(&"clean".to_string()));
    }

    #[test]
    fn bootstrap_rules_are_not_hashed() {
        let mut p = Project::new();
        install(&mut p, &regen()).unwrap();
        let makefile = p.rules.rule(p.rules.lookup("Makefile").unwrap());
        assert!(!makefile.inputs.iter().any(|i| i.contains(".hash/")));
    }

    #[test]
    fn quoting_covers_spaces_and_quotes() {
        assert_eq!(shell_quote("plain-word.1"), "plain-word.1");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
    }
}
