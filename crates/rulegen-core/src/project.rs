//! The project under construction: variables, rules, and the input-file
//! registry, plus the rule constructors the script surface calls.
//!
//! ## Constructor contract
//!
//! | Constructor | Behavior on existing outputs |
//! |---|---|
//! | [`Project::generate`] | Extends the one covering rule; two distinct rules are a merge error |
//! | [`Project::generate_unique`] | Succeeds only when the existing rule already subsumes the request |
//! | [`Project::generate_copy`] | `generate` with a single `@$(CP)` command |
//! | [`Project::generate_anonymous`] | Content-addressed output under `<TMP>/.anon`; idempotent |
//! | [`Project::generate_directory`] | Idempotent `<dir>/.mark` rule; file/directory collisions are fatal |
//!
//! Commands are expanded exactly once, here, against the canonicalized
//! outputs and inputs of the constructing call. Every relative output in a
//! subdirectory implicitly depends on that directory's `.mark` rule so that
//! parallel runners create directories before writing into them.

use crate::error::{Error, Result};
use crate::expand::{ExpandCtx, expand};
use crate::hashes::md5_hex;
use crate::paths::{needs_parent_dir, normalize_filename, parent_dir};
use crate::rule::{Rule, RuleId, RuleStore, push_unique};
use crate::vars::{Scope, VarStore};

/// Everything the script surface builds up before emission.
#[derive(Debug)]
pub struct Project {
    /// The variable store.
    pub vars: VarStore,
    /// The rule store.
    pub rules: RuleStore,
    inputs: Vec<String>,
    temp_seq: u32,
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl Project {
    /// An empty project with a fresh variable store.
    pub fn new() -> Self {
        Self {
            vars: VarStore::new(),
            rules: RuleStore::new(),
            inputs: Vec::new(),
            temp_seq: 0,
        }
    }

    /// Record a source/config file whose change must regenerate the
    /// artifact. Duplicates are dropped, order is kept.
    pub fn register_input(&mut self, path: &str) {
        let path = normalize_filename(&[path]);
        push_unique(&mut self.inputs, &path);
    }

    /// The registered regeneration inputs, in registration order.
    pub fn input_files(&self) -> &[String] {
        &self.inputs
    }

    /// A fresh temporary filename under `<TMP>/.tmp`, unique within this
    /// process.
    pub fn make_temp_filename(&mut self, ext: &str) -> String {
        self.temp_seq += 1;
        let tmp = self.tmp_dir();
        normalize_filename(&[&tmp, &format!(".tmp/t{}{}", self.temp_seq, ext)])
    }

    fn tmp_dir(&self) -> String {
        let tmp = self.vars.get_variable("TMP", &[]);
        if tmp.is_empty() { ".".to_string() } else { tmp }
    }

    /// Declare (or extend) a rule. See the module table for the merge
    /// behavior. Returns the first canonical output name.
    ///
    /// # Errors
    ///
    /// Fails when the requested outputs span two distinct existing rules,
    /// collide with a directory rule, or are empty.
    pub fn generate(&mut self, outputs: &[String], inputs: &[String], commands: &[String]) -> Result<String> {
        self.generate_in_scope(outputs, inputs, commands, &[])
    }

    /// [`Self::generate`] with extra per-call variable scopes for `$(NAME)`
    /// expansion.
    pub fn generate_in_scope(
        &mut self,
        outputs: &[String],
        inputs: &[String],
        commands: &[String],
        scopes: &[&Scope],
    ) -> Result<String> {
        let (outs, ins, cmds) = self.prepare(outputs, inputs, commands, scopes)?;

        let found = self.distinct_rules(&outs);
        let id = match found.len() {
            0 => self.insert_rule(&outs, &ins, cmds),
            1 => {
                let id = found[0];
                if self.rules.rule(id).is_directory {
                    return Err(Error::FileOverDirectory { path: outs[0].clone() });
                }
                let rule = self.rules.rule_mut(id);
                for out in &outs {
                    push_unique(&mut rule.outputs, out);
                }
                for input in &ins {
                    push_unique(&mut rule.inputs, input);
                }
                rule.commands.extend(cmds);
                for out in &outs {
                    self.rules.bind(out, id);
                }
                id
            }
            _ => return Err(Error::CannotMerge { outputs: outs }),
        };

        self.imply_parent_dirs(id, &outs)?;
        Ok(outs.into_iter().next().unwrap_or_default())
    }

    /// Declare a rule only if it does not clash with an existing one.
    ///
    /// Returns `true` when the rule was created, or when an existing rule
    /// already contains every requested output, input, and command. Returns
    /// `false` otherwise without mutating anything; the caller is expected
    /// to retry under a different output name.
    ///
    /// # Errors
    ///
    /// Fails only on empty outputs or a directory-rule collision while
    /// creating.
    pub fn generate_unique(
        &mut self,
        outputs: &[String],
        inputs: &[String],
        commands: &[String],
    ) -> Result<bool> {
        self.generate_unique_in_scope(outputs, inputs, commands, &[])
    }

    /// [`Self::generate_unique`] with extra per-call variable scopes.
    pub fn generate_unique_in_scope(
        &mut self,
        outputs: &[String],
        inputs: &[String],
        commands: &[String],
        scopes: &[&Scope],
    ) -> Result<bool> {
        let (outs, ins, cmds) = self.prepare(outputs, inputs, commands, scopes)?;

        let found = self.distinct_rules(&outs);
        match found.len() {
            0 => {
                let id = self.insert_rule(&outs, &ins, cmds);
                self.imply_parent_dirs(id, &outs)?;
                Ok(true)
            }
            1 => {
                let rule = self.rules.rule(found[0]);
                let subsumed = outs.iter().all(|o| rule.outputs.contains(o))
                    && ins.iter().all(|i| rule.inputs.contains(i))
                    && cmds.iter().all(|c| rule.commands.contains(c));
                Ok(subsumed)
            }
            _ => Ok(false),
        }
    }

    /// Define `dst` as a copy of `src` via `$(CP)` (default `cp`).
    ///
    /// # Errors
    ///
    /// Propagates [`Self::generate`] failures.
    pub fn generate_copy(&mut self, dst: &str, src: &str) -> Result<String> {
        self.vars.add_variable("CP", "cp");
        self.generate(
            &[dst.to_string()],
            &[src.to_string()],
            &["@$(CP) $< $@".to_string()],
        )
    }

    /// Declare a rule with a content-addressed output name under
    /// `<TMP>/.anon`, so repeated construction with identical parameters
    /// shares one rule. Returns the output path.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::generate`] failures on first construction.
    pub fn generate_anonymous(
        &mut self,
        ext: &str,
        inputs: &[String],
        commands: &[String],
    ) -> Result<String> {
        self.generate_anonymous_in_scope(ext, inputs, commands, &[])
    }

    /// [`Self::generate_anonymous`] with extra per-call variable scopes.
    pub fn generate_anonymous_in_scope(
        &mut self,
        ext: &str,
        inputs: &[String],
        commands: &[String],
        scopes: &[&Scope],
    ) -> Result<String> {
        let ins: Vec<String> = inputs.iter().map(|i| normalize_filename(&[i])).collect();
        // Hash the raw commands: expansion may reference $@, which embeds
        // this very hash.
        let digest = md5_hex(&format!("{ext}\n{}\n{}", ins.join(" "), commands.join("\n")));
        let out = normalize_filename(&[&self.tmp_dir(), &format!(".anon/{digest}{ext}")]);
        if self.rules.lookup(&out).is_some() {
            return Ok(out);
        }
        self.generate_in_scope(&[out.clone()], &ins, commands, scopes)?;
        Ok(out)
    }

    /// Ensure a directory-creation rule for `path` exists and return its
    /// `.mark` file. Idempotent; recursively ensures the parent chain.
    ///
    /// # Errors
    ///
    /// Fails when `<path>/.mark` is already produced by a file rule.
    pub fn generate_directory(&mut self, path: &str) -> Result<String> {
        let dir = normalize_filename(&[path]);
        let mark = format!("{dir}/.mark");
        if let Some(id) = self.rules.lookup(&mark) {
            if !self.rules.rule(id).is_directory {
                return Err(Error::DirectoryOverFile { path: mark });
            }
            return Ok(mark);
        }

        let id = self.rules.insert(Rule {
            outputs: vec![mark.clone()],
            commands: vec![format!("-@mkdir -p {dir}"), format!("@touch {mark}")],
            is_directory: true,
            is_precious: true,
            priority: -99,
            ..Rule::default()
        });
        if needs_parent_dir(&dir) {
            if let Some(parent) = parent_dir(&dir) {
                let parent_mark = self.generate_directory(parent)?;
                push_unique(&mut self.rules.rule_mut(id).inputs, &parent_mark);
            }
        }
        Ok(mark)
    }

    /// Add a placeholder rule over a preexisting source file: no commands,
    /// no parent-directory implication, and precious so `clean` never
    /// touches the file.
    pub(crate) fn add_bare_rule(&mut self, output: &str) {
        let output = normalize_filename(&[output]);
        if self.rules.lookup(&output).is_none() {
            self.rules.insert(Rule {
                outputs: vec![output],
                is_precious: true,
                ..Rule::default()
            });
        }
    }

    fn prepare(
        &self,
        outputs: &[String],
        inputs: &[String],
        commands: &[String],
        scopes: &[&Scope],
    ) -> Result<(Vec<String>, Vec<String>, Vec<String>)> {
        let mut outs: Vec<String> = Vec::new();
        for out in outputs {
            push_unique(&mut outs, &normalize_filename(&[out]));
        }
        if outs.is_empty() {
            return Err(Error::NoOutputs);
        }
        let mut ins: Vec<String> = Vec::new();
        for input in inputs {
            push_unique(&mut ins, &normalize_filename(&[input]));
        }
        let ctx = ExpandCtx {
            output: outs.first().map(String::as_str),
            input: ins.first().map(String::as_str),
        };
        let cmds = commands
            .iter()
            .map(|cmd| expand(&self.vars, scopes, ctx, cmd))
            .collect();
        Ok((outs, ins, cmds))
    }

    fn distinct_rules(&self, outputs: &[String]) -> Vec<RuleId> {
        let mut found = Vec::new();
        for output in outputs {
            if let Some(id) = self.rules.lookup(output) {
                if !found.contains(&id) {
                    found.push(id);
                }
            }
        }
        found
    }

    fn insert_rule(&mut self, outs: &[String], ins: &[String], cmds: Vec<String>) -> RuleId {
        let priority = if outs[0].starts_with('.') { 2 } else { 0 };
        self.rules.insert(Rule {
            outputs: outs.to_vec(),
            inputs: ins.to_vec(),
            commands: cmds,
            priority,
            ..Rule::default()
        })
    }

    fn imply_parent_dirs(&mut self, id: RuleId, outs: &[String]) -> Result<()> {
        for out in outs {
            if !needs_parent_dir(out) {
                continue;
            }
            let Some(parent) = parent_dir(out) else { continue };
            // A rule producing a mark file is its own directory evidence.
            if out == &format!("{parent}/.mark") {
                continue;
            }
            let mark = self.generate_directory(parent)?;
            push_unique(&mut self.rules.rule_mut(id).inputs, &mark);
        }
        Ok(())
    }
}
