//! Declarative rules-file front-end.
//!
//! A project is described by a `Rules.toml` (name overridable) whose
//! directives map one-to-one onto the rule constructors. Within a file the
//! directives apply in a fixed order: variables first, then loaded files,
//! then directories, anonymous rules, copies, rules, links, and finally
//! subdirectories.
//!
//! ```toml
//! [vars]
//! CC = "gcc"
//!
//! [[rule]]
//! out = "hello"
//! in = "hello.o"
//! run = "$(CC) -o $@ $<"
//! info = "LINK $@"
//!
//! subdirs = ["lib"]
//! ```
//!
//! `out`/`in` values are `$(NAME)`-expanded at load time and then split on
//! whitespace, so a variable can contribute several paths. `run` lines are
//! handed to the constructors untouched; construction-time expansion gives
//! them their `$@`/`$<` context exactly once.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;

use crate::error::Error;
use crate::expand::{ExpandCtx, expand};
use crate::links::rule_add_link;
use crate::paths::{escapes_base, normalize_filename};
use crate::project::Project;
use crate::vars::Scope;

/// Split a string on whitespace into owned words.
pub fn to_list(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// A TOML value that is either one string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    /// A single string; whitespace-separated where a list is expected.
    One(String),
    /// An explicit list.
    Many(Vec<String>),
}

impl Default for StringOrList {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl StringOrList {
    /// Word-valued fields: a single string splits on whitespace.
    fn words(&self) -> Vec<String> {
        match self {
            Self::One(text) => to_list(text),
            Self::Many(items) => items.clone(),
        }
    }

    /// Line-valued fields (commands, comments): a single string is one line.
    fn lines(&self) -> Vec<String> {
        match self {
            Self::One(text) => vec![text.clone()],
            Self::Many(items) => items.clone(),
        }
    }
}

/// One parsed rules file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RulesFile {
    #[serde(default)]
    directory_vars: Vec<String>,
    #[serde(default)]
    vars: IndexMap<String, String>,
    #[serde(default)]
    set: IndexMap<String, String>,
    #[serde(default)]
    append: IndexMap<String, String>,
    #[serde(default)]
    load_vars: Vec<String>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    modules: Vec<String>,
    #[serde(default)]
    dir: Vec<DirEntry>,
    #[serde(default)]
    anon: Vec<AnonEntry>,
    #[serde(default)]
    copy: Vec<CopyEntry>,
    #[serde(default)]
    rule: Vec<RuleEntry>,
    #[serde(default)]
    link: Vec<LinkEntry>,
    #[serde(default)]
    subdirs: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DirEntry {
    path: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AnonEntry {
    ext: String,
    #[serde(default, rename = "in")]
    input: StringOrList,
    #[serde(default)]
    run: StringOrList,
    var: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CopyEntry {
    out: String,
    from: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleEntry {
    out: StringOrList,
    #[serde(default, rename = "in")]
    input: StringOrList,
    #[serde(default)]
    run: StringOrList,
    info: Option<String>,
    #[serde(default)]
    comment: StringOrList,
    #[serde(default)]
    phony: bool,
    #[serde(default)]
    precious: bool,
    priority: Option<i32>,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    vars: Scope,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkEntry {
    rule: String,
    add: StringOrList,
}

/// Walks rules files into a [`Project`].
#[derive(Debug)]
pub struct Loader<'a> {
    project: &'a mut Project,
    infile_name: String,
    root: String,
    base: String,
}

impl<'a> Loader<'a> {
    /// A loader rooted at the project's `IN` directory.
    pub fn new(project: &'a mut Project, infile_name: &str) -> Self {
        let root = match project.vars.get_variable("IN", &[]) {
            dir if dir.is_empty() => ".".to_string(),
            dir => dir,
        };
        Self {
            project,
            infile_name: infile_name.to_string(),
            base: root.clone(),
            root,
        }
    }

    /// Load `<IN>/<infile>`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed, or when any directive
    /// inside it fails; the offending file is named in the error chain.
    pub fn load_root(&mut self) -> Result<()> {
        let entry = normalize_filename(&[&self.base, &self.infile_name]);
        self.load_file(&entry)
    }

    /// Load one rules file and register it as a regeneration input.
    ///
    /// # Errors
    ///
    /// As [`Self::load_root`].
    pub fn load_file(&mut self, path: &str) -> Result<()> {
        let path = normalize_filename(&[path]);
        self.project.register_input(&path);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read rules file '{path}'"))?;
        let file: RulesFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse rules file '{path}'"))?;
        self.apply(file)
            .with_context(|| format!("While loading '{path}'"))
    }

    /// Load a shared rules module, resolved against the source root rather
    /// than the current scope.
    ///
    /// # Errors
    ///
    /// As [`Self::load_file`].
    pub fn load_module(&mut self, name: &str) -> Result<()> {
        let path = normalize_filename(&[&self.root, name]);
        self.load_file(&path)
    }

    /// Load a flat `KEY = "value"` TOML table into the variable store.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not a flat string table.
    pub fn load_variables(&mut self, path: &str) -> Result<()> {
        let path = normalize_filename(&[path]);
        self.project.register_input(&path);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read variables file '{path}'"))?;
        let table: IndexMap<String, String> = toml::from_str(&content)
            .with_context(|| format!("Failed to parse variables file '{path}'"))?;
        for (name, value) in &table {
            self.project.vars.set_variable(name, value);
        }
        Ok(())
    }

    /// Enter `subdir`, rebasing directory-like variables, and load its rules
    /// file.
    ///
    /// # Errors
    ///
    /// Fails for absolute or upward-escaping paths, and propagates load
    /// failures from the subdirectory's rules file.
    pub fn load_directory(&mut self, subdir: &str) -> Result<()> {
        if subdir.is_empty() || escapes_base(subdir) {
            return Err(Error::EscapingPath {
                path: subdir.to_string(),
            }
            .into());
        }
        let new_base = normalize_filename(&[&self.base, subdir]);
        self.project.register_input(&new_base);
        let entry = normalize_filename(&[&new_base, &self.infile_name]);

        let saved = self.project.vars.enter_directory(subdir);
        let old_base = std::mem::replace(&mut self.base, new_base);
        let result = self.load_file(&entry);
        self.base = old_base;
        self.project.vars.restore(saved);
        result
    }

    fn apply(&mut self, file: RulesFile) -> Result<()> {
        let empty = Scope::new();

        for name in &file.directory_vars {
            self.project.vars.add_directory_variable(name);
        }
        for (name, value) in &file.vars {
            let value = self.xp(&empty, value);
            self.project.vars.add_variable(name, &value);
        }
        for (name, value) in &file.set {
            let value = self.xp(&empty, value);
            self.project.vars.set_variable(name, &value);
        }
        for (name, value) in &file.append {
            let value = self.xp(&empty, value);
            self.project.vars.add_to_variable(name, &[&value]);
        }
        for name in &file.load_vars {
            let path = normalize_filename(&[&self.base, &self.xp(&empty, name)]);
            self.load_variables(&path)?;
        }
        for name in &file.include {
            let path = normalize_filename(&[&self.base, &self.xp(&empty, name)]);
            self.load_file(&path)?;
        }
        for name in &file.modules {
            let name = self.xp(&empty, name);
            self.load_module(&name)?;
        }
        for entry in &file.dir {
            let path = self.xp(&empty, &entry.path);
            self.project.generate_directory(&path)?;
        }
        for entry in &file.anon {
            let ext = self.xp(&empty, &entry.ext);
            let inputs = self.xp_words(&empty, &entry.input);
            let path = self
                .project
                .generate_anonymous(&ext, &inputs, &entry.run.lines())?;
            if let Some(var) = &entry.var {
                self.project.vars.set_variable(var, &path);
            }
        }
        for entry in &file.copy {
            let dst = self.xp(&empty, &entry.out);
            let src = self.xp(&empty, &entry.from);
            self.project.generate_copy(&dst, &src)?;
        }
        for entry in &file.rule {
            self.apply_rule(entry)?;
        }
        for entry in &file.link {
            let name = self.xp(&empty, &entry.rule);
            let items = self.xp_words(&empty, &entry.add);
            rule_add_link(&mut self.project.rules, &name, &items)?;
        }
        for subdir in &file.subdirs {
            let subdir = self.xp(&empty, subdir);
            self.load_directory(&subdir)?;
        }
        Ok(())
    }

    fn apply_rule(&mut self, entry: &RuleEntry) -> Result<()> {
        let scope = &entry.vars;
        let outs = self.xp_words(scope, &entry.out);
        let ins = self.xp_words(scope, &entry.input);
        let runs = entry.run.lines();

        let first = if entry.unique {
            let accepted = self
                .project
                .generate_unique_in_scope(&outs, &ins, &runs, &[scope])?;
            if !accepted {
                anyhow::bail!("outputs {outs:?} are already produced by a different rule");
            }
            normalize_filename(&[&outs[0]])
        } else {
            self.project.generate_in_scope(&outs, &ins, &runs, &[scope])?
        };

        let info = entry.info.as_ref().map(|text| {
            let first_in = ins.first().map(|input| normalize_filename(&[input]));
            let ctx = ExpandCtx {
                output: Some(&first),
                input: first_in.as_deref(),
            };
            expand(&self.project.vars, &[scope], ctx, text)
        });

        let Some(id) = self.project.rules.lookup(&first) else {
            return Ok(());
        };
        let rule = self.project.rules.rule_mut(id);
        if entry.phony {
            rule.is_phony = true;
        }
        if entry.precious {
            rule.is_precious = true;
        }
        if let Some(priority) = entry.priority {
            rule.priority = priority;
        }
        for line in entry.comment.lines() {
            rule.comments.push(line);
        }
        if info.is_some() {
            rule.info = info;
        }
        Ok(())
    }

    fn xp(&self, scope: &Scope, text: &str) -> String {
        expand(&self.project.vars, &[scope], ExpandCtx::default(), text)
    }

    /// Expand then whitespace-split, so one variable can contribute several
    /// paths.
    fn xp_words(&self, scope: &Scope, value: &StringOrList) -> Vec<String> {
        let mut words = Vec::new();
        for raw in value.words() {
            words.extend(to_list(&self.xp(scope, &raw)));
        }
        words
    }
}
