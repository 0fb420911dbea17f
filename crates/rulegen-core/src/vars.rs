//! Layered variable store.
//!
//! Variables come from three places, in increasing precedence at read time:
//! crate-seeded or script-declared defaults (`add_variable`, set-if-absent),
//! programmatic assignments (`set_variable`, last wins), and per-call scopes
//! passed to [`VarStore::get_variable`]. User assignments from the command
//! line go through [`VarStore::set_user_variable`], which additionally
//! records them in insertion order so the self-rebuild command can re-embed
//! them verbatim.
//!
//! Directory-like variables (`IN`, `OUT`, `TMP`, plus anything registered
//! with [`VarStore::add_directory_variable`]) are rebased when the loader
//! enters a subdirectory scope and restored on the way out.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

use crate::paths::normalize_filename;

/// A per-call variable scope, consulted after the global store.
pub type Scope = IndexMap<String, String>;

/// Name → value mapping with user/default layering and directory rebasing.
#[derive(Debug, Default)]
pub struct VarStore {
    values: HashMap<String, String>,
    user: IndexMap<String, String>,
    dir_names: IndexSet<String>,
}

impl VarStore {
    /// Create a store with `IN`, `OUT`, and `TMP` pre-registered as
    /// directory-like.
    pub fn new() -> Self {
        let mut dir_names = IndexSet::new();
        for name in ["IN", "OUT", "TMP"] {
            dir_names.insert(name.to_string());
        }
        Self {
            values: HashMap::new(),
            user: IndexMap::new(),
            dir_names,
        }
    }

    /// Set `name` to `default` only if it is not already defined. Returns the
    /// value in effect afterwards.
    pub fn add_variable(&mut self, name: &str, default: &str) -> String {
        self.values
            .entry(name.to_string())
            .or_insert_with(|| default.to_string())
            .clone()
    }

    /// Unconditionally set `name` to `value`.
    pub fn set_variable(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    /// Like [`Self::set_variable`], and also remember the pair for
    /// re-embedding into the self-rebuild command.
    pub fn set_user_variable(&mut self, name: &str, value: &str) {
        self.set_variable(name, value);
        self.user.insert(name.to_string(), value.to_string());
    }

    /// Space-append `values` to an existing variable, or initialize it.
    pub fn add_to_variable(&mut self, name: &str, values: &[&str]) {
        let joined = values.join(" ");
        match self.values.get_mut(name) {
            Some(existing) if !existing.is_empty() => {
                existing.push(' ');
                existing.push_str(&joined);
            }
            _ => {
                self.values.insert(name.to_string(), joined);
            }
        }
    }

    /// The last-defined value across the global store and `scopes`, in that
    /// order. Undefined names read as the empty string.
    pub fn get_variable(&self, name: &str, scopes: &[&Scope]) -> String {
        let mut result = self.values.get(name).cloned();
        for scope in scopes {
            if let Some(value) = scope.get(name) {
                result = Some(value.clone());
            }
        }
        result.unwrap_or_default()
    }

    /// Concatenate every defined value of `name` (global store first, then
    /// each scope) with single spaces.
    pub fn get_variable_merge(&self, name: &str, scopes: &[&Scope]) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(value) = self.values.get(name) {
            parts.push(value);
        }
        for scope in scopes {
            if let Some(value) = scope.get(name) {
                parts.push(value);
            }
        }
        parts.join(" ")
    }

    /// Register `name` as directory-like, making it subject to subdirectory
    /// rebasing.
    pub fn add_directory_variable(&mut self, name: &str) {
        self.dir_names.insert(name.to_string());
    }

    /// Whether `name` was registered as directory-like.
    pub fn is_directory_variable(&self, name: &str) -> bool {
        self.dir_names.contains(name)
    }

    /// Whether `name` was assigned by the user on the command line.
    pub fn is_user_set(&self, name: &str) -> bool {
        self.user.contains_key(name)
    }

    /// The user-assigned pairs, in insertion order.
    pub fn user_overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.user.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// All defined names, unsorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Rebase every defined directory-like variable into `subdir`, returning
    /// the previous values for [`Self::restore`].
    pub fn enter_directory(&mut self, subdir: &str) -> Vec<(String, String)> {
        let mut saved = Vec::new();
        let names: Vec<String> = self.dir_names.iter().cloned().collect();
        for name in names {
            if let Some(old) = self.values.get(&name).cloned() {
                let rebased = normalize_filename(&[&old, subdir]);
                saved.push((name.clone(), old));
                self.values.insert(name, rebased);
            }
        }
        saved
    }

    /// Undo a previous [`Self::enter_directory`].
    pub fn restore(&mut self, saved: Vec<(String, String)>) {
        for (name, value) in saved {
            self.values.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_variable_is_set_if_absent() {
        let mut vars = VarStore::new();
        assert_eq!(vars.add_variable("CC", "gcc"), "gcc");
        assert_eq!(vars.add_variable("CC", "clang"), "gcc");
        vars.set_variable("CC", "clang");
        assert_eq!(vars.add_variable("CC", "gcc"), "clang");
    }

    #[test]
    fn user_overrides_remembered_in_order() {
        let mut vars = VarStore::new();
        vars.set_user_variable("B", "2");
        vars.set_user_variable("A", "1");
        let pairs: Vec<_> = vars.user_overrides().collect();
        assert_eq!(pairs, vec![("B", "2"), ("A", "1")]);
        assert!(vars.is_user_set("A"));
        assert!(!vars.is_user_set("C"));
    }

    #[test]
    fn scopes_win_over_globals() {
        let mut vars = VarStore::new();
        vars.set_variable("PKG", "global");
        let mut scope = Scope::new();
        scope.insert("PKG".to_string(), "local".to_string());
        assert_eq!(vars.get_variable("PKG", &[&scope]), "local");
        assert_eq!(vars.get_variable("PKG", &[]), "global");
        assert_eq!(vars.get_variable("MISSING", &[&scope]), "");
    }

    #[test]
    fn merge_accumulates() {
        let mut vars = VarStore::new();
        vars.set_variable("FLAGS", "-O2");
        let mut scope = Scope::new();
        scope.insert("FLAGS".to_string(), "-g".to_string());
        assert_eq!(vars.get_variable_merge("FLAGS", &[&scope]), "-O2 -g");
    }

    #[test]
    fn add_to_variable_appends() {
        let mut vars = VarStore::new();
        vars.add_to_variable("LIBS", &["-lm"]);
        vars.add_to_variable("LIBS", &["-lpthread", "-ldl"]);
        assert_eq!(vars.get_variable("LIBS", &[]), "-lm -lpthread -ldl");
    }

    #[test]
    fn directory_rebase_round_trip() {
        let mut vars = VarStore::new();
        vars.set_variable("OUT", "build");
        vars.set_variable("IN", ".");
        vars.set_variable("CC", "gcc");
        let saved = vars.enter_directory("sub");
        assert_eq!(vars.get_variable("OUT", &[]), "build/sub");
        assert_eq!(vars.get_variable("IN", &[]), "sub");
        assert_eq!(vars.get_variable("CC", &[]), "gcc");
        vars.restore(saved);
        assert_eq!(vars.get_variable("OUT", &[]), "build");
        assert_eq!(vars.get_variable("IN", &[]), ".");
    }

    #[test]
    fn registered_directory_variables_rebase_too() {
        let mut vars = VarStore::new();
        vars.add_directory_variable("DOCDIR");
        vars.set_variable("DOCDIR", "doc");
        let saved = vars.enter_directory("sub");
        assert_eq!(vars.get_variable("DOCDIR", &[]), "doc/sub");
        vars.restore(saved);
    }
}
