//! Library-alias resolution.
//!
//! A library alias is a rule carrying `link_inputs`: dependents that name
//! the alias are redirected to that list, which may mix file paths and raw
//! linker switches (`-lfoo`). Ordering is last-occurrence-wins throughout,
//! because later duplicates satisfy earlier references on a linker command
//! line.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::paths::normalize_filename;
use crate::rule::{RuleId, RuleStore, push_unique_last};

/// Designate the rule producing `name` as a library alias whose effective
/// linker inputs are `items`.
///
/// Repeated calls extend the list; re-added items move to the end.
///
/// # Errors
///
/// Fails when no rule produces `name`.
pub fn rule_add_link(store: &mut RuleStore, name: &str, items: &[String]) -> Result<()> {
    let name = normalize_filename(&[name]);
    let id = store
        .lookup(&name)
        .ok_or_else(|| Error::UnknownRule { name: name.clone() })?;
    let links = store.rule_mut(id).link_inputs.get_or_insert_with(Vec::new);
    for item in items {
        push_unique_last(links, item);
    }
    Ok(())
}

/// Expand every phony, non-alias rule among `items` to its inputs,
/// recursively. Items that name nothing (or name buildable rules or
/// aliases) pass through. Safe on cyclic phony graphs.
pub fn rule_flatten_aliases(store: &RuleStore, items: &[String]) -> Vec<String> {
    let mut result = Vec::new();
    let mut active = HashSet::new();
    for item in items {
        flatten_into(store, item, &mut result, &mut active);
    }
    result
}

fn flatten_into(store: &RuleStore, item: &str, result: &mut Vec<String>, active: &mut HashSet<RuleId>) {
    if let Some(id) = store.lookup(item) {
        let rule = store.rule(id);
        if rule.is_phony && rule.link_inputs.is_none() {
            if active.insert(id) {
                let inputs = rule.inputs.clone();
                for input in &inputs {
                    flatten_into(store, input, result, active);
                }
                active.remove(&id);
            }
            return;
        }
    }
    push_unique_last(result, item);
}

/// Replace every alias among `items` with its `link_inputs`, recursively,
/// de-duplicating with the *last* occurrence winning.
pub fn rule_get_link_inputs(store: &RuleStore, items: &[String]) -> Vec<String> {
    let mut result = Vec::new();
    let mut active = HashSet::new();
    for item in items {
        link_into(store, item, &mut result, &mut active);
    }
    result
}

fn link_into(store: &RuleStore, item: &str, result: &mut Vec<String>, active: &mut HashSet<RuleId>) {
    if let Some(id) = store.lookup(item) {
        if let Some(links) = store.rule(id).link_inputs.clone() {
            if active.insert(id) {
                for link in &links {
                    link_into(store, link, result, active);
                }
                active.remove(&id);
            }
            return;
        }
    }
    push_unique_last(result, item);
}

/// The inputs of the rule producing `name`, run through
/// [`rule_get_link_inputs`].
///
/// # Errors
///
/// Fails when no rule produces `name`.
pub fn rule_get_inputs(store: &RuleStore, name: &str) -> Result<Vec<String>> {
    let name = normalize_filename(&[name]);
    let id = store
        .lookup(&name)
        .ok_or_else(|| Error::UnknownRule { name })?;
    Ok(inputs_of(store, id))
}

/// [`rule_get_inputs`] by rule id, for callers that already resolved one.
pub fn inputs_of(store: &RuleStore, id: RuleId) -> Vec<String> {
    rule_get_link_inputs(store, &store.rule(id).inputs)
}
