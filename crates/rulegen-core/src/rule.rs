//! The rule record and the arena-backed rule store.
//!
//! A rule may be reachable through several output names, so rules live in an
//! owning arena and every output name maps to an index. Merging two rules is
//! detected by index equality, never by comparing contents.

use std::collections::HashMap;

/// Index of a rule inside its [`RuleStore`].
pub type RuleId = usize;

/// A node declaring that `outputs` are produced from `inputs` by running
/// `commands`.
///
/// All paths are canonical by the time they are stored. `commands` are fully
/// expanded; the emitters copy them out verbatim.
#[derive(Debug, Default, Clone)]
pub struct Rule {
    /// Output paths; never empty, first one is the rule's identity for
    /// hashing and `$@`.
    pub outputs: Vec<String>,
    /// Input paths, insertion-ordered and duplicate-free.
    pub inputs: Vec<String>,
    /// Fully expanded command lines.
    pub commands: Vec<String>,
    /// Directory-creation rule; excluded from hash tracking.
    pub is_directory: bool,
    /// Higher priorities are emitted first; ties break on output name.
    pub priority: i32,
    /// Free-form comment lines emitted above the rule.
    pub comments: Vec<String>,
    /// Status string displayed when the rule runs.
    pub info: Option<String>,
    /// Rule produces labels, not files.
    pub is_phony: bool,
    /// Exempt from the generated clean rule.
    pub is_precious: bool,
    /// When present, the rule is a library alias: dependents link against
    /// this list instead of the rule's own outputs.
    pub link_inputs: Option<Vec<String>>,
    /// Transient emission guard; a rule reached via several output keys is
    /// written once.
    pub emitted: bool,
}

/// Append `item` unless it is already present (insertion-ordered de-dup).
pub fn push_unique(seq: &mut Vec<String>, item: &str) {
    if !seq.iter().any(|existing| existing == item) {
        seq.push(item.to_string());
    }
}

/// Append `item`, first removing an earlier occurrence (last-wins ordering,
/// as linkers want it).
pub fn push_unique_last(seq: &mut Vec<String>, item: &str) {
    if let Some(pos) = seq.iter().position(|existing| existing == item) {
        seq.remove(pos);
    }
    seq.push(item.to_string());
}

/// Owning collection of rules plus the output-name index.
#[derive(Debug, Default)]
pub struct RuleStore {
    rules: Vec<Rule>,
    by_output: HashMap<String, RuleId>,
}

impl RuleStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The rule id bound to an output name, if any.
    pub fn lookup(&self, name: &str) -> Option<RuleId> {
        self.by_output.get(name).copied()
    }

    /// Shared access to a rule.
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    /// Mutable access to a rule.
    pub fn rule_mut(&mut self, id: RuleId) -> &mut Rule {
        &mut self.rules[id]
    }

    /// Move a fresh rule into the arena and bind every output name to it.
    pub fn insert(&mut self, rule: Rule) -> RuleId {
        let id = self.rules.len();
        for output in &rule.outputs {
            self.by_output.insert(output.clone(), id);
        }
        self.rules.push(rule);
        id
    }

    /// Bind an additional output name to an existing rule.
    pub fn bind(&mut self, name: &str, id: RuleId) {
        self.by_output.insert(name.to_string(), id);
    }

    /// Number of rules in the arena.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All rule ids, in creation order.
    pub fn ids(&self) -> std::ops::Range<RuleId> {
        0..self.rules.len()
    }

    /// Output keys projected into emission order: descending priority, ties
    /// broken by lexical output name.
    pub fn emission_keys(&self) -> Vec<(String, RuleId)> {
        let mut keys: Vec<(String, RuleId)> = self
            .by_output
            .iter()
            .map(|(name, id)| (name.clone(), *id))
            .collect();
        keys.sort_by(|a, b| {
            let pa = self.rules[a.1].priority;
            let pb = self.rules[b.1].priority;
            pb.cmp(&pa).then_with(|| a.0.cmp(&b.0))
        });
        keys
    }

    /// Whether any rule in the store produces `name`.
    pub fn is_generated(&self, name: &str) -> bool {
        self.by_output.contains_key(name)
    }
}
