//! Variable expansion for command strings.
//!
//! Expansion happens exactly once, at rule-construction time, so the emitted
//! artifact contains no placeholders. `$@` and `$<` refer to the first
//! output and first input of the *constructing* call; everything else reads
//! the variable store.

use crate::vars::{Scope, VarStore};

/// The rule context a command string is expanded against.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpandCtx<'a> {
    /// First output of the rule being constructed, if any.
    pub output: Option<&'a str>,
    /// First input of the rule being constructed, if any.
    pub input: Option<&'a str>,
}

/// Substitute `$$`, `$@`, `$<`, `$X`, and `$(NAME)` in `text`.
///
/// `$$` yields a literal `$`; an unterminated `$(` and a trailing lone `$`
/// are kept as-is. Undefined variables expand to the empty string.
pub fn expand(vars: &VarStore, scopes: &[&Scope], ctx: ExpandCtx<'_>, text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            None => result.push('$'),
            Some('$') => result.push('$'),
            Some('@') => result.push_str(ctx.output.unwrap_or("")),
            Some('<') => result.push_str(ctx.input.unwrap_or("")),
            Some('(') => {
                let rest = chars.as_str();
                match rest.find(')') {
                    Some(end) => {
                        let name = &rest[..end];
                        result.push_str(&vars.get_variable(name, scopes));
                        chars = rest[end + 1..].chars();
                    }
                    None => {
                        result.push_str("$(");
                        result.push_str(rest);
                        chars = "".chars();
                    }
                }
            }
            Some(other) => {
                result.push_str(&vars.get_variable(&other.to_string(), scopes));
            }
        }
    }
    result
}
