//! Content-hash marker rules.
//!
//! Downstream runners that only compare timestamps cannot see a changed
//! command line. For every buildable rule we derive a marker file whose name
//! encodes an MD5 of the rule's inputs and commands; when the rule changes,
//! the marker path changes, the marker rule removes the stale marker and the
//! stale output, and the target rebuilds.

use md5::{Digest, Md5};

use crate::error::Result;
use crate::paths::normalize_filename;
use crate::project::Project;
use crate::rule::{RuleId, push_unique};

/// Hex-encoded MD5 of `data`.
pub fn md5_hex(data: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

/// Attach a hash-marker rule to every rule that is neither a directory nor
/// phony.
///
/// The marker lives at `<TMP>/.hash/<name[0..2]>/<name[2..]>_<code>` where
/// `name` hashes the first output and `code` hashes the inputs and commands.
/// Marker rules run at priority −100 and the marker becomes an input of the
/// tracked rule.
///
/// Must run before the bootstrap rules are added, so the bootstrap rules
/// themselves stay unhashed.
pub fn add_hash_markers(project: &mut Project) -> Result<()> {
    let tmp = {
        let tmp = project.vars.get_variable("TMP", &[]);
        if tmp.is_empty() { ".".to_string() } else { tmp }
    };

    let ids: Vec<RuleId> = project.rules.ids().collect();
    for id in ids {
        let (target, code_hash, name_hash) = {
            let rule = project.rules.rule(id);
            if rule.is_directory || rule.is_phony {
                continue;
            }
            let code = md5_hex(&format!(
                "{}\n{}",
                rule.inputs.join(" "),
                rule.commands.join("\n")
            ));
            (rule.outputs[0].clone(), code, md5_hex(&rule.outputs[0]))
        };

        let (prefix, rest) = name_hash.split_at(2);
        let dir = normalize_filename(&[&tmp, &format!(".hash/{prefix}")]);
        let marker = format!("{dir}/{rest}_{code_hash}");

        project.generate(
            &[marker.clone()],
            &[],
            &[
                format!("@rm -f {dir}/{rest}_* {target}"),
                format!("@touch {marker}"),
            ],
        )?;
        let marker_id = project
            .rules
            .lookup(&marker)
            .expect("marker rule was just created");
        project.rules.rule_mut(marker_id).priority = -100;

        push_unique(&mut project.rules.rule_mut(id).inputs, &marker);
    }
    Ok(())
}
