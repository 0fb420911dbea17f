//! The `show-vars` subcommand.

use anyhow::Result;

use crate::Invocation;

/// Print the final variable values, sorted by name, with `user-set` and
/// `directory` annotations.
pub fn show_vars(invocation: &Invocation) -> Result<()> {
    let project = invocation.load_project()?;

    let mut names: Vec<&str> = project.vars.names().collect();
    names.sort_unstable();
    for name in names {
        let value = project.vars.get_variable(name, &[]);
        let mut notes: Vec<&str> = Vec::new();
        if project.vars.is_user_set(name) {
            notes.push("user-set");
        }
        if project.vars.is_directory_variable(name) {
            notes.push("directory");
        }
        if notes.is_empty() {
            println!("{name} = {value}");
        } else {
            println!("{name} = {value}  # {}", notes.join(", "));
        }
    }
    Ok(())
}
