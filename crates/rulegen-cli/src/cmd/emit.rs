//! Artifact emission subcommands.

use anyhow::Result;

use crate::Invocation;
use rulegen_core::emit;

/// `makefile` (also the default subcommand): emit a classic Makefile.
pub fn makefile(invocation: &Invocation) -> Result<()> {
    let mut project = invocation.load_project()?;
    let regen = invocation.regen("makefile", "Makefile", &[]);
    emit::makefile::emit(&mut project, &regen)
}

/// `ninjafile`: emit a ninja build file.
pub fn ninjafile(invocation: &Invocation) -> Result<()> {
    let mut project = invocation.load_project()?;
    let regen = invocation.regen("ninjafile", "build.ninja", &[]);
    emit::ninja::emit(&mut project, &regen)
}

/// `scriptfile TARGET...`: emit a linear shell script for the targets.
pub fn scriptfile(invocation: &Invocation, targets: &[String]) -> Result<()> {
    let mut project = invocation.load_project()?;
    let regen = invocation.regen("scriptfile", "build.sh", targets);
    emit::script::emit(&mut project, &regen)
}
