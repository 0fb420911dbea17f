//! rulegen - a rule-graph build generator.
//!
//! The driver seeds the directory variables from its flags, applies the
//! user's `KEY=VALUE` assignments, loads the entry rules file, and hands the
//! finished project to the emitter selected by the subcommand.

pub mod cmd;

use clap::{Parser, Subcommand};

use rulegen_core::rules_file::Loader;
use rulegen_core::{Project, RegenContext};

/// Command-line interface.
#[derive(Debug, Parser)]
#[command(name = "rulegen")]
#[command(version, about = "Turn a rules file into a Makefile, ninja file, or shell script")]
pub struct Cli {
    /// Source root containing the rules file
    #[arg(long = "in", value_name = "PATH", default_value = ".")]
    pub in_dir: String,

    /// Output root for generated files
    #[arg(long = "out", value_name = "PATH", default_value = ".")]
    pub out_dir: String,

    /// Name of the entry rules file
    #[arg(long, value_name = "NAME", default_value = "Rules.toml")]
    pub infile: String,

    /// Name of the generated artifact (defaults per subcommand)
    #[arg(long, value_name = "NAME")]
    pub outfile: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands; omitting one means `makefile`.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Emit a classic Makefile (the default)
    Makefile,
    /// Emit a ninja build file
    Ninjafile,
    /// Emit a linear shell script for the given targets
    Scriptfile {
        /// Targets to build, in order
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Print the final variable values with annotations
    ShowVars,
}

/// A `KEY=VALUE` assignment pre-scanned from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

/// Pull `KEY=VALUE` assignments and `--with-*`/`--without-*`/`--enable-*`/
/// `--disable-*` toggles out of `args`, leaving the rest for clap.
///
/// Toggles become `WITH_<NAME>=1|0` with hyphens mapped to underscores and
/// the name uppercased.
pub fn split_assignments(args: &[String]) -> (Vec<Assignment>, Vec<String>) {
    let mut assignments = Vec::new();
    let mut rest = Vec::new();

    for (index, arg) in args.iter().enumerate() {
        if index == 0 {
            rest.push(arg.clone());
            continue;
        }
        if let Some(assignment) = parse_toggle(arg).or_else(|| parse_assignment(arg)) {
            assignments.push(assignment);
        } else {
            rest.push(arg.clone());
        }
    }
    (assignments, rest)
}

fn parse_toggle(arg: &str) -> Option<Assignment> {
    let (name, value) = if let Some(name) = arg.strip_prefix("--with-") {
        (name, "1")
    } else if let Some(name) = arg.strip_prefix("--enable-") {
        (name, "1")
    } else if let Some(name) = arg.strip_prefix("--without-") {
        (name, "0")
    } else if let Some(name) = arg.strip_prefix("--disable-") {
        (name, "0")
    } else {
        return None;
    };
    if name.is_empty() {
        return None;
    }
    Some(Assignment {
        name: format!("WITH_{}", name.replace('-', "_").to_uppercase()),
        value: value.to_string(),
    })
}

fn parse_assignment(arg: &str) -> Option<Assignment> {
    if arg.starts_with('-') {
        return None;
    }
    let (name, value) = arg.split_once('=')?;
    let mut chars = name.chars();
    let leading_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !leading_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some(Assignment {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// One fully parsed driver invocation.
#[derive(Debug)]
pub struct Invocation {
    /// The driver executable (argv\[0\]), re-embedded into the self-rebuild
    /// rule.
    pub program: String,
    /// Source root.
    pub in_dir: String,
    /// Output root.
    pub out_dir: String,
    /// Entry rules-file name.
    pub infile: String,
    /// Artifact name override.
    pub outfile: Option<String>,
    /// User variable assignments, in command-line order.
    pub assignments: Vec<Assignment>,
}

impl Invocation {
    /// Seed the variables, load the rules tree, and return the project.
    ///
    /// # Errors
    ///
    /// Propagates rules-file load failures with the offending file in the
    /// error chain.
    pub fn load_project(&self) -> anyhow::Result<Project> {
        let mut project = Project::new();
        project.vars.set_variable("IN", &self.in_dir);
        project.vars.set_variable("OUT", &self.out_dir);
        for assignment in &self.assignments {
            project
                .vars
                .set_user_variable(&assignment.name, &assignment.value);
        }
        // Marker and anonymous-rule state lands under the output root unless
        // the user points TMP elsewhere.
        project.vars.add_variable("TMP", &self.out_dir);

        Loader::new(&mut project, &self.infile).load_root()?;
        Ok(project)
    }

    /// The regeneration context for the given subcommand.
    pub fn regen(&self, subcommand: &str, default_outfile: &str, targets: &[String]) -> RegenContext {
        RegenContext {
            program: self.program.clone(),
            in_dir: self.in_dir.clone(),
            out_dir: self.out_dir.clone(),
            infile: self.infile.clone(),
            outfile: self
                .outfile
                .clone()
                .unwrap_or_else(|| default_outfile.to_string()),
            subcommand: subcommand.to_string(),
            targets: targets.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn assignments_and_toggles_are_extracted() {
        let (assignments, rest) = split_assignments(&args(&[
            "rulegen",
            "--in=src",
            "CC=clang",
            "--with-ssl",
            "--without-zlib-ng",
            "--enable-docs",
            "--disable-x11",
            "makefile",
        ]));
        let pairs: Vec<(String, String)> = assignments
            .into_iter()
            .map(|a| (a.name, a.value))
            .collect();
        assert_eq!(
            pairs,
            [
                ("CC".to_string(), "clang".to_string()),
                ("WITH_SSL".to_string(), "1".to_string()),
                ("WITH_ZLIB_NG".to_string(), "0".to_string()),
                ("WITH_DOCS".to_string(), "1".to_string()),
                ("WITH_X11".to_string(), "0".to_string()),
            ]
        );
        assert_eq!(rest, args(&["rulegen", "--in=src", "makefile"]));
    }

    #[test]
    fn flag_values_with_equals_stay_with_clap() {
        let (assignments, rest) =
            split_assignments(&args(&["rulegen", "--outfile=GNUmakefile"]));
        assert!(assignments.is_empty());
        assert_eq!(rest, args(&["rulegen", "--outfile=GNUmakefile"]));
    }

    #[test]
    fn malformed_keys_are_not_assignments() {
        let (assignments, rest) = split_assignments(&args(&["rulegen", "9=x", "a b=c"]));
        assert!(assignments.is_empty());
        assert_eq!(rest.len(), 3);
    }

    #[test]
    fn cli_parses_subcommands() {
        use clap::Parser;
        let cli = Cli::parse_from(["rulegen", "--out=build", "ninjafile"]);
        assert_eq!(cli.out_dir, "build");
        assert!(matches!(cli.command, Some(Commands::Ninjafile)));

        let cli = Cli::parse_from(["rulegen", "scriptfile", "all"]);
        match cli.command {
            Some(Commands::Scriptfile { targets }) => assert_eq!(targets, ["all"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn scriptfile_without_targets_is_rejected() {
        use clap::Parser;
        assert!(Cli::try_parse_from(["rulegen", "scriptfile"]).is_err());
        assert!(Cli::try_parse_from(["rulegen", "--bogus"]).is_err());
    }
}
