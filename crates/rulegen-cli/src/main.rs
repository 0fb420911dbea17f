//! rulegen - a rule-graph build generator.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rulegen_cli::cmd;
use rulegen_cli::{Cli, Commands, Invocation, split_assignments};

fn main() -> Result<()> {
    // Verifier diagnostics ride on `warn`; RUST_LOG can raise or silence.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Pre-process arguments: KEY=VALUE assignments and --with/--without
    // toggles are ours, everything else is clap's.
    let args: Vec<String> = std::env::args().collect();
    let program = args
        .first()
        .cloned()
        .unwrap_or_else(|| "rulegen".to_string());
    let (assignments, rest) = split_assignments(&args);
    let cli = Cli::parse_from(rest);

    let invocation = Invocation {
        program,
        in_dir: cli.in_dir,
        out_dir: cli.out_dir,
        infile: cli.infile,
        outfile: cli.outfile,
        assignments,
    };
    tracing::debug!(?invocation, "parsed invocation");

    match cli.command {
        None | Some(Commands::Makefile) => cmd::emit::makefile(&invocation),
        Some(Commands::Ninjafile) => cmd::emit::ninjafile(&invocation),
        Some(Commands::Scriptfile { targets }) => cmd::emit::scriptfile(&invocation, &targets),
        Some(Commands::ShowVars) => cmd::show_vars::show_vars(&invocation),
    }
}
