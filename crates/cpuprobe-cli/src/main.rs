//! CLI entry point - the composition root.
//!
//! Wires the runtime adapters into one probe run and prints the report.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cpuprobe_cli::presentation::{render_json, render_text};
use cpuprobe_cli::{Cli, CliError};
use cpuprobe_core::validate_settings;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = cli.settings();
    validate_settings(&settings).map_err(CliError::from)?;
    debug!(?settings, baseline = %format_args!("{:#010x}", cli.baseline.bits()), "Probing");

    let report = cpuprobe_runtime::run_probe(cli.baseline, &settings);

    if cli.json {
        println!("{}", render_json(&report)?);
    } else {
        print!("{}", render_text(&report));
    }
    Ok(())
}

fn main() -> ExitCode {
    // Load environment variables so clap sees CPUPROBE_* from .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(err.downcast_ref::<CliError>().map_or(1, CliError::exit_code))
        }
    }
}
