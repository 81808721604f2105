//! prop-resolve
//!
//! Resolves typed configuration declared in a YAML manifest from command line
//! assignments, environment variables and property files, and reports every
//! problem in one pass.

use anyhow::{Result, anyhow};
use clap::Parser;
use prop_resolve::cli::check::CheckArgs;
use prop_resolve::cli::{Cli, Command, NamesArgs};
use prop_resolve::format::{
    OutputFormat, format_names_markdown, format_problems_markdown, format_values_markdown,
    names_report_json, problems_to_json, values_to_json,
};
use prop_resolve::manifest::Manifest;
use prop_resolve::naming::{CaseInsensitiveNaming, CaseSensitiveNaming, NamingStrategy};
use prop_resolve::problem::ProblemList;
use prop_resolve::registry::RegistryBuilder;
use serde_json::Value;
use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the tracing subscriber selected by `--log`. `RUST_LOG` overrides the level.
fn init_logging(log: &str, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    OutputFormat::from_str(format).ok_or_else(|| anyhow!("unknown output format '{format}' (expected text or json)"))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_problems(problems: &ProblemList, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&problems_to_json(problems)),
        OutputFormat::Text => {
            print!("{}", format_problems_markdown(problems));
            Ok(())
        }
    }
}

fn run_check(args: &CheckArgs) -> Result<ExitCode> {
    let format = parse_format(&args.format)?;
    let manifest = Manifest::from_path(&args.manifest)?;
    let groups = manifest.to_groups()?;
    debug!(groups = groups.len(), "manifest groups built");

    match args.resolver(groups).resolve().into_result() {
        Ok(values) => {
            info!(values = values.loaded().len(), "configuration is valid");
            match format {
                OutputFormat::Json => print_json(&values_to_json(&values))?,
                OutputFormat::Text => print!("{}", format_values_markdown(&values)),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(problems) => {
            print_problems(&problems, format)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_names(args: &NamesArgs) -> Result<ExitCode> {
    let format = parse_format(&args.format)?;
    let manifest = Manifest::from_path(&args.manifest)?;
    let naming: Arc<dyn NamingStrategy> = if args.case_sensitive {
        Arc::new(CaseSensitiveNaming)
    } else {
        Arc::new(CaseInsensitiveNaming)
    };
    let (registry, problems) = RegistryBuilder::new()
        .naming(naming)
        .groups(manifest.to_groups()?)
        .build();

    let mut report: ProblemList = ProblemList::new();
    report.add_all(problems);
    let status = if report.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    };

    match format {
        OutputFormat::Json => print_json(&names_report_json(&registry, &report))?,
        OutputFormat::Text => {
            print!("{}", format_names_markdown(&registry));
            if !report.is_empty() {
                print!("{}", format_problems_markdown(&report));
            }
        }
    }
    Ok(status)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log, cli.verbose)?;

    match &cli.command {
        Command::Check(args) => run_check(args),
        Command::Names(args) => run_names(args),
    }
}
