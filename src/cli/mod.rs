//! CLI command definitions for prop-resolve
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod check;

use clap::{Args, Parser, Subcommand};
use check::CheckArgs;
use std::path::PathBuf;

/// Resolve and inspect typed configuration described by a manifest
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the manifest's properties and print values or problems
    Check(CheckArgs),

    /// List canonical names and aliases declared by a manifest
    Names(NamesArgs),
}

/// Arguments for the names subcommand
#[derive(Args, Debug)]
pub struct NamesArgs {
    /// Property manifest (YAML)
    #[arg(short, long, value_name = "FILE")]
    pub manifest: PathBuf,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Match names case-sensitively
    #[arg(long)]
    pub case_sensitive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_command() {
        let cli = Cli::try_parse_from([
            "prop-resolve",
            "check",
            "--manifest",
            "app.yaml",
            "--set",
            "port=80",
            "--set",
            "debug",
            "--env-prefix",
            "APP_",
            "--properties",
            "a.properties",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.log, "2");
        match cli.command {
            Command::Check(args) => {
                assert_eq!(args.set, vec!["port=80", "debug"]);
                assert_eq!(args.env_prefix.as_deref(), Some("APP_"));
                assert_eq!(args.properties, vec![PathBuf::from("a.properties")]);
                assert!(args.uses_env());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_manifest_is_required() {
        assert!(Cli::try_parse_from(["prop-resolve", "names"]).is_err());
    }
}
