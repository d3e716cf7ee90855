// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `pchdeps`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pchdeps",
    version,
    about = "Collect header dependencies and build shared precompiled headers.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Pchdeps.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Pchdeps.toml")]
    pub config: String,

    /// Build every PCH once and exit instead of watching dependencies.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PCHDEPS_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print project parts and scanner arguments, but
    /// don't scan or compile anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
