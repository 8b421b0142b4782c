//! CLI argument parsing.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gotest-report",
    version,
    about = "Summarize `go test -json` output per package",
    after_help = "Examples:\n  go test -json ./... | gotest-report summary\n  gotest-report summary results.jsonl --json --points-pattern '_(\\d+)$'\n  gotest-report transcript results.jsonl --package example.com/mod/pkg",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Tracing filter (e.g. `debug`, `gotest_report=trace`); overrides RUST_LOG
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Summary(SummaryArgs),
    Transcript(TranscriptArgs),
}

/// Summary command inputs.
#[derive(Parser, Debug)]
#[command(about = "Summarize every package in a test event stream")]
pub struct SummaryArgs {
    /// File with `go test -json` output, or `-` for stdin
    #[arg(value_name = "INPUT", default_value = "-")]
    pub input: PathBuf,

    /// Report config JSON
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Regex over top-level test names whose first capture group is the point value
    #[arg(long, value_name = "REGEX")]
    pub points_pattern: Option<String>,

    /// Leave out packages that ran no tests
    #[arg(long)]
    pub omit_untested: bool,

    /// Leave out packages that passed
    #[arg(long)]
    pub omit_successful: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Write the report here instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

/// Transcript command inputs.
#[derive(Parser, Debug)]
#[command(about = "Print the reconstructed test output of one package")]
pub struct TranscriptArgs {
    /// File with `go test -json` output, or `-` for stdin
    #[arg(value_name = "INPUT", default_value = "-")]
    pub input: PathBuf,

    /// Package import path
    #[arg(long, value_name = "PKG")]
    pub package: String,
}
