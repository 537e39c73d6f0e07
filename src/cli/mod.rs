//! Command-line parsing for the DPE dashboard.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! fetching, view logic and rendering.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Metric, YearFilter};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dpe", version, about = "DPE dashboard for the ADEME open-data API")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write logs to this file (the TUI discards logs otherwise).
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive dashboard (default).
    Tui(SelectionArgs),
    /// Fetch one town, print statistics, grade distribution and one page of records.
    Fetch(FetchArgs),
    /// Fetch one town and write the (year-filtered) records to CSV.
    Export(ExportArgs),
    /// Fetch every configured town in turn and write a single CSV.
    Bulk(BulkArgs),
    /// List the configured towns.
    Towns,
    /// List the available datasets.
    Datasets,
}

/// Town / dataset / year selection shared by most subcommands.
#[derive(Debug, Args, Clone)]
pub struct SelectionArgs {
    /// Town (commune) to query. Defaults to the first configured town.
    #[arg(short, long)]
    pub town: Option<String>,

    /// ADEME dataset id.
    #[arg(short, long, default_value = "dpe03existant")]
    pub dataset: String,

    /// Year of establishment (YYYY), or "Toutes" for every year.
    #[arg(short, long, default_value = "Toutes")]
    pub year: YearFilter,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Number of lines requested from the API (max 2000).
    #[arg(long, default_value_t = 2000)]
    pub size: usize,

    /// Table page to print (1-based).
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per table page.
    #[arg(long, default_value_t = 25)]
    pub page_size: usize,

    /// Metric averaged in the statistics.
    #[arg(long, value_enum, default_value_t = Metric::Conso)]
    pub metric: Metric,

    /// Print the filtered records as JSON instead of a report.
    #[arg(long)]
    pub json: bool,

    /// Treat an upstream failure as an empty result instead of an error.
    #[arg(long)]
    pub allow_empty: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Number of lines requested from the API (max 2000).
    #[arg(long, default_value_t = 2000)]
    pub size: usize,

    /// Output file. Defaults to `dpe_<town>_<year>_<current year>.csv`.
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct BulkArgs {
    /// ADEME dataset id.
    #[arg(short, long, default_value = "dpe03existant")]
    pub dataset: String,

    /// Comma-separated towns. Defaults to every configured town.
    #[arg(long, value_delimiter = ',')]
    pub towns: Vec<String>,

    /// Pause before each request (milliseconds).
    #[arg(long, default_value_t = 150)]
    pub delay_ms: u64,

    /// Number of lines requested per town (max 2000).
    #[arg(long, default_value_t = 1000)]
    pub size: usize,

    /// Output file. Defaults to `Export_Global_Complet_<current year>.csv`.
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}
