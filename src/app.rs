//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - resolves the selection (town, dataset, year) against the static catalog
//! - runs fetches / bulk exports and prints reports
//! - writes CSV exports

use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::cli::{BulkArgs, Command, ExportArgs, FetchArgs, SelectionArgs};
use crate::data::AdemeClient;
use crate::domain::catalog::{self, DATASETS, TOWNS};
use crate::domain::{DashboardConfig, YearFilter};
use crate::error::AppError;
use crate::report::{SummaryHeader, format_distribution, format_page, format_summary};
use crate::view::{FetchStatus, grade_distribution, paginate};

pub mod logging;
pub mod pipeline;

/// Entry point for the `dpe` binary.
pub fn run() -> Result<(), AppError> {
    // `dpe` and `dpe -t Longwy` behave like `dpe tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let is_tui = matches!(cli.command, Command::Tui(_));
    logging::init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref(), is_tui)?;

    match cli.command {
        Command::Tui(args) => handle_tui(&args),
        Command::Fetch(args) => handle_fetch(&args),
        Command::Export(args) => handle_export(&args),
        Command::Bulk(args) => handle_bulk(&args),
        Command::Towns => {
            print_towns();
            Ok(())
        }
        Command::Datasets => {
            print_datasets();
            Ok(())
        }
    }
}

fn handle_tui(args: &SelectionArgs) -> Result<(), AppError> {
    let config = config_from_selection(args)?;
    crate::tui::run(config, AdemeClient::from_env())
}

fn handle_fetch(args: &FetchArgs) -> Result<(), AppError> {
    let mut config = config_from_selection(&args.selection)?;
    config.fetch_size = args.size;
    config.page_size = args.page_size.max(1);
    config.metric = args.metric;

    let client = AdemeClient::from_env();
    let state = if args.allow_empty {
        pipeline::load_view_or_empty(&client, &config)
    } else {
        pipeline::load_view(&client, &config)
    };
    if state.status == FetchStatus::Error {
        return Err(AppError::new(
            4,
            state.error.unwrap_or_else(|| "Fetch failed.".to_string()),
        ));
    }

    let filtered = state.filtered();

    if args.json {
        let json = serde_json::to_string_pretty(&filtered)
            .map_err(|e| AppError::new(4, format!("Failed to serialize records: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    let header = SummaryHeader {
        town: &state.town,
        dataset: &state.dataset_id,
        year: state.year,
        upstream_total: state.total,
        received: state.records.len(),
    };
    println!("{}", format_summary(&header, &state.stats()));
    println!("{}", format_distribution(&grade_distribution(&filtered), 40));
    println!("{}", format_page(&paginate(&filtered, config.page_size, args.page)));

    Ok(())
}

fn handle_export(args: &ExportArgs) -> Result<(), AppError> {
    let mut config = config_from_selection(&args.selection)?;
    config.fetch_size = args.size;

    let client = AdemeClient::from_env();
    let state = pipeline::load_view(&client, &config);
    if state.status == FetchStatus::Error {
        return Err(AppError::new(
            4,
            state.error.unwrap_or_else(|| "Fetch failed.".to_string()),
        ));
    }

    let filtered = state.filtered();
    let (dir, name) = split_output(
        args.output.as_deref(),
        &view_export_name(&config.town, config.year, Local::now().year()),
    );
    let path = crate::io::write_dpe_csv(&dir, &name, &filtered)?;

    println!("Exported {} records to {}", filtered.len(), path.display());
    Ok(())
}

fn handle_bulk(args: &BulkArgs) -> Result<(), AppError> {
    let dataset = resolve_dataset(&args.dataset)?;
    let towns: Vec<&str> = if args.towns.is_empty() {
        TOWNS.to_vec()
    } else {
        args.towns
            .iter()
            .map(|t| resolve_town(t))
            .collect::<Result<_, _>>()?
    };

    let config = DashboardConfig {
        dataset_id: dataset.to_string(),
        bulk_delay: std::time::Duration::from_millis(args.delay_ms),
        bulk_page_size: args.size,
        ..DashboardConfig::default()
    };

    let bar = ProgressBar::new(towns.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("Récupération {pos}/{len} [{bar:40}] {msg}") {
        bar.set_style(style.progress_chars("=> "));
    }

    let client = AdemeClient::from_env();
    let report = pipeline::run_bulk(&client, &config, &towns, |done, _total| {
        bar.set_position(done as u64);
        if let Some(town) = towns.get(done.saturating_sub(1)) {
            bar.set_message(town.to_string());
        }
    });
    bar.finish_and_clear();

    if !report.failed.is_empty() {
        eprintln!("Skipped {} town(s): {}", report.failed.len(), report.failed.join(", "));
    }

    let (dir, name) = split_output(args.output.as_deref(), &bulk_export_name(Local::now().year()));
    let path = crate::io::write_dpe_csv(&dir, &name, &report.records)?;

    info!(towns = towns.len(), records = report.records.len(), "bulk export written");
    println!("Exported {} records to {}", report.records.len(), path.display());
    Ok(())
}

fn print_towns() {
    println!("{:<24} {:<5} {:>9} {:>9}", "Commune", "Dept", "Lat", "Lon");
    for town in TOWNS {
        let (lat, lon) = catalog::town_center(town).unwrap_or(catalog::DEFAULT_CENTER);
        println!(
            "{:<24} {:<5} {:>9.4} {:>9.4}",
            town,
            catalog::department_for(town),
            lat,
            lon
        );
    }
}

fn print_datasets() {
    for ds in DATASETS {
        println!("{:<24} {:<8} {}", ds.id, format!("{:?}", ds.schema()).to_lowercase(), ds.name);
    }
}

/// Build the runtime config from a selection, validating town and dataset.
pub fn config_from_selection(args: &SelectionArgs) -> Result<DashboardConfig, AppError> {
    let town = match &args.town {
        Some(t) => resolve_town(t)?,
        None => TOWNS[0],
    };
    let dataset = resolve_dataset(&args.dataset)?;

    Ok(DashboardConfig {
        town: town.to_string(),
        dataset_id: dataset.to_string(),
        year: args.year,
        ..DashboardConfig::default()
    })
}

fn resolve_town(name: &str) -> Result<&'static str, AppError> {
    catalog::find_town(name).ok_or_else(|| {
        AppError::new(
            2,
            format!("Unknown town '{name}'. Run `dpe towns` for the list."),
        )
    })
}

fn resolve_dataset(id: &str) -> Result<&'static str, AppError> {
    catalog::find_dataset(id)
        .map(|d| d.id)
        .ok_or_else(|| AppError::new(2, format!("Unknown dataset '{id}'. Run `dpe datasets` for the list.")))
}

/// Default filename for a single-town export.
pub fn view_export_name(town: &str, year: YearFilter, current_year: i32) -> String {
    format!("dpe_{town}_{year}_{current_year}.csv")
}

/// Default filename for the bulk export.
pub fn bulk_export_name(current_year: i32) -> String {
    format!("Export_Global_Complet_{current_year}.csv")
}

/// Split `--output` into directory + filename, or use `default_name` in the
/// current directory.
fn split_output(output: Option<&Path>, default_name: &str) -> (PathBuf, String) {
    let Some(path) = output else {
        return (PathBuf::from("."), default_name.to_string());
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| default_name.to_string());
    (dir, name)
}

/// Rewrite argv so `dpe` defaults to `dpe tui`.
///
/// Rules:
/// - `dpe`                      -> `dpe tui`
/// - `dpe -t Longwy ...`        -> `dpe tui -t Longwy ...`
/// - `dpe --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "tui" | "fetch" | "export" | "bulk" | "towns" | "datasets"
    );
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}
