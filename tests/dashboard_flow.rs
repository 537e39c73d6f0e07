use std::cell::RefCell;
use std::fs;
use std::time::Duration;

use dpe_hub::app::pipeline;
use dpe_hub::data::{DpeQuery, DpeSource, normalize_record};
use dpe_hub::domain::{ApiPage, DashboardConfig, YearFilter};
use dpe_hub::error::{ExportError, FetchError};
use dpe_hub::io::write_dpe_csv;
use dpe_hub::view::{FetchStatus, ViewEvent, ViewState, update};
use serde_json::json;

/// Serves two records per town; `Thil` answers 503.
struct FakeAdeme {
    seen: RefCell<Vec<String>>,
}

impl FakeAdeme {
    fn new() -> Self {
        Self {
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl DpeSource for FakeAdeme {
    fn fetch(&self, query: &DpeQuery) -> Result<ApiPage, FetchError> {
        self.seen.borrow_mut().push(query.town.clone());
        if query.town == "Thil" {
            return Err(FetchError::Status {
                status: 503,
                body: "maintenance".to_string(),
            });
        }
        let raw = [
            json!({
                "date_etablissement_dpe": "2024-03-01",
                "etiquette_dpe": "F",
                "conso_5_usages_par_m2_ep": 320.0,
                "surface_habitable_logement": 70,
                "adresse_ban": "1 rue Haute",
                "code_postal_ban": "54400",
            }),
            json!({
                "date_etablissement_dpe": "2022-11-20",
                "etiquette_dpe": "c",
                "conso_5_usages_par_m2_ep": 120.0,
                "surface_habitable_logement": 95,
            }),
        ];
        Ok(ApiPage {
            total: 120,
            results: raw.iter().map(|r| normalize_record(r, &query.town)).collect(),
        })
    }
}

fn config(town: &str) -> DashboardConfig {
    DashboardConfig {
        town: town.to_string(),
        bulk_delay: Duration::ZERO,
        ..DashboardConfig::default()
    }
}

#[test]
fn load_filter_and_export_a_town() {
    let source = FakeAdeme::new();
    let state = pipeline::load_view(&source, &config("Longwy"));

    assert_eq!(state.status, FetchStatus::Success);
    assert_eq!(state.total, 120);
    assert_eq!(state.records.len(), 2);

    let stats = state.stats();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.passoires, 1);
    assert!((stats.average - 220.0).abs() < 1e-9);

    let state = update(state, ViewEvent::SelectYear(YearFilter::Year(2024)));
    assert_eq!(state.filtered().len(), 1);
    assert_eq!(state.stats().passoires_pct, 100.0);

    let dir = tempfile::tempdir().unwrap();
    let path = write_dpe_csv(dir.path(), "dpe_Longwy_2024_2026", &state.filtered()).unwrap();
    assert!(path.ends_with("dpe_Longwy_2024_2026.csv"));

    let bytes = fs::read(&path).unwrap();
    assert!(bytes.starts_with("\u{feff}".as_bytes()));
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("\"1 rue Haute\""));
}

#[test]
fn empty_selection_writes_nothing() {
    let source = FakeAdeme::new();
    let state = pipeline::load_view(&source, &config("Longwy"));
    let state = update(state, ViewEvent::SelectYear(YearFilter::Year(2011)));
    assert!(state.filtered().is_empty());

    let dir = tempfile::tempdir().unwrap();
    let err = write_dpe_csv(dir.path(), "dpe_Longwy_2011_2026", &state.filtered()).unwrap_err();
    assert!(matches!(err, ExportError::Empty));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn stale_responses_do_not_overwrite_the_latest_selection() {
    let source = FakeAdeme::new();
    let state = update(ViewState::new(&config("Longwy")), ViewEvent::Refresh);
    let first = state.token();
    let stale = pipeline::settle(&source, &state.query(), first);

    let state = update(state, ViewEvent::SelectTown("Thil".to_string()));
    let latest = pipeline::settle(&source, &state.query(), state.token());

    let state = update(state, latest);
    assert_eq!(state.status, FetchStatus::Error);
    assert!(state.error.as_deref().unwrap().contains("503"));

    let state = update(state, stale);
    assert_eq!(state.status, FetchStatus::Error);
    assert!(state.records.is_empty());
}

#[test]
fn bulk_run_skips_failed_towns_and_reports_progress() {
    let source = FakeAdeme::new();
    let mut progress = Vec::new();
    let report = pipeline::run_bulk(
        &source,
        &config("Longwy"),
        &["Longwy", "Thil", "Villerupt"],
        |done, total| progress.push((done, total)),
    );

    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(report.failed, vec!["Thil".to_string()]);
    assert_eq!(report.records.len(), 4);
    assert_eq!(report.records[0].commune_brut, "Longwy");
    assert_eq!(report.records[3].commune_brut, "Villerupt");
    assert_eq!(*source.seen.borrow(), vec!["Longwy", "Thil", "Villerupt"]);

    let dir = tempfile::tempdir().unwrap();
    let path = write_dpe_csv(dir.path(), "Export_Global_Complet_2026.csv", &report.records).unwrap();
    let text = fs::read_to_string(path).unwrap();
    assert_eq!(text.lines().count(), 5);
}
