//! Shared domain types.
//!
//! `DpeResult` is the one canonical record shape every upstream dataset is
//! normalized into; everything downstream (stats, table, map, CSV) works on it.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Placeholder shown when a record carries no address at all.
pub const ADDRESS_PLACEHOLDER: &str = "Adresse masquée";

/// Default value for text fields and grades that the upstream omitted.
pub const NOT_AVAILABLE: &str = "N/A";

/// One energy-performance diagnostic, normalized.
///
/// Every field is always populated; see `data::normalize` for the defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DpeResult {
    #[serde(rename = "_id")]
    pub id: String,
    pub n_dpe: String,
    pub date_etablissement_dpe: String,
    pub etiquette_dpe: String,
    pub etiquette_ges: String,
    pub conso_5_usages_m2_an: f64,
    pub emission_ges_5_usages_m2_an: f64,
    pub ubat: f64,
    pub cout_total_5_usages: f64,
    pub surface_habitable: f64,
    pub adresse_brut: String,
    pub commune_brut: String,
    pub code_postal: String,
    /// `None` means "no coordinate", which is not the same as (0, 0).
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub annee_construction: String,
    pub type_batiment: String,
    pub type_chauffage: String,
}

impl DpeResult {
    /// Graded F or G.
    pub fn is_passoire(&self) -> bool {
        matches!(self.etiquette_dpe.as_str(), "F" | "G")
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Conso => self.conso_5_usages_m2_an,
            Metric::Ges => self.emission_ges_5_usages_m2_an,
            Metric::Ubat => self.ubat,
            Metric::Cout => self.cout_total_5_usages,
            Metric::Surface => self.surface_habitable,
        }
    }
}

/// `{ total, results }` as returned by one Fetch Client call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiPage {
    /// Total number of matching lines reported upstream (may exceed `results.len()`).
    pub total: u64,
    pub results: Vec<DpeResult>,
}

impl ApiPage {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Field naming convention of an upstream dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetSchema {
    /// Post-2021 datasets: address fields geocoded against the BAN
    /// (`nom_commune_ban`, `code_postal_ban`).
    Ban,
    /// Older datasets with raw address fields (`nom_commune`, `code_postal_brut`).
    Legacy,
}

impl DatasetSchema {
    /// Resolve the schema from a dataset id.
    pub fn for_dataset(dataset_id: &str) -> Self {
        if dataset_id.contains("dpe03existant") || dataset_id.contains("neufs") {
            DatasetSchema::Ban
        } else {
            DatasetSchema::Legacy
        }
    }

    pub fn town_field(self) -> &'static str {
        match self {
            DatasetSchema::Ban => "nom_commune_ban",
            DatasetSchema::Legacy => "nom_commune",
        }
    }

    pub fn postcode_field(self) -> &'static str {
        match self {
            DatasetSchema::Ban => "code_postal_ban",
            DatasetSchema::Legacy => "code_postal_brut",
        }
    }
}

/// Static dataset descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dataset {
    pub id: &'static str,
    pub name: &'static str,
}

impl Dataset {
    pub fn schema(&self) -> DatasetSchema {
        DatasetSchema::for_dataset(self.id)
    }
}

/// Year filter: either every record, or those established in one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearFilter {
    #[default]
    All,
    Year(u16),
}

impl YearFilter {
    /// Label used by the UI and in export filenames.
    pub const ALL_LABEL: &'static str = "Toutes";

    /// Keep `date` (an ISO-ish `YYYY-MM-DD` string) under this filter?
    pub fn matches(&self, date: &str) -> bool {
        match self {
            YearFilter::All => true,
            YearFilter::Year(_) if date.is_empty() => false,
            YearFilter::Year(year) => date.starts_with(&year.to_string()),
        }
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearFilter::All => f.write_str(Self::ALL_LABEL),
            YearFilter::Year(y) => write!(f, "{y}"),
        }
    }
}

impl FromStr for YearFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("toutes") || s.eq_ignore_ascii_case("all") {
            return Ok(YearFilter::All);
        }
        if s.len() == 4 && !s.starts_with('0') && s.chars().all(|c| c.is_ascii_digit()) {
            let year = s.parse::<u16>().map_err(|e| format!("invalid year '{s}': {e}"))?;
            return Ok(YearFilter::Year(year));
        }
        Err(format!("invalid year '{s}' (expected YYYY or '{}')", Self::ALL_LABEL))
    }
}

/// Numeric metric averaged by the aggregate statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Energy consumption (kWh/m²/an).
    #[default]
    Conso,
    /// Greenhouse-gas emissions (kg CO2/m²/an).
    Ges,
    /// Thermal-loss coefficient (W/m².K).
    Ubat,
    /// Estimated yearly cost (EUR).
    Cout,
    /// Living surface (m²).
    Surface,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Metric::Conso => "Conso moyenne",
            Metric::Ges => "GES moyen",
            Metric::Ubat => "Ubat moyen",
            Metric::Cout => "Coût moyen",
            Metric::Surface => "Surface moyenne",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Conso => "kWh/m²",
            Metric::Ges => "kg CO2/m²",
            Metric::Ubat => "W/m².K",
            Metric::Cout => "EUR",
            Metric::Surface => "m²",
        }
    }
}

/// Runtime settings shared by the CLI and the TUI.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub town: String,
    pub dataset_id: String,
    pub year: YearFilter,
    /// Page size requested from the API for a single-town fetch.
    pub fetch_size: usize,
    /// Rows per table page.
    pub page_size: usize,
    pub metric: Metric,
    /// Pause before each request of a bulk export.
    pub bulk_delay: Duration,
    /// Page size requested per town during a bulk export.
    pub bulk_page_size: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            town: crate::domain::catalog::TOWNS[0].to_string(),
            dataset_id: crate::domain::catalog::DATASETS[0].id.to_string(),
            year: YearFilter::All,
            fetch_size: 2000,
            page_size: 25,
            metric: Metric::Conso,
            bulk_delay: Duration::from_millis(150),
            bulk_page_size: 1000,
        }
    }
}
