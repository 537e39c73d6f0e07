//! Formatted terminal output for the CLI subcommands.
//!
//! Kept apart from the view logic so output changes stay localized.

use chrono::NaiveDate;

use crate::domain::{ADDRESS_PLACEHOLDER, DpeResult, NOT_AVAILABLE, YearFilter};
use crate::view::{AggregateStats, Page};

/// `YYYY-MM-DD...` rendered as `DD/MM/YYYY`; anything unparsable is shown as-is.
pub fn format_date_fr(raw: &str) -> String {
    if raw.is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    let head = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(head, "%Y-%m-%d") {
        Ok(d) => d.format("%d/%m/%Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

pub struct SummaryHeader<'a> {
    pub town: &'a str,
    pub dataset: &'a str,
    pub year: YearFilter,
    pub upstream_total: u64,
    pub received: usize,
}

/// Selection, counts and aggregate statistics.
pub fn format_summary(header: &SummaryHeader<'_>, stats: &AggregateStats) -> String {
    let mut out = String::new();

    out.push_str("=== DPE Hub ===\n");
    out.push_str(&format!("Commune: {}\n", header.town));
    out.push_str(&format!("Base: {}\n", header.dataset));
    out.push_str(&format!("Année: {}\n", header.year));
    out.push_str(&format!(
        "Dossiers: {} filtrés / {} reçus / {} au total\n",
        stats.count, header.received, header.upstream_total
    ));
    out.push_str(&format!(
        "{}: {:.0} {}\n",
        stats.metric.label(),
        stats.average.round(),
        stats.metric.unit()
    ));
    out.push_str(&format!("Passoires F/G: {}\n", stats.passoires));
    out.push_str(&format!("Incidence thermique: {:.0}%\n", stats.passoires_pct.round()));

    out
}

/// Horizontal bar per grade, scaled to `width` characters for the largest count.
pub fn format_distribution(dist: &[(char, usize)], width: usize) -> String {
    let max = dist.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let mut out = String::from("Répartition des étiquettes DPE\n");
    for (grade, n) in dist {
        let len = if max == 0 { 0 } else { n * width / max };
        out.push_str(&format!("{grade} | {:<width$} {n}\n", "#".repeat(len)));
    }
    out
}

/// One table page: address, postcode + town, date, grade, surface.
pub fn format_page(page: &Page<'_, &DpeResult>) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{:<42} {:<28} {:<10} {:^3} {:>8}\n",
        "Adresse", "Commune", "Date", "DPE", "Surface"
    ));
    out.push_str(&format!("{}\n", "-".repeat(95)));

    if page.items.is_empty() {
        out.push_str("Aucun résultat trouvé pour cette sélection.\n");
        return out;
    }

    for r in page.items {
        let address = if r.adresse_brut.is_empty() {
            ADDRESS_PLACEHOLDER
        } else {
            r.adresse_brut.as_str()
        };
        out.push_str(&format!(
            "{:<42} {:<28} {:<10} {:^3} {:>6} m²\n",
            clip(address, 42),
            clip(&format!("{} {}", r.code_postal, r.commune_brut), 28),
            format_date_fr(&r.date_etablissement_dpe),
            r.etiquette_dpe,
            r.surface_habitable,
        ));
    }

    out.push_str(&format!(
        "Page {}/{} ({} dossiers)\n",
        page.number, page.page_count, page.total
    ));
    out
}

/// Truncate to `max` characters, marking the cut with `…`.
pub fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
