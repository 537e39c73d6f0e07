//! CSV export of normalized records.
//!
//! The layout targets spreadsheets with a French locale:
//! - `;` separator
//! - every value quoted, inner quotes doubled, line breaks collapsed to a space
//! - CRLF row terminator
//! - UTF-8 with a byte-order mark

use std::borrow::Borrow;
use std::fs;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::{info, warn};

use crate::domain::DpeResult;
use crate::error::ExportError;

pub const CSV_HEADERS: [&str; 12] = [
    "ID_DPE",
    "Date_Etablissement",
    "Commune",
    "Code_Postal",
    "Adresse",
    "Etiquette_DPE",
    "Etiquette_GES",
    "Consommation_kWh_m2",
    "GES_kg_m2",
    "Surface_m2",
    "Annee_Construction",
    "Estimation_Cout_EUR",
];

const BOM: &str = "\u{feff}";

/// Append `.csv` unless `name` already ends with it.
pub fn csv_file_name(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(".csv") {
        name.to_string()
    } else {
        format!("{name}.csv")
    }
}

/// Render `records` to CSV bytes (BOM included).
pub fn render_csv<R: Borrow<DpeResult>>(records: &[R]) -> Result<Vec<u8>, ExportError> {
    if records.is_empty() {
        return Err(ExportError::Empty);
    }

    let io_err = |source: std::io::Error| ExportError::Io {
        path: "<memory>".to_string(),
        source,
    };

    let mut buf = BOM.as_bytes().to_vec();
    {
        let mut w = WriterBuilder::new()
            .delimiter(b';')
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::CRLF)
            .from_writer(&mut buf);

        w.write_record(CSV_HEADERS).map_err(|e| io_err(e.into()))?;
        for r in records {
            w.write_record(row(r.borrow())).map_err(|e| io_err(e.into()))?;
        }
        w.flush().map_err(io_err)?;
    }

    Ok(buf)
}

/// Write `records` to `dir/filename` (`.csv` appended if missing).
///
/// An empty record list is refused with `ExportError::Empty` and no file is
/// created.
pub fn write_dpe_csv<R: Borrow<DpeResult>>(
    dir: &Path,
    filename: &str,
    records: &[R],
) -> Result<PathBuf, ExportError> {
    let path = dir.join(csv_file_name(filename));

    let bytes = match render_csv(records) {
        Ok(bytes) => bytes,
        Err(ExportError::Empty) => {
            warn!(file = %path.display(), "nothing to export");
            return Err(ExportError::Empty);
        }
        Err(err) => return Err(err),
    };

    fs::write(&path, bytes).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;

    info!(file = %path.display(), rows = records.len(), "wrote CSV export");
    Ok(path)
}

fn row(r: &DpeResult) -> [String; 12] {
    [
        cell(&r.n_dpe),
        cell(&r.date_etablissement_dpe),
        cell(&r.commune_brut),
        cell(&r.code_postal),
        cell(&r.adresse_brut),
        cell(&r.etiquette_dpe),
        cell(&r.etiquette_ges),
        r.conso_5_usages_m2_an.to_string(),
        r.emission_ges_5_usages_m2_an.to_string(),
        r.surface_habitable.to_string(),
        cell(&r.annee_construction),
        r.cout_total_5_usages.to_string(),
    ]
}

/// Collapse each run of CR/LF into a single space.
fn cell(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_break = false;
    for c in value.chars() {
        if c == '\n' || c == '\r' {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            out.push(c);
            in_break = false;
        }
    }
    out
}
