//! Sequential multi-town export.
//!
//! Towns are fetched one at a time, with a pause before each request to stay
//! polite with the upstream service. A failed town is logged and skipped.

use std::time::Duration;

use tracing::{info, warn};

use crate::data::ademe::{DpeQuery, DpeSource};
use crate::domain::DpeResult;

#[derive(Debug, Clone, Copy)]
pub struct BulkExporter {
    /// Pause before each request.
    pub delay: Duration,
    /// `size` requested per town.
    pub page_size: usize,
}

impl Default for BulkExporter {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(150),
            page_size: 1000,
        }
    }
}

/// Outcome of a bulk run.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    /// Records of every successful town, in town-list order.
    pub records: Vec<DpeResult>,
    /// Towns whose fetch failed.
    pub failed: Vec<String>,
}

impl BulkExporter {
    /// Fetch every town in order and collect the results.
    ///
    /// `on_progress(completed, total)` is called once per town, after that
    /// town was attempted, with `completed` counting from 1.
    pub fn run<S, F>(&self, source: &S, towns: &[&str], dataset_id: &str, mut on_progress: F) -> BulkReport
    where
        S: DpeSource + ?Sized,
        F: FnMut(usize, usize),
    {
        let total = towns.len();
        let mut report = BulkReport::default();

        for (idx, town) in towns.iter().enumerate() {
            if !self.delay.is_zero() {
                std::thread::sleep(self.delay);
            }

            let query = DpeQuery::new(*town, dataset_id, self.page_size);
            match source.fetch(&query) {
                Ok(page) => report.records.extend(page.results),
                Err(err) => {
                    warn!(town = %town, error = %err, "skipping town in bulk export");
                    report.failed.push(town.to_string());
                }
            }

            on_progress(idx + 1, total);
        }

        info!(
            towns = total,
            failed = report.failed.len(),
            records = report.records.len(),
            "bulk export finished"
        );
        report
    }
}
