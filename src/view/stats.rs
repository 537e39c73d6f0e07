//! Derived views over a record set: year filter, aggregate statistics,
//! grade distribution, pagination.
//!
//! All of these are recomputed from scratch on every change; record sets are
//! a few thousand lines at most.

use std::borrow::Borrow;

use serde::Serialize;

use crate::domain::{DpeResult, Metric, YearFilter};

pub const GRADES: [char; 7] = ['A', 'B', 'C', 'D', 'E', 'F', 'G'];

/// Records established in the selected year (all records for `YearFilter::All`).
pub fn filter_by_year<'a>(records: &'a [DpeResult], year: &YearFilter) -> Vec<&'a DpeResult> {
    records
        .iter()
        .filter(|r| year.matches(&r.date_etablissement_dpe))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AggregateStats {
    pub metric: Metric,
    /// Mean of `metric` over records where it is > 0; 0 when there are none.
    pub average: f64,
    /// Records graded F or G.
    pub passoires: usize,
    /// `passoires` as a percentage of `count`; 0 for an empty set.
    pub passoires_pct: f64,
    pub count: usize,
}

pub fn compute_stats<R: Borrow<DpeResult>>(records: &[R], metric: Metric) -> AggregateStats {
    let (sum, n) = records
        .iter()
        .map(|r| r.borrow().metric(metric))
        .filter(|v| *v > 0.0)
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));

    let average = if n > 0 { sum / n as f64 } else { 0.0 };
    let passoires = records.iter().filter(|r| (*r).borrow().is_passoire()).count();
    let passoires_pct = if records.is_empty() {
        0.0
    } else {
        passoires as f64 / records.len() as f64 * 100.0
    };

    AggregateStats {
        metric,
        average,
        passoires,
        passoires_pct,
        count: records.len(),
    }
}

/// Count of records per grade, A through G. Records outside A–G are not counted.
pub fn grade_distribution<R: Borrow<DpeResult>>(records: &[R]) -> [(char, usize); 7] {
    let mut counts = GRADES.map(|g| (g, 0usize));
    for r in records {
        let label = &r.borrow().etiquette_dpe;
        if let Some(slot) = counts.iter_mut().find(|(g, _)| label.len() == 1 && label.starts_with(*g)) {
            slot.1 += 1;
        }
    }
    counts
}

/// One page of a slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based, clamped into `1..=page_count`.
    pub number: usize,
    /// At least 1, even for an empty slice.
    pub page_count: usize,
    pub total: usize,
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    total.div_ceil(page_size).max(1)
}

pub fn paginate<T>(items: &[T], page_size: usize, page: usize) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let page_count = page_count(items.len(), page_size);
    let number = page.clamp(1, page_count);
    let start = ((number - 1) * page_size).min(items.len());
    let end = (start + page_size).min(items.len());

    Page {
        items: &items[start..end],
        number,
        page_count,
        total: items.len(),
    }
}
