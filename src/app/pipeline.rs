//! Shared "fetch a selection" logic used by both CLI and TUI front-ends.
//!
//! The workflow is the same everywhere: start a fetch through the view
//! reducer, run the query, feed the outcome back as an event. The CLI and the
//! TUI only differ in where the query runs (inline vs. worker thread).

use crate::data::{BulkExporter, BulkReport, DpeQuery, DpeSource, fetch_or_empty};
use crate::domain::DashboardConfig;
use crate::view::{RequestToken, ViewEvent, ViewState, update};

/// Run `query` against `source` and turn the outcome into the settling
/// event for `token`.
pub fn settle<S: DpeSource + ?Sized>(source: &S, query: &DpeQuery, token: RequestToken) -> ViewEvent {
    match source.fetch(query) {
        Ok(page) => ViewEvent::FetchSucceeded { token, page },
        Err(err) => ViewEvent::FetchFailed {
            token,
            message: err.to_string(),
        },
    }
}

/// Build a view for `config` and load it synchronously.
pub fn load_view<S: DpeSource + ?Sized>(source: &S, config: &DashboardConfig) -> ViewState {
    let state = update(ViewState::new(config), ViewEvent::Refresh);
    let token = state.token();
    let event = settle(source, &state.query(), token);
    update(state, event)
}

/// Like `load_view`, but an upstream failure settles as an empty success.
pub fn load_view_or_empty<S: DpeSource + ?Sized>(source: &S, config: &DashboardConfig) -> ViewState {
    let state = update(ViewState::new(config), ViewEvent::Refresh);
    let token = state.token();
    let page = fetch_or_empty(source, &state.query());
    update(state, ViewEvent::FetchSucceeded { token, page })
}

/// Bulk export over `towns` with the delay and page size from `config`.
pub fn run_bulk<S, F>(source: &S, config: &DashboardConfig, towns: &[&str], on_progress: F) -> BulkReport
where
    S: DpeSource + ?Sized,
    F: FnMut(usize, usize),
{
    let exporter = BulkExporter {
        delay: config.bulk_delay,
        page_size: config.bulk_page_size,
    };
    exporter.run(source, towns, &config.dataset_id, on_progress)
}
