//! Dashboard view state.
//!
//! The state is a plain value updated by `update(state, event) -> state`.
//! Selecting a town or dataset starts a new fetch: the request token is
//! bumped, the old records are dropped, and the status goes to `Loading`.
//! A fetch result is applied only if it carries the current token, so a slow
//! response for an earlier selection can never overwrite a newer one.

pub mod stats;

use crate::data::DpeQuery;
use crate::domain::{ApiPage, DashboardConfig, DpeResult, Metric, YearFilter};

pub use stats::{AggregateStats, GRADES, Page, compute_stats, filter_by_year, grade_distribution, paginate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Identifies one fetch; strictly increasing over the life of a `ViewState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct RequestToken(pub u64);

#[derive(Debug, Clone)]
pub enum ViewEvent {
    SelectTown(String),
    SelectDataset(String),
    SelectYear(YearFilter),
    /// Refetch the current selection.
    Refresh,
    FetchSucceeded { token: RequestToken, page: ApiPage },
    FetchFailed { token: RequestToken, message: String },
    NextPage,
    PrevPage,
    GoToPage(usize),
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub town: String,
    pub dataset_id: String,
    pub year: YearFilter,
    pub metric: Metric,
    pub status: FetchStatus,
    /// Records of the last settled fetch (empty while loading).
    pub records: Vec<DpeResult>,
    /// Upstream total reported by the last settled fetch.
    pub total: u64,
    pub error: Option<String>,
    /// 1-based page into the filtered set.
    pub page: usize,
    pub page_size: usize,
    pub fetch_size: usize,
    token: RequestToken,
}

impl ViewState {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            town: config.town.clone(),
            dataset_id: config.dataset_id.clone(),
            year: config.year,
            metric: config.metric,
            status: FetchStatus::Idle,
            records: Vec::new(),
            total: 0,
            error: None,
            page: 1,
            page_size: config.page_size.max(1),
            fetch_size: config.fetch_size,
            token: RequestToken::default(),
        }
    }

    /// Token of the most recently started fetch.
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// Query for the current selection.
    pub fn query(&self) -> DpeQuery {
        DpeQuery::new(self.town.clone(), self.dataset_id.clone(), self.fetch_size)
    }

    pub fn filtered(&self) -> Vec<&DpeResult> {
        filter_by_year(&self.records, &self.year)
    }

    pub fn stats(&self) -> AggregateStats {
        compute_stats(&self.filtered(), self.metric)
    }

    pub fn page_count(&self) -> usize {
        stats::page_count(self.filtered().len(), self.page_size)
    }

    /// Current page of the filtered set.
    pub fn current_page(&self) -> Vec<&DpeResult> {
        let filtered = self.filtered();
        paginate(&filtered, self.page_size, self.page).items.to_vec()
    }

    fn begin_fetch(mut self) -> Self {
        self.token = RequestToken(self.token.0 + 1);
        self.status = FetchStatus::Loading;
        self.records.clear();
        self.total = 0;
        self.error = None;
        self.page = 1;
        self
    }
}

/// Apply one event.
pub fn update(mut state: ViewState, event: ViewEvent) -> ViewState {
    match event {
        ViewEvent::SelectTown(town) => {
            if town == state.town && state.status != FetchStatus::Idle {
                return state;
            }
            state.town = town;
            state.begin_fetch()
        }
        ViewEvent::SelectDataset(dataset_id) => {
            if dataset_id == state.dataset_id && state.status != FetchStatus::Idle {
                return state;
            }
            state.dataset_id = dataset_id;
            state.begin_fetch()
        }
        ViewEvent::Refresh => state.begin_fetch(),
        ViewEvent::SelectYear(year) => {
            state.year = year;
            state.page = 1;
            state
        }
        ViewEvent::FetchSucceeded { token, page } => {
            if token != state.token {
                return state;
            }
            state.records = page.results;
            state.total = page.total;
            state.status = FetchStatus::Success;
            state.error = None;
            state.page = 1;
            state
        }
        ViewEvent::FetchFailed { token, message } => {
            if token != state.token {
                return state;
            }
            state.records.clear();
            state.total = 0;
            state.status = FetchStatus::Error;
            state.error = Some(message);
            state
        }
        ViewEvent::NextPage => {
            state.page = (state.page + 1).min(state.page_count());
            state
        }
        ViewEvent::PrevPage => {
            state.page = state.page.saturating_sub(1).max(1);
            state
        }
        ViewEvent::GoToPage(page) => {
            state.page = page.clamp(1, state.page_count());
            state
        }
    }
}
