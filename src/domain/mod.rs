//! Domain types used throughout the dashboard.
//!
//! This module defines:
//!
//! - the canonical record (`DpeResult`) and fetch result (`ApiPage`)
//! - dataset descriptors and their field-naming schema
//! - view parameters (`YearFilter`, `Metric`, `DashboardConfig`)
//! - static configuration tables (`catalog`)

pub mod catalog;
pub mod types;

pub use types::*;
