//! Input/output helpers.
//!
//! - CSV export of normalized records (`export`)

pub mod export;

pub use export::*;
