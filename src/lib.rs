//! `dpe-hub` library crate.
//!
//! The binary (`dpe`) is a thin wrapper around this library so that:
//!
//! - fetching, normalization and view logic are testable without a terminal
//! - the CLI subcommands and the TUI share one pipeline

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod tui;
pub mod view;
