//! Core types, configuration, and error handling for prcov.
//!
//! This crate provides the shared foundation used by the other prcov crates:
//! - [`PrcovError`] — unified error type using `thiserror`
//! - [`PrcovConfig`] — configuration loaded from `.prcov.toml`
//! - Shared types: [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{CoverageConfig, PrcovConfig, ReportConfig, StashConfig};
pub use error::PrcovError;
pub use types::OutputFormat;
