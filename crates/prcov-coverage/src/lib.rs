//! Coverage of the lines a pull request adds.
//!
//! Parses a Clover statement-coverage report, correlates it with the added
//! lines of a diff, and aggregates the outcome per file and overall:
//! - [`clover`] — report parsing and `(path, line)` index
//! - [`correlate`] — added-line to statement matching
//! - [`result`] — percentages and uncovered-line queries
//! - [`render`] — text and Markdown output

pub mod clover;
pub mod correlate;
pub mod render;
pub mod result;

pub use correlate::{build_coverage_result, build_coverage_result_from_xml, correlate, FileCoverage};
pub use result::CoverageResult;
