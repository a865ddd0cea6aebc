//! Pull-request diff model and added-line extraction.
//!
//! Deserializes the structural diff served by Bitbucket Server, reduces it
//! to the set of added line numbers per destination file, and can build the
//! same structure from plain `git diff` output for offline runs.

pub mod filter;
pub mod index;
pub mod model;
pub mod parser;
