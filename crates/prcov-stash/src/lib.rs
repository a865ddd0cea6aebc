//! Bitbucket Server ("Stash") client for pull-request diffs.
//!
//! Fetches the structural diff of a pull request over HTTPS with basic
//! credentials and a bounded timeout. A transport failure is reported as
//! [`prcov_core::PrcovError::Transport`], separate from any later
//! correlation error.

pub mod client;

pub use client::StashClient;
