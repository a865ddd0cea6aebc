use std::path::PathBuf;

/// Errors that can occur while computing pull-request coverage.
///
/// Library crates use this type directly; it implements
/// [`miette::Diagnostic`] so the binary can render it at the boundary.
/// A coverage lookup that finds no statement is not an error and never
/// shows up here.
///
/// # Examples
///
/// ```
/// use prcov_core::PrcovError;
///
/// let err = PrcovError::Transport("connection refused".into());
/// assert!(err.to_string().contains("connection refused"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum PrcovError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(prcov::io))]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(prcov::config))]
    Config(String),

    /// The diff source was unreachable, timed out, or answered with a non-2xx status.
    #[error("transport error: {0}")]
    #[diagnostic(
        code(prcov::transport),
        help("check --stash-api, the credentials, and that the pull request exists")
    )]
    Transport(String),

    /// A coverage report or unified diff is not well-formed.
    #[error("parse error: {0}")]
    #[diagnostic(code(prcov::parse))]
    Parse(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(
        code(prcov::serialization),
        help("the diff endpoint answered with something other than a pull-request diff")
    )]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(prcov::config))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(prcov::file_not_found))]
    FileNotFound(PathBuf),
}
