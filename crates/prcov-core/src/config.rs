use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PrcovError;

/// Top-level configuration loaded from `.prcov.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use prcov_core::PrcovConfig;
///
/// let config = PrcovConfig::default();
/// assert_eq!(config.stash.timeout_secs, 20);
/// assert_eq!(config.coverage.statement_type, "stmt");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrcovConfig {
    /// Diff source (Bitbucket Server) request settings.
    #[serde(default)]
    pub stash: StashConfig,
    /// Clover report interpretation.
    #[serde(default)]
    pub coverage: CoverageConfig,
    /// Report shaping and gating.
    #[serde(default)]
    pub report: ReportConfig,
}

impl PrcovConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PrcovError::FileNotFound`] if `path` does not exist,
    /// [`PrcovError::Io`] if the file cannot be read, or
    /// [`PrcovError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use prcov_core::PrcovConfig;
    /// use std::path::Path;
    ///
    /// let config = PrcovConfig::from_file(Path::new(".prcov.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, PrcovError> {
        if !path.exists() {
            return Err(PrcovError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`PrcovError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use prcov_core::PrcovConfig;
    ///
    /// let toml = r#"
    /// [stash]
    /// timeout_secs = 5
    /// "#;
    /// let config = PrcovConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.stash.timeout_secs, 5);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, PrcovError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Request settings for the pull-request diff endpoint.
///
/// # Examples
///
/// ```
/// use prcov_core::StashConfig;
///
/// let config = StashConfig::default();
/// assert_eq!(config.context_lines, 0);
/// assert_eq!(config.whitespace, "ignore-all");
/// assert!(!config.with_comments);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StashConfig {
    /// Upper bound on the whole diff request, in seconds (default: 20).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Context lines requested around each change (default: 0).
    #[serde(default)]
    pub context_lines: u32,
    /// Whitespace mode passed to the diff endpoint (default: `"ignore-all"`).
    #[serde(default = "default_whitespace")]
    pub whitespace: String,
    /// Ask the server to inline review comments (default: false).
    #[serde(default)]
    pub with_comments: bool,
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_whitespace() -> String {
    "ignore-all".into()
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            context_lines: 0,
            whitespace: default_whitespace(),
            with_comments: false,
        }
    }
}

/// How Clover line records are interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// Value of the `type` attribute that marks an executable statement (default: `"stmt"`).
    #[serde(default = "default_statement_type")]
    pub statement_type: String,
}

fn default_statement_type() -> String {
    "stmt".into()
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            statement_type: default_statement_type(),
        }
    }
}

/// Report shaping and CI gating.
///
/// # Examples
///
/// ```
/// use prcov_core::ReportConfig;
///
/// let config = ReportConfig::default();
/// assert!(config.exclude.is_empty());
/// assert!(config.fail_under.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Glob patterns of diff paths left out of the correlation entirely.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Minimum total coverage percentage; below it the run fails.
    pub fail_under: Option<f64>,
}
