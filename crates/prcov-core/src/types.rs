use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the coverage report is written to stdout.
///
/// Parses case-insensitively from the `--format` flag, with `md` accepted
/// for Markdown.
///
/// ```
/// use prcov_core::OutputFormat;
///
/// assert_eq!("MD".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
/// assert!("xml".parse::<OutputFormat>().unwrap_err().contains("text, json, markdown"));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `Total Coverage Pct:` line plus tab-indented per-file lines.
    #[default]
    Text,
    /// `CoverageSummary` as pretty-printed JSON.
    Json,
    /// Table for a pull-request comment.
    Markdown,
}

impl OutputFormat {
    /// Every format, in the order `--help` lists them.
    pub const ALL: [OutputFormat; 3] = [
        OutputFormat::Text,
        OutputFormat::Json,
        OutputFormat::Markdown,
    ];

    /// Name accepted on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "markdown",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted == "md" {
            return Ok(OutputFormat::Markdown);
        }
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == wanted)
            .ok_or_else(|| format!("unknown output format '{s}' (expected text, json, markdown)"))
    }
}
