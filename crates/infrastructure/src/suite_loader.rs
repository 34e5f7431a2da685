//! Test suite file loading.
//!
//! Suites are JSON (`.json`) or YAML (`.yaml`, `.yml`) documents that
//! deserialize into [`TestSuite`].

use std::path::{Path, PathBuf};

use tracing::debug;

use apiprobe_domain::TestSuite;

/// Supported suite file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteFormat {
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

impl SuiteFormat {
    /// Detects the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Error type for suite loading.
#[derive(Debug, thiserror::Error)]
pub enum SuiteLoadError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The extension is not one of json, yaml or yml.
    #[error("unsupported suite format: {0}")]
    UnsupportedFormat(PathBuf),

    /// JSON parse failure.
    #[error("invalid JSON suite: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse failure.
    #[error("invalid YAML suite: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Parses a suite from JSON text.
///
/// # Errors
///
/// Returns an error if the document does not describe a suite.
pub fn parse_json_suite(content: &str) -> Result<TestSuite, SuiteLoadError> {
    Ok(serde_json::from_str(content)?)
}

/// Parses a suite from YAML text.
///
/// # Errors
///
/// Returns an error if the document does not describe a suite.
pub fn parse_yaml_suite(content: &str) -> Result<TestSuite, SuiteLoadError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Reads and parses a suite file, picking the parser by extension.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has an unknown extension
/// or fails to parse.
pub async fn load_suite(path: &Path) -> Result<TestSuite, SuiteLoadError> {
    let format = SuiteFormat::from_path(path)
        .ok_or_else(|| SuiteLoadError::UnsupportedFormat(path.to_path_buf()))?;

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SuiteLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let suite = match format {
        SuiteFormat::Json => parse_json_suite(&content)?,
        SuiteFormat::Yaml => parse_yaml_suite(&content)?,
    };
    debug!(path = %path.display(), suite = %suite.name, cases = suite.len(), "Suite loaded");
    Ok(suite)
}
