//! SLA-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SlaError>;

/// Top-level error type for the SLA dashboard.
#[derive(Debug, Error)]
pub enum SlaError {
    #[error("[SLA-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SLA-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SLA-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SLA-2001] data source failure in {operation}: {details}")]
    Source {
        operation: &'static str,
        details: String,
    },

    #[error("[SLA-2002] malformed record: {details}")]
    MalformedRecord { details: String },

    #[error("[SLA-2003] malformed column specification: {details}")]
    ColumnSpec { details: String },

    #[error("[SLA-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SLA-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SLA-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl SlaError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SLA-1001",
            Self::MissingConfig { .. } => "SLA-1002",
            Self::ConfigParse { .. } => "SLA-1003",
            Self::Source { .. } => "SLA-2001",
            Self::MalformedRecord { .. } => "SLA-2002",
            Self::ColumnSpec { .. } => "SLA-2003",
            Self::Serialization { .. } => "SLA-2101",
            Self::Io { .. } => "SLA-3002",
            Self::Runtime { .. } => "SLA-3900",
        }
    }

    /// Whether retrying (next poll cycle or next page request) might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Source { .. } | Self::Io { .. } | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for remote data source failures.
    #[must_use]
    pub fn source(operation: &'static str, details: impl Into<String>) -> Self {
        Self::Source {
            operation,
            details: details.into(),
        }
    }

    /// Message suitable for a user-facing notification: the details without the code prefix.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidConfig { details }
            | Self::MalformedRecord { details }
            | Self::ColumnSpec { details }
            | Self::Runtime { details }
            | Self::Source { details, .. }
            | Self::ConfigParse { details, .. }
            | Self::Serialization { details, .. } => details.clone(),
            Self::MissingConfig { path } => format!("missing {}", path.display()),
            Self::Io { path, source } => format!("{}: {source}", path.display()),
        }
    }
}

impl From<serde_json::Error> for SlaError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SlaError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
