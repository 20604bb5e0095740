//! Error types for pkgstamp operations

use serde::Serialize;
use std::path::PathBuf;

/// Structured error payload printed by the CLI in `--json` mode.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub hint: String,
}

impl ErrorEnvelope {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            hint: hint.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StampError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Not a git repository: {}: {source}", .path.display())]
    RepositoryNotFound {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Error getting remotes: {0}")]
    RemoteEnumeration(String),

    #[error("Cannot parse remote URL '{url}': {reason}")]
    UrlParse { url: String, reason: String },

    #[error("Repository at {} has no commits (HEAD is unborn)", .0.display())]
    NoCommits(PathBuf),

    #[error("Commit id '{0}' is shorter than 7 characters")]
    ShortSha(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Timestamp format error: {0}")]
    TimeFormat(#[from] time::error::Format),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StampError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::ConfigParse(_) => "config_parse_error",
            Self::RepositoryNotFound { .. } => "repository_not_found",
            Self::RemoteEnumeration(_) => "remote_enumeration_error",
            Self::UrlParse { .. } => "url_parse_error",
            Self::NoCommits(_) => "no_commits",
            Self::ShortSha(_) => "short_sha_error",
            Self::Git(_) => "git_error",
            Self::TimeFormat(_) => "time_format_error",
            Self::Serialization(_) => "serialization_error",
            Self::Io(_) => "io_error",
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "Run 'pkgstamp --help' for usage",
            Self::ConfigParse(_) => "Check the [manifest] section of the config file",
            Self::RepositoryNotFound { .. } => "Pass the repository root with --path",
            Self::RemoteEnumeration(_) | Self::UrlParse { .. } => {
                "Check the configured remotes with 'git remote -v'"
            }
            Self::NoCommits(_) => "Create at least one commit before stamping",
            _ => "",
        }
    }

    /// Convert into the envelope printed in `--json` mode.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(self.code(), self.to_string(), self.hint())
    }
}
