//! Error types shared by the invoker and the release client.
//!
//! Failure text coming back from `spicetify` or GitHub is classified once, here,
//! into a [`FailureKind`] so callers match on an enum instead of re-scanning strings.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a failed external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Unauthorized,
    RateLimited,
    Timeout,
    Unknown,
}

impl FailureKind {
    /// Scans captured output for the known failure markers.
    pub fn classify(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("401")
            || lower.contains("unauthorized")
            || lower.contains("bad credentials")
        {
            FailureKind::Unauthorized
        } else if lower.contains("rate limit") || lower.contains("403") {
            FailureKind::RateLimited
        } else if lower.contains("timed out") || lower.contains("timeout") {
            FailureKind::Timeout
        } else {
            FailureKind::Unknown
        }
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            401 => FailureKind::Unauthorized,
            403 | 429 => FailureKind::RateLimited,
            408 | 504 => FailureKind::Timeout,
            _ => FailureKind::Unknown,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::RateLimited => "rate limited",
            FailureKind::Timeout => "timed out",
            FailureKind::Unknown => "unknown failure",
        };
        f.write_str(label)
    }
}

/// The process could not be started at all.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("'{program}' was not found on PATH or in {install_dir}")]
    NotFound { program: String, install_dir: PathBuf },

    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the GitHub release API, downloads and archive extraction.
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("GitHub rejected the token (401 Unauthorized)")]
    Unauthorized,

    #[error("GitHub API rate limit reached (403)")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,

    #[error("GitHub returned HTTP {0}")]
    Status(u16),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Failed to parse release JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No release asset matches {os}/{arch}")]
    NoAsset { os: String, arch: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(String),
}

impl ReleaseError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ReleaseError::Unauthorized => FailureKind::Unauthorized,
            ReleaseError::RateLimited => FailureKind::RateLimited,
            ReleaseError::Timeout => FailureKind::Timeout,
            ReleaseError::Status(code) => FailureKind::from_status(*code),
            _ => FailureKind::Unknown,
        }
    }
}

impl From<reqwest::Error> for ReleaseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ReleaseError::Timeout
        } else {
            ReleaseError::Network(err)
        }
    }
}

impl From<zip::result::ZipError> for ReleaseError {
    fn from(err: zip::result::ZipError) -> Self {
        ReleaseError::Archive(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_markers() {
        assert_eq!(FailureKind::classify("HTTP 401: Bad credentials"), FailureKind::Unauthorized);
        assert_eq!(
            FailureKind::classify("warning API rate limit exceeded for 1.2.3.4"),
            FailureKind::RateLimited
        );
        assert_eq!(FailureKind::classify("operation timed out"), FailureKind::Timeout);
        assert_eq!(FailureKind::classify("cannot find Spotify"), FailureKind::Unknown);
    }

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(FailureKind::from_status(401), FailureKind::Unauthorized);
        assert_eq!(FailureKind::from_status(403), FailureKind::RateLimited);
        assert_eq!(FailureKind::from_status(500), FailureKind::Unknown);
        assert_eq!(ReleaseError::Status(429).kind(), FailureKind::RateLimited);
    }
}
