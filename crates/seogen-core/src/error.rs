use std::fmt;

use thiserror::Error;

/// Application-wide error types for seogen.
#[derive(Error, Debug)]
pub enum AppError {
    /// The batch request was rejected before any network activity.
    #[error("Invalid request: {0}")]
    ValidationError(String),

    /// Fetching a target page failed.
    #[error("Page load failed: {0}")]
    Fetch(#[from] FetchError),

    /// The page or a provider reply was unusable (too short, no JSON, ...).
    #[error("Content error: {0}")]
    ContentError(String),

    /// A non-heuristic provider was selected but no API key is available.
    #[error("No API key configured for {0}")]
    MissingCredential(String),

    /// A generation provider returned an error.
    #[error("{provider} API error{}: {message}", status_suffix(.status_code))]
    LlmError {
        provider: String,
        message: String,
        status_code: Option<u16>,
    },

    /// A provider request timed out.
    #[error("{provider} request timed out after {secs} seconds")]
    Timeout { provider: String, secs: u64 },

    /// Network/connection error talking to a provider.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The batch was cancelled between pages.
    #[error("Batch cancelled after {processed} of {total} pages")]
    Cancelled { processed: usize, total: usize },
}

fn status_suffix(status_code: &Option<u16>) -> String {
    status_code
        .map(|code| format!(" (HTTP {code})"))
        .unwrap_or_default()
}

/// Coarse error classes used for reporting and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Transport,
    Content,
    Provider,
    Persistence,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Content => "content",
            ErrorCategory::Provider => "provider",
            ErrorCategory::Persistence => "persistence",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppError {
    /// Returns the error class this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::ValidationError(_) => ErrorCategory::Validation,
            AppError::Fetch(_) => ErrorCategory::Transport,
            AppError::ContentError(_) => ErrorCategory::Content,
            AppError::MissingCredential(_)
            | AppError::LlmError { .. }
            | AppError::Timeout { .. }
            | AppError::NetworkError(_) => ErrorCategory::Provider,
            AppError::DatabaseError(_) => ErrorCategory::Persistence,
            AppError::ConfigError(_) | AppError::Cancelled { .. } => ErrorCategory::Internal,
        }
    }
}

/// Why a page could not be fetched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP {code}")]
    HttpStatus { code: u16 },

    #[error("timed out after {0} seconds - server responded too slowly")]
    Timeout(u64),

    #[error("{}", .kind.describe(.message))]
    Transport { kind: TransportKind, message: String },

    #[error("too many redirects (limit {0})")]
    TooManyRedirects(u32),
}

/// Classified sub-kind of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Dns,
    Refused,
    Timeout,
    Tls,
    Unknown,
}

impl TransportKind {
    /// Classify an error by matching its text against known substrings.
    ///
    /// Checked in order: dns, refused, timeout, tls.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&[
            "enotfound",
            "dns error",
            "failed to lookup address",
            "name or service not known",
            "nodename nor servname",
            "no such host",
            "name resolution",
        ]) {
            TransportKind::Dns
        } else if has(&["econnrefused", "connection refused", "actively refused"]) {
            TransportKind::Refused
        } else if has(&["etimedout", "timed out", "timeout", "aborted"]) {
            TransportKind::Timeout
        } else if has(&["cert", "ssl", "tls", "handshake"]) {
            TransportKind::Tls
        } else {
            TransportKind::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Dns => "dns",
            TransportKind::Refused => "refused",
            TransportKind::Timeout => "timeout",
            TransportKind::Tls => "tls",
            TransportKind::Unknown => "unknown",
        }
    }

    /// Human-readable message for this kind; unknown failures keep the raw text.
    pub fn describe(&self, message: &str) -> String {
        match self {
            TransportKind::Dns => "DNS lookup failed - domain not found".to_string(),
            TransportKind::Refused => "connection refused - server not responding".to_string(),
            TransportKind::Timeout => "timed out - server responded too slowly".to_string(),
            TransportKind::Tls => "SSL certificate error".to_string(),
            TransportKind::Unknown => message.to_string(),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FetchError {
    /// Build a transport error, classifying the message.
    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        FetchError::Transport {
            kind: TransportKind::classify(&message),
            message,
        }
    }
}
