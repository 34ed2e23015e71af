//! Error types for feed operations.
//!
//! [`FeedError`] covers the whole-run failures around the pipeline: fetching
//! the feed, parsing it, and forwarding the result to the export endpoint.
//! Per-record problems never surface here; they are reported as diagnostics
//! by the pipeline (see [`crate::extract::ExtractionError`] and
//! [`crate::validate::ValidationError`]).

use std::fmt;
use thiserror::Error;

/// The category of a feed error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedErrorCode {
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Remote server returned an error (5xx status codes).
    ServerError,
    /// Remote server rejected the request (4xx status codes).
    Rejected,
    /// Unexpected response body or status.
    InvalidResponse,
    /// The feed text is not a valid iCalendar document.
    ParseError,
    /// Missing or invalid configuration.
    ConfigurationError,
    /// The export endpoint reported errors for the batch.
    ExportFailed,
    /// Reading or writing a local file failed.
    IoError,
}

impl FeedErrorCode {
    /// Returns true if a later run might succeed without any change on our side.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkError | Self::ServerError)
    }

    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::ServerError => "server_error",
            Self::Rejected => "rejected",
            Self::InvalidResponse => "invalid_response",
            Self::ParseError => "parse_error",
            Self::ConfigurationError => "configuration_error",
            Self::ExportFailed => "export_failed",
            Self::IoError => "io_error",
        }
    }
}

impl fmt::Display for FeedErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that aborts a feed operation.
#[derive(Debug, Error)]
pub struct FeedError {
    /// The error code categorizing this error.
    code: FeedErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FeedError {
    /// Creates a new feed error with the given code and message.
    pub fn new(code: FeedErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::NetworkError, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::ServerError, message)
    }

    /// Creates a rejected-request error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::Rejected, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::InvalidResponse, message)
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::ParseError, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::ConfigurationError, message)
    }

    /// Creates an export error.
    pub fn export(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::ExportFailed, message)
    }

    /// Creates an I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(FeedErrorCode::IoError, message)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> FeedErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if a later run might succeed.
    pub fn is_transient(&self) -> bool {
        self.code.is_transient()
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<std::io::Error> for FeedError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string()).with_source(err)
    }
}

/// A specialized Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;
