//! Client error types.

use std::path::PathBuf;

use calimport_feed::FeedError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that abort a client command.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Fetching, parsing or exporting the feed failed.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// Reading or writing a local file failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An artifact could not be serialized.
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The run stopped before any record was processed.
    #[error("import aborted: {0}")]
    Aborted(String),
}

impl ClientError {
    /// Wraps an IO error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_path() {
        let err = ClientError::io(
            "/tmp/feed.ics",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.to_string(), "IO error on /tmp/feed.ics: no such file");
    }

    #[test]
    fn feed_error_converts() {
        let err: ClientError = FeedError::parse("not a calendar").into();
        assert!(matches!(err, ClientError::Feed(_)));
        assert_eq!(err.to_string(), "feed error: parse_error: not a calendar");
    }
}
