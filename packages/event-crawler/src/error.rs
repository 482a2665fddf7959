//! Typed errors for the crawler library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on failure kinds. The binary wraps these with `anyhow` context.

use thiserror::Error;

/// Errors that can stop a crawl run.
///
/// Per-page problems (malformed listing bodies, missing JSON-LD, transport
/// failures on a single fetch) are handled inline and never surface here;
/// only collaborator failures that make continuing pointless do.
#[derive(Debug, Error)]
pub enum CrawlerError {
    /// Fetch layer failed in a way the run cannot recover from
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Queue storage failed
    #[error("queue storage error: {0}")]
    Queue(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Output sink failed
    #[error("sink error: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid URL in configuration or queue entry
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Run configuration is unusable (e.g. date window computation failed)
    #[error("config error: {reason}")]
    Config { reason: String },

    /// JSON serialization of a queue entry or record failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the HTTP fetch collaborator.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request could not be sent or the response body could not be read
    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
}

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
