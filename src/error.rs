use thiserror::Error;

/// Failure reported by a page renderer. The session treats every variant as
/// an opaque per-page error.
#[derive(Error, Debug)]
pub enum RendererError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("timed out after {timeout_secs}s waiting for {url}")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("renderer returned no content for {url}")]
    EmptyContent { url: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectorError {
    #[error("invalid CSS selector for '{field}': {selector} - {reason}")]
    Invalid {
        field: &'static str,
        selector: String,
        reason: String,
    },

    #[error("no selectors configured for '{field}'")]
    Empty { field: &'static str },

    #[error("invalid base URL {url}: {reason}")]
    BaseUrl { url: String, reason: String },
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}
