use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ReelError {
    #[error("operation cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} during {operation} for {url}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        operation: &'static str,
    },

    #[error("failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("feed fetch failed for {key}: {reason}")]
    FeedFetch { key: String, reason: String },

    #[error("engagement backend error: {reason}")]
    Backend { reason: String },

    #[error("storage error for key `{key}`: {reason}")]
    Storage { key: String, reason: String },

    #[error("player error: {source}")]
    Player {
        #[from]
        source: PlayerError,
    },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl ReelError {
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn http_status(
        status: StatusCode,
        url: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            operation,
        }
    }

    pub fn decode(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Decode {
            what,
            reason: reason.into(),
        }
    }

    pub fn feed_fetch(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FeedFetch {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend {
            reason: reason.into(),
        }
    }

    pub fn storage(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Whether repeating the same operation later might succeed.
    ///
    /// Nothing in the engine retries automatically; this is for callers that
    /// decide whether to offer a retry in the UI.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cancelled { .. }
            | Self::InvalidUrl { .. }
            | Self::Decode { .. }
            | Self::InvalidArgument { .. }
            | Self::Configuration { .. }
            | Self::Player { .. } => false,
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Network { .. }
            | Self::FeedFetch { .. }
            | Self::Backend { .. }
            | Self::Storage { .. }
            | Self::Io { .. } => true,
        }
    }
}

/// Failure reported by a native player handle.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlayerError {
    #[error("player for {url} could not be created: {reason}")]
    Create { url: String, reason: String },

    #[error("player handle already released")]
    Released,

    #[error("player call `{operation}` failed: {reason}")]
    Call {
        operation: &'static str,
        reason: String,
    },
}

impl PlayerError {
    pub fn create(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Create {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn call(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Call {
            operation,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReelError>;
