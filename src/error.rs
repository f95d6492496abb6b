use std::time::Duration;

/// Errors produced by the client, the authorization flow and the aggregation
/// engines.
///
/// Authorization failures (`Auth`, `Callback`, `CallbackTimeout`,
/// `Unauthenticated`, `TokenExpired`) always abort the dependent call.
/// `PageFetch`, `BatchFetch` and `Format` are only returned when the walk runs
/// with [`FailurePolicy::FailFast`](crate::paging::FailurePolicy); under the
/// best-effort policy they are recorded in the aggregate instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed (network issues, timeouts, etc.)
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Missing or malformed configuration value
    #[error("configuration error: {0}")]
    Config(String),
    /// The token endpoint rejected an exchange
    #[error("token endpoint rejected the {grant} grant ({status}): {body}")]
    Auth {
        grant: &'static str,
        status: u16,
        body: String,
    },
    /// A resource call was issued before any bearer token was installed
    #[error("client is not authenticated - authorization must complete before resource calls")]
    Unauthenticated,
    /// The provider kept answering 401 after a re-authorization
    #[error("access token rejected after re-authorization")]
    TokenExpired,
    /// The local listener could not deliver a usable authorization code
    #[error("authorization callback failed: {0}")]
    Callback(String),
    #[error("no authorization callback received within {0:?}")]
    CallbackTimeout(Duration),
    /// A resource endpoint answered with a non-success status
    #[error("request to {url} failed with status {status}: {body}")]
    Api {
        url: String,
        status: u16,
        body: String,
    },
    #[error("page {page} could not be fetched: {source}")]
    PageFetch {
        page: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("batch {chunk} could not be fetched: {source}")]
    BatchFetch {
        chunk: usize,
        #[source]
        source: Box<Error>,
    },
    /// A raw item did not have the shape the formatter expects
    #[error("unexpected item shape: {0}")]
    Format(String),
}

impl Error {
    /// True for errors that mean the installed bearer token is unusable.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Error::Auth { .. }
                | Error::Unauthenticated
                | Error::TokenExpired
                | Error::Callback(_)
                | Error::CallbackTimeout(_)
        )
    }
}
