use std::error::Error as StdError;
use std::fmt;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The request could not be completed at the network/IO level.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The terminal attempt answered with a status above 399.
    #[error(transparent)]
    BadStatus(#[from] BadStatusError),
    /// Every attempt in the retry budget was classified as retryable.
    #[error("max retries exhausted")]
    MaxRetriesExhausted,
    /// The configured body could not be serialized to JSON.
    #[error("unable to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
    /// A response body could not be parsed into the requested type.
    #[error("unable to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl RequestError {
    /// Returns the status code when this is a bad-status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadStatus(err) => Some(err.code()),
            _ => None,
        }
    }
}

/// Non-success HTTP status observed on the terminal attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("bad status code: {code}")]
pub struct BadStatusError {
    code: u16,
}

impl BadStatusError {
    pub fn new(code: u16) -> Self {
        Self { code }
    }

    pub fn code(&self) -> u16 {
        self.code
    }
}

/// Opaque failure reported by a [`Transport`](crate::Transport).
///
/// The original error is kept and can be inspected with [`TransportError::downcast_ref`],
/// e.g. to check `reqwest::Error::is_timeout`.
pub struct TransportError {
    inner: Box<dyn StdError + Send + Sync + 'static>,
}

impl TransportError {
    pub fn new(err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self { inner: err.into() }
    }

    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync + 'static> {
        self.inner
    }
}

impl fmt::Debug for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TransportError").field(&self.inner).finish()
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err)
    }
}
