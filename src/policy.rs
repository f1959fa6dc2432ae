use crate::{HttpResponse, TransportError};

/// Result of a single attempt, as seen by a [`RetryPolicy`].
#[derive(Debug)]
pub enum Outcome<'a> {
    /// The transport produced a response (any status).
    Response(&'a HttpResponse),
    /// The transport failed before a response existed.
    Transport(&'a TransportError),
}

impl Outcome<'_> {
    /// Status code, when a response exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response(response) => Some(response.status),
            Self::Transport(_) => None,
        }
    }
}

/// Decides whether another attempt should be made.
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, outcome: &Outcome<'_>) -> bool;
}

impl<F> RetryPolicy for F
where
    F: Fn(&Outcome<'_>) -> bool + Send + Sync,
{
    fn should_retry(&self, outcome: &Outcome<'_>) -> bool {
        self(outcome)
    }
}

/// Retries responses with a status of 500 or above.
///
/// Transport failures are returned to the caller as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerErrorPolicy;

impl RetryPolicy for ServerErrorPolicy {
    fn should_retry(&self, outcome: &Outcome<'_>) -> bool {
        outcome.status().is_some_and(|status| status >= 500)
    }
}

/// How the executor treats the outcome of an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Make another attempt if the budget allows.
    Retry,
    /// Stop and hand the response to decoding.
    Succeed,
    /// Stop and return the transport error.
    Fail,
}

/// Turns an attempt outcome into the executor's next step under `policy`.
pub fn classify(policy: &dyn RetryPolicy, outcome: &Outcome<'_>) -> Classification {
    if policy.should_retry(outcome) {
        return Classification::Retry;
    }
    match outcome {
        Outcome::Response(_) => Classification::Succeed,
        Outcome::Transport(_) => Classification::Fail,
    }
}
