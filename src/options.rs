use std::time::Duration;

const RETRIES_ENV: &str = "HTTP_REQUEST_RETRIES";
const RETRY_INTERVAL_ENV: &str = "HTTP_REQUEST_RETRY_INTERVAL_MS";

/// Delay strategy applied between attempts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `initial` doubled on every retry, capped at `max`.
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after the failed attempt number `attempt` (0-based).
    pub fn delay(&self, attempt: usize) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { initial, max } => {
                let exp = attempt.min(16) as u32;
                initial.saturating_mul(1u32 << exp).min(max)
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(2))
    }
}

/// Configures retry behavior of a [`Request`](crate::Request).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestOptions {
    /// Maximum number of retries after the initial attempt.
    pub retries: usize,
    /// Delay strategy between attempts.
    pub backoff: Backoff,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff: Backoff::default(),
        }
    }
}

impl RequestOptions {
    /// Builds options from environment variables.
    ///
    /// Reads:
    /// - `HTTP_REQUEST_RETRIES` — number of retries after the first attempt
    /// - `HTTP_REQUEST_RETRY_INTERVAL_MS` — fixed delay between attempts
    ///
    /// Unset variables keep their default; values that do not parse are an error.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut options = Self::default();

        if let Some(raw) = lookup(RETRIES_ENV) {
            options.retries = raw
                .trim()
                .parse()
                .map_err(|_| format!("{RETRIES_ENV} must be a non-negative integer, got '{raw}'"))?;
        }

        if let Some(raw) = lookup(RETRY_INTERVAL_ENV) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                format!("{RETRY_INTERVAL_ENV} must be a number of milliseconds, got '{raw}'")
            })?;
            options.backoff = Backoff::Fixed(Duration::from_millis(millis));
        }

        Ok(options)
    }
}
