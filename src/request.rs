use std::{collections::BTreeMap, fmt, marker::PhantomData, sync::Arc, time::Duration};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    auth::basic_auth,
    policy::{classify, Classification, Outcome, RetryPolicy, ServerErrorPolicy},
    Backoff, HttpRequest, HttpResponse, Method, RequestError, RequestOptions, Response, Result,
    Transport,
};

const AUTHORIZATION: &str = "Authorization";
const CONTENT_TYPE: &str = "Content-Type";
const EMPTY_OBJECT: &[u8] = b"{}";

/// Fluent request configuration and retrying executor.
///
/// `T` is the type successful bodies decode into, `E` the type error bodies (status above
/// 399) decode into, and `B` the type of the JSON body sent by write methods. All three
/// default to [`serde_json::Value`].
///
/// The configuration is never mutated by a call: [`Request::get`] and friends take `&self`
/// and keep their attempt counter locally, so one `Request` can serve overlapping calls.
///
/// ```no_run
/// use json_retry_http::Request;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct ShortLink {
///     #[serde(rename = "shortLink")]
///     short_link: String,
/// }
///
/// # async fn run() -> json_retry_http::Result<()> {
/// let response = Request::new(reqwest::Client::new())
///     .set_basic_auth("user", "secret")
///     .set_body(serde_json::json!({ "link": "https://example.com" }))
///     .set_result::<ShortLink>()
///     .post("https://links.example.com/v1/shortLinks")
///     .await?;
///
/// if let Some(link) = response.result() {
///     println!("{}", link.short_link);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Request<C, T = serde_json::Value, E = serde_json::Value, B = serde_json::Value> {
    transport: C,
    headers: BTreeMap<String, String>,
    options: RequestOptions,
    policy: Arc<dyn RetryPolicy>,
    body: Option<B>,
    decode: PhantomData<fn() -> (T, E)>,
}

impl<C> Request<C> {
    /// Creates a request with JSON content type, 2 retries, a fixed 2 second interval and
    /// retries on status 500 and above.
    pub fn new(transport: C) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(CONTENT_TYPE.to_owned(), "application/json".to_owned());
        Self {
            transport,
            headers,
            options: RequestOptions::default(),
            policy: Arc::new(ServerErrorPolicy),
            body: None,
            decode: PhantomData,
        }
    }
}

impl<C, T, E, B> Request<C, T, E, B> {
    /// Sets a header, replacing any previous value for the same key.
    ///
    /// Header names are compared ignoring ASCII case; the spelling of the last call is kept.
    pub fn set_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.headers
            .retain(|existing, _| !existing.eq_ignore_ascii_case(&key));
        self.headers.insert(key, value.into());
        self
    }

    /// Sets `Authorization: Basic <base64(username:password)>`.
    pub fn set_basic_auth(self, username: &str, password: &str) -> Self {
        let value = format!("Basic {}", basic_auth(username, password));
        self.set_header(AUTHORIZATION, value)
    }

    /// Stores the value JSON-encoded as the body of write methods.
    ///
    /// When no body is set, write methods send `{}`.
    pub fn set_body<B2: Serialize>(self, body: B2) -> Request<C, T, E, B2> {
        Request {
            transport: self.transport,
            headers: self.headers,
            options: self.options,
            policy: self.policy,
            body: Some(body),
            decode: PhantomData,
        }
    }

    /// Chooses the type successful bodies are decoded into.
    pub fn set_result<T2: DeserializeOwned>(self) -> Request<C, T2, E, B> {
        Request {
            transport: self.transport,
            headers: self.headers,
            options: self.options,
            policy: self.policy,
            body: self.body,
            decode: PhantomData,
        }
    }

    /// Chooses the type error bodies are decoded into.
    pub fn set_reason<E2: DeserializeOwned>(self) -> Request<C, T, E2, B> {
        Request {
            transport: self.transport,
            headers: self.headers,
            options: self.options,
            policy: self.policy,
            body: self.body,
            decode: PhantomData,
        }
    }

    /// Number of retries after the first attempt.
    pub fn set_retries(mut self, retries: usize) -> Self {
        self.options.retries = retries;
        self
    }

    /// Waits `interval` between attempts.
    pub fn set_retry_interval(mut self, interval: Duration) -> Self {
        self.options.backoff = Backoff::Fixed(interval);
        self
    }

    pub fn set_backoff(mut self, backoff: Backoff) -> Self {
        self.options.backoff = backoff;
        self
    }

    /// Replaces the policy deciding which outcomes are retried.
    pub fn set_retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Applies retry count and backoff from `options`.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }
}

impl<C, T, E, B> Request<C, T, E, B>
where
    C: Transport,
    T: DeserializeOwned,
    E: DeserializeOwned,
    B: Serialize,
{
    /// Sends a GET request. No body is sent, even if one is configured.
    pub async fn get(&self, url: &str) -> Result<Response<T, E>> {
        self.send(Method::Get, url).await
    }

    /// Sends a POST request with the configured body.
    pub async fn post(&self, url: &str) -> Result<Response<T, E>> {
        self.send(Method::Post, url).await
    }

    pub async fn put(&self, url: &str) -> Result<Response<T, E>> {
        self.send(Method::Put, url).await
    }

    pub async fn patch(&self, url: &str) -> Result<Response<T, E>> {
        self.send(Method::Patch, url).await
    }

    pub async fn delete(&self, url: &str) -> Result<Response<T, E>> {
        self.send(Method::Delete, url).await
    }

    /// Runs the retry loop for `method` and classifies the terminal response.
    ///
    /// Transport failures and retry exhaustion are returned as `Err`; any response,
    /// including one with a bad status, is returned as `Ok`.
    pub async fn send(&self, method: Method, url: &str) -> Result<Response<T, E>> {
        let raw = self.execute(method, url).await?;
        Ok(Response::classify(raw))
    }

    async fn execute(&self, method: Method, url: &str) -> Result<HttpResponse> {
        let attempts = self.options.retries.saturating_add(1);
        let mut attempt = 0usize;

        while attempt < attempts {
            // The body is rebuilt from the stored value on every attempt.
            let request = self.build_request(method, url)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(%method, url, attempt, "sending request");

            let outcome = self.transport.execute(request).await;
            let classification = match &outcome {
                Ok(response) => classify(self.policy.as_ref(), &Outcome::Response(response)),
                Err(err) => classify(self.policy.as_ref(), &Outcome::Transport(err)),
            };

            match classification {
                Classification::Retry => {
                    attempt += 1;
                    if attempt < attempts {
                        self.wait_before_retry(attempt - 1).await;
                    }
                }
                Classification::Succeed | Classification::Fail => {
                    return outcome.map_err(RequestError::Transport);
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(%method, url, attempts, "max retries exhausted");

        Err(RequestError::MaxRetriesExhausted)
    }

    fn build_request(&self, method: Method, url: &str) -> Result<HttpRequest> {
        let body = if method.has_body() {
            Some(self.encode_body()?)
        } else {
            None
        };

        Ok(HttpRequest {
            method,
            url: url.to_owned(),
            headers: self.headers.clone(),
            body,
        })
    }

    fn encode_body(&self) -> Result<Vec<u8>> {
        match &self.body {
            Some(body) => serde_json::to_vec(body).map_err(RequestError::Encode),
            None => Ok(EMPTY_OBJECT.to_vec()),
        }
    }

    async fn wait_before_retry(&self, attempt: usize) {
        let delay = self.options.backoff.delay(attempt);

        #[cfg(feature = "tracing")]
        tracing::debug!("retrying request after {} ms", delay.as_millis());

        tokio::time::sleep(delay).await;
    }
}

impl<C: Clone, T, E, B: Clone> Clone for Request<C, T, E, B> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            headers: self.headers.clone(),
            options: self.options.clone(),
            policy: Arc::clone(&self.policy),
            body: self.body.clone(),
            decode: PhantomData,
        }
    }
}

impl<C, T, E, B: fmt::Debug> fmt::Debug for Request<C, T, E, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: BTreeMap<&str, &str> = self
            .headers
            .iter()
            .map(|(key, value)| {
                if key.eq_ignore_ascii_case(AUTHORIZATION) {
                    (key.as_str(), "<redacted>")
                } else {
                    (key.as_str(), value.as_str())
                }
            })
            .collect();

        f.debug_struct("Request")
            .field("headers", &headers)
            .field("options", &self.options)
            .field("body", &self.body)
            .finish()
    }
}
