//! `json-retry-http` is an async JSON HTTP request executor for service-to-service calls.
//!
//! A [`Request`] holds headers, a JSON body and retry settings, and sends through any
//! [`Transport`] (`reqwest::Client` works out of the box):
//! - [`Request::get`] / [`Request::delete`] send no body
//! - [`Request::post`] / [`Request::put`] / [`Request::patch`] send the configured body, or `{}`
//!
//! Every attempt is judged by a [`RetryPolicy`]; the default retries statuses of 500 and
//! above with a fixed delay. The terminal response is classified into a [`Response`] that
//! carries the decoded result, or a [`BadStatusError`] and the decoded error body.

mod auth;
mod error;
mod options;
mod policy;
mod request;
mod response;
mod transport;

pub use auth::basic_auth;
pub use error::{BadStatusError, RequestError, TransportError};
pub use options::{Backoff, RequestOptions};
pub use policy::{classify, Classification, Outcome, RetryPolicy, ServerErrorPolicy};
pub use request::Request;
pub use response::Response;
pub use transport::{HttpRequest, HttpResponse, Method, Transport};

pub type Result<T> = std::result::Result<T, RequestError>;
