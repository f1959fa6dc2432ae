use serde::de::DeserializeOwned;

use crate::{BadStatusError, HttpResponse, RequestError, Result};

/// Highest status code still treated as success.
const MAX_OK_STATUS: u16 = 399;

/// Classified outcome of a request that produced a response.
///
/// A status above 399 sets [`Response::is_error`] and decodes the body into the reason
/// type `E`. Any other status decodes it into the result type `T`; a decode failure is
/// reported through [`Response::error`] alongside the response instead of replacing it.
///
/// The two decodes are exclusive: on a bad status [`Response::result`] is always `None`
/// and the body is only available through [`Response::reason`] or [`Response::raw`].
#[derive(Debug)]
pub struct Response<T, E = serde_json::Value> {
    raw: HttpResponse,
    has_error: bool,
    outcome: Result<T>,
    reason: Option<E>,
    reason_error: Option<RequestError>,
}

impl<T, E> Response<T, E>
where
    T: DeserializeOwned,
    E: DeserializeOwned,
{
    pub(crate) fn classify(raw: HttpResponse) -> Self {
        if raw.status > MAX_OK_STATUS {
            let (reason, reason_error) = match decode_body::<E>(&raw.body) {
                Ok(reason) => (Some(reason), None),
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(status = raw.status, error = %err, "unable to decode error body");
                    (None, Some(err))
                }
            };
            return Self {
                outcome: Err(BadStatusError::new(raw.status).into()),
                raw,
                has_error: true,
                reason,
                reason_error,
            };
        }

        Self {
            outcome: decode_body::<T>(&raw.body),
            raw,
            has_error: false,
            reason: None,
            reason_error: None,
        }
    }
}

impl<T, E> Response<T, E> {
    /// The response of the terminal attempt.
    pub fn raw(&self) -> &HttpResponse {
        &self.raw
    }

    pub fn status(&self) -> u16 {
        self.raw.status
    }

    /// `true` when the terminal status was above 399.
    pub fn is_error(&self) -> bool {
        self.has_error
    }

    /// The bad-status error, or the decode error of a successful body.
    pub fn error(&self) -> Option<&RequestError> {
        self.outcome.as_ref().err()
    }

    /// The decoded body of a successful response; `None` on a bad status or decode failure.
    pub fn result(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn reason(&self) -> Option<&E> {
        self.reason.as_ref()
    }

    /// Why the error body could not be decoded into `E`, if it could not.
    pub fn reason_error(&self) -> Option<&RequestError> {
        self.reason_error.as_ref()
    }

    /// Converts into the decoded result, turning bad statuses and decode failures into errors.
    pub fn into_result(self) -> Result<T> {
        self.outcome
    }

    pub fn into_reason(self) -> Option<E> {
        self.reason
    }
}

/// Decodes a JSON body; an empty body reads as `null`.
fn decode_body<X: DeserializeOwned>(body: &[u8]) -> Result<X> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(serde_json::Value::Null).map_err(RequestError::Decode);
    }
    serde_json::from_slice(body).map_err(RequestError::Decode)
}
