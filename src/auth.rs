use base64::prelude::*;

/// Encodes `username:password` with the standard base64 alphabet.
///
/// The `Basic ` scheme prefix is not included.
pub fn basic_auth(username: &str, password: &str) -> String {
    BASE64_STANDARD.encode(format!("{username}:{password}"))
}
