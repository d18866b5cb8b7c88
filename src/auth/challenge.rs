// Authentication challenge detection

use http::{header::WWW_AUTHENTICATE, StatusCode};

use super::types::{Challenge, LONG_TOKEN_CHALLENGE, SHORT_TOKEN_CHALLENGE};

/// Classify a response as an authentication challenge
///
/// Only a 401 carrying a recognized `WWW-Authenticate` marker is a
/// challenge. Headers that are not valid visible ASCII are skipped, so a
/// malformed challenge degrades to `Challenge::None` and is never retried.
pub fn classify<B>(response: &http::Response<B>) -> Challenge {
    if response.status() != StatusCode::UNAUTHORIZED {
        return Challenge::None;
    }

    for value in response.headers().get_all(WWW_AUTHENTICATE) {
        let Ok(challenge) = value.to_str() else {
            tracing::debug!("Ignoring non-ASCII WWW-Authenticate header");
            continue;
        };

        if challenge.contains(LONG_TOKEN_CHALLENGE) {
            return Challenge::LongTokenExpired;
        }
        if challenge.contains(SHORT_TOKEN_CHALLENGE) {
            return Challenge::ShortTokenExpired;
        }
    }

    Challenge::None
}
