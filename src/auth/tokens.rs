// Token extraction and attachment per verification mode

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, SET_COOKIE};

use super::types::{
    TokenResponse, LONG_TOKEN_COOKIE, LONG_TOKEN_HEADER, SHORT_TOKEN_COOKIE, SHORT_TOKEN_HEADER,
};
use crate::config::VerificationMode;
use crate::error::{AuthError, ClientError, Result};

/// Token class, used to pick header and cookie names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Long,
    Short,
}

impl TokenKind {
    pub fn header(self) -> &'static str {
        match self {
            TokenKind::Long => LONG_TOKEN_HEADER,
            TokenKind::Short => SHORT_TOKEN_HEADER,
        }
    }

    pub fn cookie(self) -> &'static str {
        match self {
            TokenKind::Long => LONG_TOKEN_COOKIE,
            TokenKind::Short => SHORT_TOKEN_COOKIE,
        }
    }
}

/// Extract a token from a successful response
///
/// Lookup order follows the verification mode; the short token also falls
/// back to the JSON body of the token endpoint.
pub fn extract_token(
    response: &http::Response<Bytes>,
    kind: TokenKind,
    mode: VerificationMode,
) -> std::result::Result<String, AuthError> {
    let headers = response.headers();

    let found = match mode {
        VerificationMode::Header => header_token(headers, kind),
        VerificationMode::Cookie => cookie_token(headers, kind),
        VerificationMode::Both => header_token(headers, kind).or_else(|| cookie_token(headers, kind)),
    };

    let found = match (found, kind) {
        (Some(token), _) => Some(token),
        (None, TokenKind::Short) => body_token(response.body()),
        (None, TokenKind::Long) => None,
    };

    found.ok_or_else(|| {
        AuthError::new(format!(
            "Unable to login. Response doesn't contain {}",
            kind.header()
        ))
        .with_status(response.status().as_u16())
    })
}

fn header_token(headers: &HeaderMap, kind: TokenKind) -> Option<String> {
    headers
        .get(kind.header())
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap, kind: TokenKind) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookie| {
            let pair = cookie.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            (name.trim() == kind.cookie() && !value.trim().is_empty())
                .then(|| value.trim().to_string())
        })
}

fn body_token(body: &Bytes) -> Option<String> {
    serde_json::from_slice::<TokenResponse>(body)
        .ok()
        .map(|r| r.user_token.token)
        .filter(|t| !t.is_empty())
}

/// Attach a token to outgoing headers, replacing any previous value
pub fn attach_token(
    headers: &mut HeaderMap,
    kind: TokenKind,
    token: &str,
    mode: VerificationMode,
) -> Result<()> {
    let value = header_value(token)?;
    headers.insert(HeaderName::from_static(header_name(kind)), value);

    if mode.uses_cookie() {
        let cookie = match headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{}; {}={}", existing, kind.cookie(), token),
            None => format!("{}={}", kind.cookie(), token),
        };
        headers.insert(COOKIE, header_value(&cookie)?);
    }
    Ok(())
}

/// Header-only attach used for ordinary requests
pub fn set_short_token(headers: &mut HeaderMap, token: &str) -> Result<()> {
    headers.insert(
        HeaderName::from_static(header_name(TokenKind::Short)),
        header_value(token)?,
    );
    Ok(())
}

// HeaderName::from_static requires lowercase
fn header_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Long => "x-auth-longtoken",
        TokenKind::Short => "x-auth-shorttoken",
    }
}

fn header_value(token: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(token).map_err(|_| {
        ClientError::InvalidHeader(format!(
            "token '{}...' is not a valid header value",
            prefix(token)
        ))
    })
}

/// First characters of a token, safe to log
pub fn prefix(token: &str) -> String {
    token.chars().take(8).collect()
}
