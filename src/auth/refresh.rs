// Short token renewal against the token endpoint

use bytes::Bytes;
use http::{Method, StatusCode};

use super::tokens::{self, TokenKind};
use super::types::TOKEN_PATH;
use crate::config::VerificationMode;
use crate::error::{AuthError, ClientError, Result};
use crate::transport::{Host, Transport};

/// Renew the short token using the long token
///
/// Returns `Ok(None)` when the server rejects the long token itself (401),
/// which tells the caller to obtain a new long token first.
pub fn renew_short_token(
    transport: &dyn Transport,
    host: &Host,
    long_token: &str,
    mode: VerificationMode,
) -> Result<Option<String>> {
    tracing::debug!("Obtaining short token");

    let mut request = http::Request::new(Bytes::new());
    *request.method_mut() = Method::GET;
    *request.uri_mut() = http::Uri::from_static(TOKEN_PATH);
    tokens::attach_token(request.headers_mut(), TokenKind::Long, long_token, mode)?;

    let response = transport
        .execute(host, &request)
        .map_err(ClientError::Transport)?;

    match response.status() {
        StatusCode::OK => {
            let token = tokens::extract_token(&response, TokenKind::Short, mode)?;
            tracing::debug!(
                token_prefix = %tokens::prefix(&token),
                "Short token renewed"
            );
            Ok(Some(token))
        }
        StatusCode::UNAUTHORIZED => {
            tracing::debug!("Token endpoint rejected the long token");
            Ok(None)
        }
        status => Err(AuthError::new(format!(
            "Unable to obtain short token, HTTP status: {}",
            status.as_u16()
        ))
        .with_status(status.as_u16())
        .into()),
    }
}
