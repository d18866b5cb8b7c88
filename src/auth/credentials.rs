// Long token acquisition strategies

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, StatusCode};
use parking_lot::RwLock;
use std::sync::Arc;

use super::tokens::{self, TokenKind};
use super::types::{LoginPayload, LoginRequest, LOGIN_PATH, REQUEST_ID_HEADER};
use crate::config::VerificationMode;
use crate::error::{AuthError, ClientError, LogoutError, Result};
use crate::transport::{Host, Transport};

/// Source of the long-lived token
///
/// Implementations decide how the long token is obtained and how a
/// session is torn down on logout.
pub trait CredentialProvider: Send + Sync {
    /// Obtain a new long token
    fn obtain_long_token(&self, transport: &dyn Transport, host: &Host) -> Result<String>;

    /// Invalidate the session on the server
    ///
    /// Fails with `ClientError::Logout` when the server does not confirm
    /// the logout.
    fn logout(
        &self,
        transport: &dyn Transport,
        host: &Host,
        url: &str,
        long_token: Option<&str>,
        short_token: Option<&str>,
    ) -> Result<()>;
}

/// Obtains the long token by logging in with login and password
pub struct LoginCredentials {
    login: String,
    password: String,
    mode: VerificationMode,
}

impl LoginCredentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>, mode: VerificationMode) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            mode,
        }
    }

    fn login_body(&self) -> Result<Bytes> {
        let body = LoginRequest {
            post_user_login: LoginPayload {
                login: &self.login,
                password: &self.password,
                remember: 0,
                verify_level: self.mode.level(),
            },
        };
        let json = serde_json::to_vec(&body)
            .map_err(|e| AuthError::new(format!("Failed to serialize login request: {}", e)))?;
        Ok(Bytes::from(json))
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("mode", &self.mode)
            .finish()
    }
}

impl CredentialProvider for LoginCredentials {
    fn obtain_long_token(&self, transport: &dyn Transport, host: &Host) -> Result<String> {
        tracing::debug!(host = %host, "Obtaining long token");

        let mut request = http::Request::new(self.login_body()?);
        *request.method_mut() = Method::POST;
        *request.uri_mut() = http::Uri::from_static(LOGIN_PATH);
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = transport.execute(host, &request)?;

        let status = response.status();
        if status != StatusCode::OK {
            let request_id = response
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let reason = String::from_utf8_lossy(response.body());
            let message = format!(
                "Unable to login reason='{}'. Request tracking details httpStatus={} requestId={}",
                reason,
                status.as_u16(),
                request_id.as_deref().unwrap_or("null")
            );
            tracing::info!("{}", message);
            return Err(AuthError::new(message)
                .with_status(status.as_u16())
                .with_request_id(request_id)
                .into());
        }

        Ok(tokens::extract_token(&response, TokenKind::Long, self.mode)?)
    }

    fn logout(
        &self,
        transport: &dyn Transport,
        host: &Host,
        url: &str,
        long_token: Option<&str>,
        short_token: Option<&str>,
    ) -> Result<()> {
        if long_token.is_none() && short_token.is_none() {
            tracing::debug!("No active session, skipping logout call");
            return Ok(());
        }

        tracing::debug!(url = %url, "Performing logout");

        let uri: http::Uri = url
            .parse()
            .map_err(|e| ClientError::Config(format!("invalid logout url '{}': {}", url, e)))?;
        let mut request = http::Request::new(Bytes::new());
        *request.method_mut() = Method::DELETE;
        *request.uri_mut() = uri;
        if let Some(long_token) = long_token {
            tokens::attach_token(request.headers_mut(), TokenKind::Long, long_token, self.mode)?;
        }
        if let Some(short_token) = short_token {
            tokens::attach_token(request.headers_mut(), TokenKind::Short, short_token, self.mode)?;
        }

        let response = transport.execute(host, &request)?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let reason = status.canonical_reason().unwrap_or("Logout failure");
            tracing::warn!(status = status.as_u16(), "Logout unsuccessful");
            return Err(LogoutError::new(status.as_u16(), reason).into());
        }
        Ok(())
    }
}

/// Fixed long token supplied by the caller
///
/// Does not know where the token came from, so logout only drops the
/// local session.
#[derive(Clone)]
pub struct StaticCredentials {
    long_token: String,
}

impl StaticCredentials {
    pub fn new(long_token: impl Into<String>) -> Self {
        Self {
            long_token: long_token.into(),
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn obtain_long_token(&self, _transport: &dyn Transport, _host: &Host) -> Result<String> {
        Ok(self.long_token.clone())
    }

    fn logout(
        &self,
        _transport: &dyn Transport,
        _host: &Host,
        _url: &str,
        _long_token: Option<&str>,
        _short_token: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Explicit holder for a caller-supplied long token
///
/// Callers `bind` a token before issuing requests and `clear` it when
/// done. Clones share the same slot.
#[derive(Clone, Default)]
pub struct CredentialScope {
    slot: Arc<RwLock<Option<String>>>,
}

impl CredentialScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a long token, replacing any previous one
    pub fn bind(&self, long_token: impl Into<String>) {
        *self.slot.write() = Some(long_token.into());
    }

    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    pub fn current(&self) -> Option<String> {
        self.slot.read().clone()
    }
}

impl std::fmt::Debug for CredentialScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialScope")
            .field("bound", &self.slot.read().is_some())
            .finish()
    }
}

/// Provider reading the long token from a `CredentialScope`
pub struct ScopedCredentials {
    scope: CredentialScope,
}

impl ScopedCredentials {
    pub fn new(scope: CredentialScope) -> Self {
        Self { scope }
    }
}

impl CredentialProvider for ScopedCredentials {
    fn obtain_long_token(&self, _transport: &dyn Transport, _host: &Host) -> Result<String> {
        self.scope
            .current()
            .ok_or_else(|| AuthError::new("No long token bound to the credential scope").into())
    }

    fn logout(
        &self,
        _transport: &dyn Transport,
        _host: &Host,
        _url: &str,
        _long_token: Option<&str>,
        _short_token: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{response, FnTransport};

    fn host() -> Host {
        Host::parse("https://auth.example.com").unwrap()
    }

    #[test]
    fn test_login_posts_credentials() {
        let transport = FnTransport::new(|_, req| {
            assert_eq!(req.method(), Method::POST);
            assert_eq!(req.uri().path(), LOGIN_PATH);
            let body: serde_json::Value = serde_json::from_slice(req.body()).unwrap();
            assert_eq!(body["postUserLogin"]["login"], "user");
            assert_eq!(body["postUserLogin"]["password"], "secret");
            assert_eq!(body["postUserLogin"]["verify_level"], 2);
            let mut r = response(200);
            r.headers_mut()
                .insert("x-auth-longtoken", HeaderValue::from_static("L1"));
            r
        });
        let provider = LoginCredentials::new("user", "secret", VerificationMode::Header);
        assert_eq!(provider.obtain_long_token(&transport, &host()).unwrap(), "L1");
    }

    #[test]
    fn test_login_failure_carries_reason_and_request_id() {
        let transport = FnTransport::new(|_, _| {
            let mut r = response(401);
            *r.body_mut() = Bytes::from_static(b"bad credentials");
            r.headers_mut()
                .insert("x-request-id", HeaderValue::from_static("req-1"));
            r
        });
        let provider = LoginCredentials::new("user", "wrong", VerificationMode::Header);
        let err = provider.obtain_long_token(&transport, &host()).unwrap_err();
        match err {
            ClientError::Auth(e) => {
                assert_eq!(
                    e.message,
                    "Unable to login reason='bad credentials'. Request tracking details httpStatus=401 requestId=req-1"
                );
                assert_eq!(e.status, Some(401));
                assert_eq!(e.request_id.as_deref(), Some("req-1"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_login_without_token_header_fails() {
        let transport = FnTransport::new(|_, _| response(200));
        let provider = LoginCredentials::new("user", "secret", VerificationMode::Header);
        let err = provider.obtain_long_token(&transport, &host()).unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
    }

    #[test]
    fn test_logout_sends_both_tokens() {
        let transport = FnTransport::new(|_, req| {
            assert_eq!(req.method(), Method::DELETE);
            assert_eq!(req.uri(), "/account/login/42");
            assert_eq!(req.headers().get("X-Auth-LongToken").unwrap(), "L1");
            assert_eq!(req.headers().get("X-Auth-ShortToken").unwrap(), "T1");
            response(204)
        });
        let provider = LoginCredentials::new("user", "secret", VerificationMode::Header);
        provider
            .logout(&transport, &host(), "/account/login/42", Some("L1"), Some("T1"))
            .unwrap();
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_logout_failure_carries_status() {
        let transport = FnTransport::new(|_, _| response(400));
        let provider = LoginCredentials::new("user", "secret", VerificationMode::Header);
        let err = provider
            .logout(&transport, &host(), "/account/login/42", Some("L1"), Some("T1"))
            .unwrap_err();
        match err {
            ClientError::Logout(e) => {
                assert_eq!(e.status, 400);
                assert_eq!(e.reason, "Bad Request");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_logout_without_session_makes_no_call() {
        let transport = FnTransport::new(|_, _| response(500));
        let provider = LoginCredentials::new("user", "secret", VerificationMode::Header);
        provider
            .logout(&transport, &host(), "/account/login/42", None, None)
            .unwrap();
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_static_credentials() {
        let transport = FnTransport::new(|_, _| response(500));
        let provider = StaticCredentials::new("L-static");
        assert_eq!(provider.obtain_long_token(&transport, &host()).unwrap(), "L-static");
        provider
            .logout(&transport, &host(), "/account/login/1", Some("L"), Some("T"))
            .unwrap();
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_scoped_credentials_follow_binding() {
        let transport = FnTransport::new(|_, _| response(500));
        let scope = CredentialScope::new();
        let provider = ScopedCredentials::new(scope.clone());

        assert!(provider.obtain_long_token(&transport, &host()).is_err());

        scope.bind("L-scoped");
        assert_eq!(provider.obtain_long_token(&transport, &host()).unwrap(), "L-scoped");

        scope.clear();
        assert!(scope.current().is_none());
        assert!(provider.obtain_long_token(&transport, &host()).is_err());
    }
}
