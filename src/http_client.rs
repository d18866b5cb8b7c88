use bytes::Bytes;

use crate::auth::{self, AuthManager, Challenge, RefreshState};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::transport::{Body, Host, Transport};

/// HTTP client that transparently manages the session tokens
///
/// Attaches the current short token to every request, renews the tokens
/// when the server answers with an authentication challenge and replays
/// the request once with the renewed token.
pub struct AuthenticatedClient<T> {
    /// Underlying stateless transport
    transport: T,

    /// Session credentials and refresh coordination
    auth: AuthManager,

    /// Home host of the session
    host: Host,
}

impl<T: Transport> AuthenticatedClient<T> {
    /// Create a new client with an empty session
    pub fn new(transport: T, config: ClientConfig) -> Self {
        let auth = AuthManager::new(&config);
        Self {
            transport,
            auth,
            host: config.host,
        }
    }

    /// Execute a request against the host in its URI, or the home host
    /// when the URI has no authority
    pub fn execute(&self, request: http::Request<Body>) -> Result<http::Response<Bytes>> {
        let host = Host::from_uri(request.uri()).unwrap_or_else(|| self.host.clone());
        self.execute_on(&host, request)
    }

    /// Execute a request against `host`
    ///
    /// Handles:
    /// - logout of the home session: performed by the credential provider
    /// - 401 with a token challenge: refresh and retry exactly once
    /// - anything else: returned untouched
    pub fn execute_on(
        &self,
        host: &Host,
        request: http::Request<Body>,
    ) -> Result<http::Response<Bytes>> {
        let (parts, body) = request.into_parts();
        let mut request = http::Request::from_parts(parts, body.into_bytes()?);

        if auth::is_logout_request(&self.host, host, &request) {
            tracing::debug!(url = %request.uri(), "Intercepted logout request");
            return self.auth.logout(&self.transport, &request);
        }

        let (response, generation) = self.dispatch(host, &mut request)?;

        let challenge = auth::classify(&response);
        if challenge == Challenge::None {
            return Ok(response);
        }

        tracing::info!(
            challenge = ?challenge,
            method = %request.method(),
            url = %request.uri(),
            "Received authentication challenge, refreshing tokens"
        );
        drop(response);

        let outcome = self.auth.refresh(&self.transport, challenge, generation)?;
        tracing::debug!(outcome = ?outcome, "Retrying request");

        // The session may have been cleared since the first send
        request.headers_mut().remove(auth::SHORT_TOKEN_HEADER);
        let (response, _) = self.dispatch(host, &mut request)?;
        tracing::debug!(status = %response.status(), "Retried request completed");
        Ok(response)
    }

    /// Send the request under the shared session lock
    ///
    /// Returns the response and the session generation the request was
    /// sent with.
    fn dispatch(
        &self,
        host: &Host,
        request: &mut http::Request<Bytes>,
    ) -> Result<(http::Response<Bytes>, u64)> {
        let session = self.auth.read();
        if let Some(token) = session.short_token() {
            auth::set_short_token(request.headers_mut(), token)?;
        }
        let generation = session.generation();

        let response = self.transport.execute(host, request)?;
        drop(session);

        Ok((response, generation))
    }

    /// Snapshot of the current (long, short) tokens
    pub fn session_tokens(&self) -> (Option<String>, Option<String>) {
        let session = self.auth.read();
        let (long_token, short_token) = session.get();
        (long_token.map(str::to_string), short_token.map(str::to_string))
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.auth.refresh_state()
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Get the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::testing::{response, FnTransport};
    use http::{HeaderValue, Method, StatusCode};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn config() -> ClientConfig {
        ClientConfig::builder(Host::parse("https://api.example.com").unwrap())
            .static_token("L1")
            .build()
            .unwrap()
    }

    fn get(uri: &str) -> http::Request<Body> {
        http::Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::Empty)
            .unwrap()
    }

    fn challenge(marker: &'static str) -> http::Response<Bytes> {
        let mut r = response(401);
        r.headers_mut()
            .insert("www-authenticate", HeaderValue::from_static(marker));
        r
    }

    fn short_token(req: &http::Request<Bytes>) -> Option<String> {
        req.headers()
            .get("X-Auth-ShortToken")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    #[test]
    fn test_success_is_returned_untouched() {
        let transport = FnTransport::new(|_, _| {
            let mut r = response(200);
            *r.body_mut() = Bytes::from_static(b"hello");
            r
        });
        let client = AuthenticatedClient::new(transport, config());

        let resp = client.execute(get("/x")).unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.body(), "hello");
        assert_eq!(client.transport().calls(), 1);
    }

    #[test]
    fn test_plain_401_is_not_retried() {
        let transport = FnTransport::new(|_, _| challenge("Basic realm=\"api\""));
        let client = AuthenticatedClient::new(transport, config());

        let resp = client.execute(get("/x")).unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(client.transport().calls(), 1);
        assert_eq!(client.session_tokens(), (None, None));
    }

    #[test]
    fn test_empty_session_logs_in_and_retries() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let transport = FnTransport::new(move |_, req| {
            log.lock().push((req.uri().path().to_string(), short_token(req)));
            match req.uri().path() {
                "/account/token" => {
                    let mut r = response(200);
                    r.headers_mut()
                        .insert("x-auth-shorttoken", HeaderValue::from_static("T1"));
                    r
                }
                _ if short_token(req).as_deref() == Some("T1") => response(200),
                _ => challenge("cookie=AuthShortToken"),
            }
        });
        let client = AuthenticatedClient::new(transport, config());

        let resp = client.execute(get("/x")).unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(client.transport().calls(), 3);
        assert_eq!(
            *seen.lock(),
            vec![
                ("/x".to_string(), None),
                ("/account/token".to_string(), None),
                ("/x".to_string(), Some("T1".to_string())),
            ]
        );
        assert_eq!(
            client.session_tokens(),
            (Some("L1".to_string()), Some("T1".to_string()))
        );
    }

    #[test]
    fn test_retry_response_is_returned_whatever_its_status() {
        let transport = FnTransport::new(|_, req| match req.uri().path() {
            "/account/token" => {
                let mut r = response(200);
                r.headers_mut()
                    .insert("x-auth-shorttoken", HeaderValue::from_static("T1"));
                r
            }
            _ => challenge("cookie=AuthShortToken"),
        });
        let client = AuthenticatedClient::new(transport, config());

        let resp = client.execute(get("/x")).unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(client.transport().calls(), 3);
    }

    #[test]
    fn test_auth_error_is_not_retried() {
        let transport = FnTransport::new(|_, req| match req.uri().path() {
            "/account/token" => response(401),
            _ => challenge("cookie=AuthLongToken"),
        });
        let client = AuthenticatedClient::new(transport, config());

        let err = client.execute(get("/x")).unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
        // original request + one token call, no replay
        assert_eq!(client.transport().calls(), 2);
        assert_eq!(client.refresh_state(), RefreshState::Failed);
    }

    #[test]
    fn test_reader_body_is_replayed() {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&bodies);
        let transport = FnTransport::new(move |_, req| match req.uri().path() {
            "/account/token" => {
                let mut r = response(200);
                r.headers_mut()
                    .insert("x-auth-shorttoken", HeaderValue::from_static("T1"));
                r
            }
            _ => {
                log.lock().push(req.body().clone());
                if short_token(req).is_some() {
                    response(201)
                } else {
                    challenge("cookie=AuthShortToken")
                }
            }
        });
        let client = AuthenticatedClient::new(transport, config());

        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .body(Body::from_reader(std::io::Cursor::new(b"payload".to_vec())))
            .unwrap();
        let resp = client.execute(request).unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            *bodies.lock(),
            vec![Bytes::from_static(b"payload"), Bytes::from_static(b"payload")]
        );
    }

    #[test]
    fn test_logout_is_intercepted() {
        let transport = FnTransport::new(|_, _| response(500));
        let client = AuthenticatedClient::new(transport, config());

        let request = http::Request::builder()
            .method(Method::DELETE)
            .uri("/account/login/1")
            .body(Body::Empty)
            .unwrap();
        let resp = client.execute(request).unwrap();

        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        // static credentials log out locally
        assert_eq!(client.transport().calls(), 0);
    }

    #[test]
    fn test_absolute_uri_targets_its_own_host() {
        let transport = FnTransport::new(|host, _| {
            assert_eq!(host.name(), "other.example.com");
            response(204)
        });
        let client = AuthenticatedClient::new(transport, config());

        // Not a logout: a different host than the session's home
        let request = http::Request::builder()
            .method(Method::DELETE)
            .uri("https://other.example.com/account/login/1")
            .body(Body::Empty)
            .unwrap();
        let resp = client.execute(request).unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(client.transport().calls(), 1);
    }
}
