// Logout interception

use bytes::Bytes;
use http::{Method, StatusCode};

use super::manager::AuthManager;
use super::types::LOGIN_PATH;
use crate::error::Result;
use crate::transport::{Host, Transport};

/// Whether `request` to `target` is a logout of the session living on `home`
pub fn is_logout_request<B>(home: &Host, target: &Host, request: &http::Request<B>) -> bool {
    home == target
        && request.method() == Method::DELETE
        && request.uri().path().starts_with(LOGIN_PATH)
}

impl AuthManager {
    /// Log out and clear the session
    ///
    /// Holds the session exclusively for the whole call, so it cannot
    /// interleave with ordinary requests or a refresh. On failure the
    /// session is left as it was.
    pub fn logout(
        &self,
        transport: &dyn Transport,
        request: &http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>> {
        let url = request
            .uri()
            .path_and_query()
            .map(|p| p.as_str())
            .unwrap_or(LOGIN_PATH);

        let mut session = self.write();
        let (long_token, short_token) = session.get();
        self.provider()
            .logout(transport, self.token_host(), url, long_token, short_token)?;
        session.clear();

        tracing::info!("Logged out, session cleared");
        Ok(no_content())
    }
}

/// Synthetic response returned for a successful logout
fn no_content() -> http::Response<Bytes> {
    let mut response = http::Response::new(Bytes::new());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}
