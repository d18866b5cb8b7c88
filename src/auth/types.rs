// Authentication types

use serde::{Deserialize, Serialize};

/// Header carrying the long-lived session token
pub const LONG_TOKEN_HEADER: &str = "X-Auth-LongToken";

/// Header carrying the short-lived access token
pub const SHORT_TOKEN_HEADER: &str = "X-Auth-ShortToken";

/// Cookie names used by cookie verification
pub const LONG_TOKEN_COOKIE: &str = "AuthLongToken";
pub const SHORT_TOKEN_COOKIE: &str = "AuthShortToken";

/// Challenge markers inside `WWW-Authenticate`
pub const LONG_TOKEN_CHALLENGE: &str = "cookie=AuthLongToken";
pub const SHORT_TOKEN_CHALLENGE: &str = "cookie=AuthShortToken";

/// Correlation id returned by the login endpoint
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Endpoint paths
pub const LOGIN_PATH: &str = "/account/login";
pub const TOKEN_PATH: &str = "/account/token";

/// Which token class a 401 response asks to renew
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Challenge {
    None,
    ShortTokenExpired,
    LongTokenExpired,
}

/// State of the refresh coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    Refreshing,
    /// The last refresh sequence ended with an error
    Failed,
}

/// Credential pair owned by one client
///
/// Holds no lock of its own: every access happens under the client's
/// session lock so both fields can be updated together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    long_token: Option<String>,
    short_token: Option<String>,

    /// Bumped on every successful short token renewal
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> (Option<&str>, Option<&str>) {
        (self.long_token.as_deref(), self.short_token.as_deref())
    }

    pub fn set(&mut self, long_token: Option<String>, short_token: Option<String>) {
        self.long_token = long_token;
        self.short_token = short_token;
    }

    pub fn long_token(&self) -> Option<&str> {
        self.long_token.as_deref()
    }

    pub fn short_token(&self) -> Option<&str> {
        self.short_token.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the long token; the old short token is scoped to the old
    /// long token and is dropped with it
    pub(crate) fn replace_long_token(&mut self, long_token: String) {
        self.long_token = Some(long_token);
        self.short_token = None;
    }

    pub(crate) fn renew_short_token(&mut self, short_token: String) {
        self.short_token = Some(short_token);
        self.generation = self.generation.wrapping_add(1);
    }

    /// Drop both tokens; challenges observed before the clear are stale
    pub fn clear(&mut self) {
        self.long_token = None;
        self.short_token = None;
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Login request body
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub post_user_login: LoginPayload<'a>,
}

#[derive(Serialize, Debug)]
pub struct LoginPayload<'a> {
    pub login: &'a str,
    pub password: &'a str,
    pub remember: u8,
    pub verify_level: u8,
}

/// Token endpoint response body
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub user_token: UserToken,
}

#[derive(Deserialize, Debug)]
pub struct UserToken {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_starts_empty() {
        let session = Session::new();
        assert_eq!(session.get(), (None, None));
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn test_replacing_long_token_drops_short_token() {
        let mut session = Session::new();
        session.set(Some("L0".to_string()), Some("T0".to_string()));
        session.replace_long_token("L1".to_string());
        assert_eq!(session.get(), (Some("L1"), None));
    }

    #[test]
    fn test_renewal_bumps_generation() {
        let mut session = Session::new();
        session.renew_short_token("T1".to_string());
        session.renew_short_token("T2".to_string());
        assert_eq!(session.short_token(), Some("T2"));
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn test_clear_advances_generation() {
        let mut session = Session::new();
        session.set(Some("L1".to_string()), None);
        session.renew_short_token("T1".to_string());
        session.clear();
        assert_eq!(session.get(), (None, None));
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn test_login_request_shape() {
        let body = LoginRequest {
            post_user_login: LoginPayload {
                login: "user@example.com",
                password: "p\"ss",
                remember: 0,
                verify_level: 2,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "postUserLogin": {
                    "login": "user@example.com",
                    "password": "p\"ss",
                    "remember": 0,
                    "verify_level": 2
                }
            })
        );
    }
}
