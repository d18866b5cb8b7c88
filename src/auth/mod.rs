// Authentication module
// Owns the session credentials, detects challenges and renews tokens

mod challenge;
mod credentials;
mod logout;
mod manager;
mod refresh;
mod tokens;
mod types;

pub use challenge::classify;
pub use credentials::{
    CredentialProvider, CredentialScope, LoginCredentials, ScopedCredentials, StaticCredentials,
};
pub use logout::is_logout_request;
pub use manager::{AuthManager, RefreshOutcome};
pub use tokens::{extract_token, TokenKind};
pub use types::{
    Challenge, RefreshState, Session, LOGIN_PATH, LONG_TOKEN_CHALLENGE, LONG_TOKEN_HEADER,
    SHORT_TOKEN_CHALLENGE, SHORT_TOKEN_HEADER, TOKEN_PATH,
};

pub(crate) use tokens::set_short_token;
