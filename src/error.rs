// Error handling module
// Defines the closed set of errors surfaced by the authenticated client

use thiserror::Error;

/// Failure to obtain or renew session credentials
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,

    /// HTTP status of the response that caused the failure, if any
    pub status: Option<u16>,

    /// Server-side correlation id, if the response carried one
    pub request_id: Option<String>,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            request_id: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Logout was rejected or could not be performed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Logout failed: {status} - {reason}")]
pub struct LogoutError {
    pub status: u16,
    pub reason: String,
}

impl LogoutError {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }
}

/// Failure of the underlying HTTP transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by the authenticated client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Credentials could not be obtained or renewed
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Logout did not succeed; the session is left intact
    #[error(transparent)]
    Logout(#[from] LogoutError),

    /// Transport failure, propagated unchanged
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A token could not be carried in an HTTP header
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status associated with the error, if there is one
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Auth(e) => e.status,
            ClientError::Logout(e) => Some(e.status),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Transport(TransportError::Io(err))
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
