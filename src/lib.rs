// sessionguard - authenticating HTTP client decorator

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod transport;

#[cfg(test)]
mod testing;

pub use auth::{CredentialProvider, CredentialScope};
pub use config::{ClientConfig, CredentialSource, VerificationMode};
pub use error::{AuthError, ClientError, LogoutError, Result, TransportError};
pub use http_client::AuthenticatedClient;
pub use transport::{Body, Host, ReqwestTransport, Transport};
