use anyhow::{Context, Result};
use clap::Parser;
use std::fmt;
use std::sync::Arc;

use crate::auth::{
    CredentialProvider, CredentialScope, LoginCredentials, ScopedCredentials, StaticCredentials,
};
use crate::error::ClientError;
use crate::transport::Host;

/// How the long and short tokens are transferred and verified
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum VerificationMode {
    /// Tokens travel in cookies
    Cookie,
    /// Tokens travel in `X-Auth-*` headers
    #[default]
    Header,
    /// Tokens must be present in cookies and headers
    Both,
}

impl VerificationMode {
    /// `verify_level` sent with the login request
    pub fn level(self) -> u8 {
        match self {
            VerificationMode::Cookie => 0,
            VerificationMode::Both => 1,
            VerificationMode::Header => 2,
        }
    }

    pub fn uses_cookie(self) -> bool {
        matches!(self, VerificationMode::Cookie | VerificationMode::Both)
    }
}

/// Where the long-lived token comes from
#[derive(Clone)]
pub enum CredentialSource {
    /// Log in with login and password
    Login { login: String, password: String },
    /// Fixed long token
    Static(String),
    /// Long token bound explicitly by the caller
    Scoped(CredentialScope),
    /// Custom strategy
    Provider(Arc<dyn CredentialProvider>),
}

impl CredentialSource {
    pub(crate) fn into_provider(self, mode: VerificationMode) -> Arc<dyn CredentialProvider> {
        match self {
            CredentialSource::Login { login, password } => {
                Arc::new(LoginCredentials::new(login, password, mode))
            }
            CredentialSource::Static(token) => Arc::new(StaticCredentials::new(token)),
            CredentialSource::Scoped(scope) => Arc::new(ScopedCredentials::new(scope)),
            CredentialSource::Provider(provider) => provider,
        }
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Login { login, .. } => f
                .debug_struct("Login")
                .field("login", login)
                .field("password", &"<redacted>")
                .finish(),
            CredentialSource::Static(_) => f.write_str("Static(<redacted>)"),
            CredentialSource::Scoped(scope) => f.debug_tuple("Scoped").field(scope).finish(),
            CredentialSource::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

/// Configuration of an authenticated client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Home host of the session; logout requests are recognized against it
    pub host: Host,
    pub credential_source: CredentialSource,
    pub verification_mode: VerificationMode,
    /// Host serving the login and token endpoints, defaults to `host`
    pub token_host: Option<Host>,
}

impl ClientConfig {
    pub fn builder(host: Host) -> ClientConfigBuilder {
        ClientConfigBuilder {
            host,
            credential_source: None,
            verification_mode: VerificationMode::default(),
            token_host: None,
        }
    }

    pub fn token_host(&self) -> &Host {
        self.token_host.as_ref().unwrap_or(&self.host)
    }
}

/// Builder for `ClientConfig`
pub struct ClientConfigBuilder {
    host: Host,
    credential_source: Option<CredentialSource>,
    verification_mode: VerificationMode,
    token_host: Option<Host>,
}

impl ClientConfigBuilder {
    pub fn login(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.credential_source = Some(CredentialSource::Login {
            login: login.into(),
            password: password.into(),
        });
        self
    }

    pub fn static_token(mut self, long_token: impl Into<String>) -> Self {
        self.credential_source = Some(CredentialSource::Static(long_token.into()));
        self
    }

    pub fn scope(mut self, scope: CredentialScope) -> Self {
        self.credential_source = Some(CredentialSource::Scoped(scope));
        self
    }

    pub fn provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credential_source = Some(CredentialSource::Provider(provider));
        self
    }

    pub fn verification_mode(mut self, mode: VerificationMode) -> Self {
        self.verification_mode = mode;
        self
    }

    pub fn token_host(mut self, host: Host) -> Self {
        self.token_host = Some(host);
        self
    }

    pub fn build(self) -> std::result::Result<ClientConfig, ClientError> {
        let credential_source = self
            .credential_source
            .ok_or_else(|| ClientError::Config("a credential source is required".to_string()))?;

        Ok(ClientConfig {
            host: self.host,
            credential_source,
            verification_mode: self.verification_mode,
            token_host: self.token_host,
        })
    }
}

/// sessionguard - issue authenticated requests against a session-token protected API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// HTTP method of the request
    #[arg(default_value = "GET")]
    pub method: String,

    /// Path (and query) of the request
    #[arg(default_value = "/")]
    pub path: String,

    /// Home host, e.g. https://api.example.com
    #[arg(short = 'H', long, env = "SG_HOST")]
    pub host: String,

    /// Login name used to obtain the long token
    #[arg(short = 'u', long, env = "SG_LOGIN")]
    pub login: Option<String>,

    /// Password used to obtain the long token
    #[arg(short = 'p', long, env = "SG_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Pre-issued long token (instead of login/password)
    #[arg(short = 't', long, env = "SG_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Verification mode (cookie, header, both)
    #[arg(short = 'm', long, env = "SG_MODE", default_value = "header")]
    pub mode: String,

    /// Host serving the login and token endpoints
    #[arg(long, env = "SG_TOKEN_HOST")]
    pub token_host: Option<String>,

    /// Request body
    #[arg(short = 'd', long)]
    pub data: Option<String>,

    /// Log out after the request completes
    #[arg(long)]
    pub logout: bool,

    /// HTTP request timeout in seconds
    #[arg(long, env = "SG_TIMEOUT", default_value = "60")]
    pub timeout: u64,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "SG_CONNECT_TIMEOUT", default_value = "30")]
    pub connect_timeout: u64,

    /// Maximum idle connections kept per host
    #[arg(long, env = "SG_MAX_CONNECTIONS", default_value = "20")]
    pub max_connections: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SG_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Settings of the command line tool
#[derive(Clone, Debug)]
pub struct Config {
    pub client: ClientConfig,

    // Request
    pub method: http::Method,
    pub path: String,
    pub data: Option<String>,
    pub logout: bool,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(args: CliArgs) -> Result<Self> {
        let host = Host::parse(&args.host).context("Invalid --host")?;
        let mode = parse_verification_mode(&args.mode)?;

        let mut builder = ClientConfig::builder(host).verification_mode(mode);

        builder = match (args.token, args.login, args.password) {
            (Some(token), _, _) => builder.static_token(token),
            (None, Some(login), Some(password)) => builder.login(login, password),
            (None, Some(_), None) => anyhow::bail!("SG_PASSWORD is required with --login"),
            (None, None, _) => {
                anyhow::bail!("Either SG_TOKEN or SG_LOGIN/SG_PASSWORD must be provided")
            }
        };

        if let Some(token_host) = args.token_host {
            builder = builder.token_host(Host::parse(&token_host).context("Invalid --token-host")?);
        }

        let method = args
            .method
            .to_uppercase()
            .parse::<http::Method>()
            .with_context(|| format!("Invalid HTTP method: {}", args.method))?;

        Ok(Config {
            client: builder.build()?,
            method,
            path: args.path,
            data: args.data,
            logout: args.logout,
            http_max_connections: args.max_connections,
            http_connect_timeout: args.connect_timeout,
            http_request_timeout: args.timeout,
            log_level: args.log_level,
        })
    }
}

/// Parse verification mode from string
pub fn parse_verification_mode(s: &str) -> Result<VerificationMode> {
    match s.to_lowercase().as_str() {
        "cookie" => Ok(VerificationMode::Cookie),
        "header" => Ok(VerificationMode::Header),
        "both" | "header_and_cookie" => Ok(VerificationMode::Both),
        other => anyhow::bail!("Unknown verification mode: {}", other),
    }
}
