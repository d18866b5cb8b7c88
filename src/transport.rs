use bytes::Bytes;
use http::uri::{Scheme, Uri};
use std::fmt;
use std::io::Read;
use std::time::Duration;

use crate::error::{ClientError, TransportError};

/// Target of a request: scheme, host name and effective port
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Host {
    scheme: Scheme,
    name: String,
    port: u16,
}

impl Host {
    /// Parse a host from a string such as `https://example.com` or `http://127.0.0.1:8080`
    pub fn parse(s: &str) -> Result<Self, ClientError> {
        let uri: Uri = s
            .parse()
            .map_err(|e| ClientError::Config(format!("invalid host '{}': {}", s, e)))?;
        Self::from_uri(&uri).ok_or_else(|| {
            ClientError::Config(format!("host '{}' must include scheme and authority", s))
        })
    }

    /// Extract the host of an absolute URI; `None` for origin-form URIs
    pub fn from_uri(uri: &Uri) -> Option<Self> {
        let scheme = uri.scheme()?.clone();
        let name = uri.host()?.to_ascii_lowercase();
        let port = match uri.port_u16() {
            Some(port) => port,
            None if scheme == Scheme::HTTPS => 443,
            None if scheme == Scheme::HTTP => 80,
            None => return None,
        };
        Some(Self { scheme, name, port })
    }

    pub fn scheme(&self) -> &str {
        self.scheme.as_str()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Absolute URL for the path and query of `uri` on this host
    pub fn url_for(&self, uri: &Uri) -> String {
        let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        format!("{}{}", self, path)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.name, self.port)
    }
}

/// Request body as supplied by callers
///
/// `Reader` bodies can only be read once, so they are buffered before the
/// first dispatch to allow the request to be replayed after a refresh.
pub enum Body {
    Empty,
    Bytes(Bytes),
    Reader(Box<dyn Read + Send>),
}

impl Body {
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Body::Reader(Box::new(reader))
    }

    /// Buffer the body into memory so it can be sent more than once
    pub fn into_bytes(self) -> std::io::Result<Bytes> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(bytes) => Ok(bytes),
            Body::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Bytes(b) => write!(f, "Body::Bytes({} bytes)", b.len()),
            Body::Reader(_) => f.write_str("Body::Reader(..)"),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Empty
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(Bytes::from(s))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

/// Stateless HTTP transport the authenticated client decorates
///
/// Implementations own connection pooling, TLS, redirects and timeouts.
/// The response body must be fully buffered.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        host: &Host,
        request: &http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(
        &self,
        host: &Host,
        request: &http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, TransportError> {
        (**self).execute(host, request)
    }
}

/// Blocking transport backed by reqwest with connection pooling
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Create a new transport
    pub fn new(
        max_connections: usize,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .pool_max_idle_per_host(max_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn execute(
        &self,
        host: &Host,
        request: &http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, TransportError> {
        let url = host.url_for(request.uri());

        tracing::debug!(
            method = %request.method(),
            url = %url,
            "Sending HTTP request"
        );

        let response = self
            .client
            .request(request.method().clone(), &url)
            .headers(request.headers().clone())
            .body(request.body().clone())
            .send()?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes()?;

        tracing::debug!(status = %status, "Received HTTP response");

        let mut out = http::Response::new(body);
        *out.status_mut() = status;
        *out.version_mut() = version;
        *out.headers_mut() = headers;
        Ok(out)
    }
}
