// Test helpers shared by unit tests

use bytes::Bytes;
use http::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::TransportError;
use crate::transport::{Host, Transport};

type Handler = dyn Fn(&Host, &http::Request<Bytes>) -> http::Response<Bytes> + Send + Sync;

/// Transport answering every request with a closure, counting calls
pub struct FnTransport {
    handler: Box<Handler>,
    calls: AtomicUsize,
}

impl FnTransport {
    pub fn new(
        handler: impl Fn(&Host, &http::Request<Bytes>) -> http::Response<Bytes> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for FnTransport {
    fn execute(
        &self,
        host: &Host,
        request: &http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.handler)(host, request))
    }
}

/// Empty response with the given status
pub fn response(status: u16) -> http::Response<Bytes> {
    let mut r = http::Response::new(Bytes::new());
    *r.status_mut() = StatusCode::from_u16(status).unwrap();
    r
}
