//! Request routing entry point.

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::http::{request::request_id, ProxyError};
use crate::load_balancer::{pool::ServerPool, upstream::HttpUpstream, Upstream};

/// Routes each inbound request to the next upstream in the pool.
///
/// Holds no per-request state; the pool's cursor is the only thing that
/// changes between requests.
#[derive(Debug)]
pub struct Balancer<U = HttpUpstream> {
    listen_port: u16,
    pool: ServerPool<U>,
}

impl<U: Upstream> Balancer<U> {
    pub fn new(listen_port: u16, pool: ServerPool<U>) -> Self {
        Self { listen_port, pool }
    }

    /// Pick an upstream and relay the exchange to it.
    ///
    /// Selection finishes before forwarding starts. When nothing in the pool
    /// is alive the client gets 503 and the pool is left untouched.
    pub async fn route(&self, request: Request<Body>) -> Response {
        let target = match self.pool.next() {
            Ok(target) => target,
            Err(err) => {
                tracing::warn!(
                    request_id = %request_id(&request),
                    path = %request.uri().path(),
                    error = %err,
                    "Rejecting request"
                );
                return ProxyError::NoHealthyUpstream.into_response();
            }
        };

        tracing::info!(
            request_id = %request_id(&request),
            method = %request.method(),
            path = %request.uri().path(),
            upstream = %target.address(),
            "Forwarding request"
        );

        target.forward(request).await
    }

    pub fn pool(&self) -> &ServerPool<U> {
        &self.pool
    }

    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }
}
