//! HTTP upstream abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server by its base URI
//! - Track liveness (written by an external collaborator, read by the pool)
//! - Relay one request/response exchange to the backend
//! - Splice both connections together after a `101 Switching Protocols`

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use hyper::upgrade::OnUpgrade;
use hyper_tls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioIo},
};
use tokio::{io, time};
use url::Url;

use crate::config::TimeoutConfig;
use crate::http::{request, response, ProxyError};
use crate::load_balancer::Upstream;

/// Shared outbound client. Cloning is cheap and shares the connection pool.
pub type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build the outbound client used by every upstream (plain HTTP and HTTPS).
pub fn build_client(timeouts: &TimeoutConfig) -> HttpClient {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

    Client::builder(TokioExecutor::new()).build(HttpsConnector::new_with_connector(http))
}

/// A single backend reached over HTTP(S).
pub struct HttpUpstream {
    /// Base URI, parsed once.
    address: Url,
    /// Liveness flag (defaults to alive).
    alive: AtomicBool,
    client: HttpClient,
    /// Deadline for the upstream's response headers.
    request_timeout: Duration,
}

impl HttpUpstream {
    pub fn new(address: Url, client: HttpClient, request_timeout: Duration) -> Self {
        Self {
            address,
            alive: AtomicBool::new(true),
            client,
            request_timeout,
        }
    }

    /// Flip liveness. Intended for health-checking collaborators.
    pub fn set_alive(&self, alive: bool) {
        let was = self.alive.swap(alive, Ordering::Relaxed);
        if was != alive {
            tracing::info!(upstream = %self.address, alive, "Upstream liveness changed");
        }
    }

    async fn exchange(&self, mut request: Request<Body>) -> Result<Response, ProxyError> {
        let client_upgrade = request::upgrade_protocol(request.headers())
            .is_some()
            .then(|| hyper::upgrade::on(&mut request));
        let outbound = request::prepare_outbound(request, &self.address)?;

        let mut upstream_response = time::timeout(self.request_timeout, self.client.request(outbound))
            .await
            .map_err(|_| ProxyError::Timeout(self.request_timeout))??;

        if upstream_response.status() == StatusCode::SWITCHING_PROTOCOLS {
            if let Some(client_upgrade) = client_upgrade {
                let upstream_upgrade = hyper::upgrade::on(&mut upstream_response);
                tokio::spawn(tunnel(client_upgrade, upstream_upgrade, self.address.clone()));
            }
        }

        Ok(response::relay(upstream_response))
    }
}

/// Copy bytes both ways between the upgraded client and upstream connections.
async fn tunnel(client: OnUpgrade, upstream: OnUpgrade, address: Url) {
    let (client, upstream) = match tokio::try_join!(client, upstream) {
        Ok(pair) => pair,
        Err(err) => {
            tracing::warn!(upstream = %address, error = %err, "Upgrade failed");
            return;
        }
    };

    let mut client = TokioIo::new(client);
    let mut upstream = TokioIo::new(upstream);
    match io::copy_bidirectional(&mut client, &mut upstream).await {
        Ok((sent, received)) => {
            tracing::debug!(upstream = %address, sent, received, "Upgraded connection closed");
        }
        Err(err) => {
            tracing::debug!(upstream = %address, error = %err, "Upgraded connection aborted");
        }
    }
}

impl Upstream for HttpUpstream {
    fn address(&self) -> &Url {
        &self.address
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    async fn forward(&self, request: Request<Body>) -> Response {
        match self.exchange(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(upstream = %self.address, error = %err, "Upstream exchange failed");
                err.into_response()
            }
        }
    }
}

impl fmt::Debug for HttpUpstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpUpstream")
            .field("address", &self.address.as_str())
            .field("alive", &self.is_alive())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
