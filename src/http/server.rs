//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the upstream pool and balancer from configuration
//! - Create the Axum Router with a single catch-all handler
//! - Wire up middleware (request ID, tracing)
//! - Serve on a caller-supplied listener until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, extract::State, http::Request, response::Response, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{validate_config, BalancerConfig, ConfigError};
use crate::load_balancer::upstream::{build_client, HttpUpstream};
use crate::load_balancer::{Balancer, ServerPool, Upstream};

/// HTTP front end of the load balancer.
pub struct HttpServer {
    router: Router,
    balancer: Arc<Balancer>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Any configuration problem is returned here, before a socket is touched.
    pub fn new(config: BalancerConfig) -> Result<Self, ConfigError> {
        let addresses = validate_config(&config).map_err(ConfigError::Validation)?;

        let client = build_client(&config.timeouts);
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);

        let upstreams = addresses
            .into_iter()
            .map(|address| HttpUpstream::new(address, client.clone(), request_timeout))
            .collect();

        let pool = ServerPool::new(upstreams)?;
        for upstream in pool.upstreams() {
            tracing::debug!(upstream = %upstream.address(), "Upstream registered");
        }

        let balancer = Arc::new(Balancer::new(config.listener.port, pool));
        let router = Self::build_router(balancer.clone());

        Ok(Self { router, balancer })
    }

    /// Build the Axum router; every path and method goes to the balancer.
    fn build_router(balancer: Arc<Balancer>) -> Router {
        Router::new()
            .fallback(route_handler)
            .with_state(balancer)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Shared handle to the balancer, e.g. for a liveness collaborator.
    pub fn balancer(&self) -> Arc<Balancer> {
        self.balancer.clone()
    }

    /// Run the server, accepting connections on the given listener until a
    /// shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            port = addr.port(),
            upstreams = self.balancer.pool().len(),
            "Serving requests"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn route_handler(State(balancer): State<Arc<Balancer>>, request: Request<Body>) -> Response {
    balancer.route(request).await
}
