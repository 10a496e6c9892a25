//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → balancer.rs (Balancer::route)
//!     → pool.rs (ServerPool::next, skips upstreams that are not alive)
//!         - round_robin.rs (bounded scan + cursor advance)
//!     → upstream.rs (HttpUpstream::forward relays the exchange)
//!     → Response (upstream's own, or 502/503/504)
//! ```
//!
//! # Design Decisions
//! - The pool is fixed at startup; only the cursor mutates per request
//! - Liveness is read here but computed elsewhere (`HttpUpstream::set_alive`)
//! - Selection always terminates: one full lap, then "no healthy upstream"
//! - Pool and balancer are generic over [`Upstream`], so other upstream
//!   variants plug in without touching selection

pub mod balancer;
pub mod pool;
pub mod round_robin;
pub mod upstream;

use std::future::Future;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use url::Url;

pub use balancer::Balancer;
pub use pool::{PoolError, ServerPool};
pub use round_robin::RoundRobin;
pub use upstream::HttpUpstream;

/// A backend the balancer can send traffic to.
pub trait Upstream: Send + Sync + 'static {
    /// Base address, fixed at construction.
    fn address(&self) -> &Url;

    /// Current liveness. Selection skips upstreams that report `false`.
    fn is_alive(&self) -> bool;

    /// Relay one request/response exchange. Failures come back as error
    /// responses, never as a panic or an `Err`.
    fn forward(&self, request: Request<Body>) -> impl Future<Output = Response> + Send;
}
