//! Round-robin HTTP load balancer.
//!
//! Accepts requests on one port and forwards each to the next alive
//! upstream in a fixed pool.

// Core subsystems
pub mod config;
pub mod http;
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::BalancerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::{Balancer, HttpUpstream, ServerPool, Upstream};
