//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID + trace middleware)
//!     → load_balancer::Balancer::route (pick upstream)
//!     → request.rs (rewrite target, strip hop-by-hop, forwarding headers)
//!     → upstream exchange
//!     → response.rs (relay body, map failures to 502/503/504)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ProxyError;
pub use server::HttpServer;
