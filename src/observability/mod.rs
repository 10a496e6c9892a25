//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Balancer / upstreams / server
//!     → tracing events (one per routed request, startup, failures)
//!     → logging.rs subscriber (EnvFilter + fmt)
//!     → stdout
//! ```
//!
//! # Design Decisions
//! - Structured fields (upstream, path, request_id) rather than formatted strings
//! - Request ID assigned by middleware flows into every routing log line

pub mod logging;
