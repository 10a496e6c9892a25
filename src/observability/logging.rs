//! Structured logging.
//!
//! Uses the `tracing` ecosystem. `RUST_LOG` takes precedence; otherwise the
//! configured level applies to this crate and to `tower_http`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_directives(level: &str) -> String {
    format!("upstream_balancer={level},tower_http={level}")
}

/// Install the global subscriber. Call once, at startup.
pub fn init(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives(level).into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
