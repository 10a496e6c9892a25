//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the upstream response to the client
//! - Map proxy failures to gateway status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Hop-by-hop headers stripped automatically, except the upgrade pair on a
//!   `101 Switching Protocols`
//! - Upstream timeouts result in 504 Gateway Timeout, other transport
//!   failures in 502 Bad Gateway, an exhausted pool in 503

use std::time::Duration;

use axum::body::Body;
use axum::http::header::InvalidHeaderValue;
use axum::http::uri::InvalidUri;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hyper::body::Incoming;
use thiserror::Error;

use crate::http::request::{restore_upgrade, strip_hop_by_hop, upgrade_protocol};

/// Per-request failures. Each is contained in that request's response.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no healthy upstream available")]
    NoHealthyUpstream,

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("invalid upstream URI: {0}")]
    InvalidUri(#[from] InvalidUri),

    #[error("invalid forwarding header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoHealthyUpstream => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Upstream(_) | ProxyError::InvalidUri(_) | ProxyError::InvalidHeader(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let message = match self {
            ProxyError::NoHealthyUpstream => "No healthy upstream available",
            ProxyError::Timeout(_) => "Upstream timed out",
            _ => "Upstream request failed",
        };
        (self.status(), message).into_response()
    }
}

/// Hand an upstream response back to the client, body streamed as-is.
pub fn relay(response: Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    let upgrade = if parts.status == StatusCode::SWITCHING_PROTOCOLS {
        upgrade_protocol(&parts.headers)
    } else {
        None
    };

    strip_hop_by_hop(&mut parts.headers);
    if let Some(protocol) = upgrade {
        restore_upgrade(&mut parts.headers, protocol);
    }
    Response::from_parts(parts, Body::new(body))
}
