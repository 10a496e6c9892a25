//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that every upstream address is a usable base URI
//! - Validate value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<Vec<Url>, Vec<ValidationError>>
//! - Success hands back the parsed upstream addresses, in configured order
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one upstream must be configured")]
    NoUpstreams,

    #[error("upstream {address:?} is not a valid URI: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("upstream {address:?} uses unsupported scheme {scheme:?} (expected http or https)")]
    UnsupportedScheme { address: String, scheme: String },

    #[error("upstream {address:?} has no host")]
    MissingHost { address: String },

    #[error("timeouts.{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
}

/// Check the configuration, collecting every problem found.
///
/// On success returns the parsed upstream addresses.
pub fn validate_config(config: &BalancerConfig) -> Result<Vec<Url>, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut addresses = Vec::with_capacity(config.upstreams.len());

    if config.upstreams.is_empty() {
        errors.push(ValidationError::NoUpstreams);
    }

    for upstream in &config.upstreams {
        match parse_upstream_address(&upstream.address) {
            Ok(url) => addresses.push(url),
            Err(e) => errors.push(e),
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "connect_secs" });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "request_secs" });
    }

    if errors.is_empty() {
        Ok(addresses)
    } else {
        Err(errors)
    }
}

/// Parse an upstream base address, accepting only absolute http(s) URIs with a host.
pub fn parse_upstream_address(address: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(address).map_err(|e| ValidationError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ValidationError::UnsupportedScheme {
                address: address.to_string(),
                scheme: other.to_string(),
            })
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::MissingHost {
            address: address.to_string(),
        });
    }

    Ok(url)
}
