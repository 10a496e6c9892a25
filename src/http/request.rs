//! Request handling and transformation.
//!
//! # Responsibilities
//! - Read the request ID assigned by the middleware stack
//! - Rewrite the request target onto an upstream base URI
//! - Strip hop-by-hop headers and set forwarding headers
//!
//! # Design Decisions
//! - Only scheme, host and port change; method, path, query and body pass through
//! - The base URI's own path and query are joined in front of the request's
//! - `Host` is rewritten to the upstream authority so virtual-hosted backends
//!   resolve; a plain pass-through proxy would keep the client's `Host` instead
//! - Upgrade handshakes keep `Connection: upgrade` and `Upgrade`, and `TE` survives
//!   when it asks for trailers; every other hop-by-hop header is dropped

use std::net::{IpAddr, SocketAddr};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::header::{HeaderMap, HeaderValue, CONNECTION, HOST, TE, UPGRADE};
use axum::http::{Request, Uri, Version};
use url::Url;

use crate::http::ProxyError;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Request ID for logging, or "unknown" when none was assigned.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Turn an inbound request into one addressed to `base`.
pub fn prepare_outbound(request: Request<Body>, base: &Url) -> Result<Request<Body>, ProxyError> {
    let (mut parts, body) = request.into_parts();

    let client_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    parts.uri = rewrite_uri(base, &parts.uri)?;
    // The outbound client speaks HTTP/1.1 regardless of the inbound version.
    parts.version = Version::HTTP_11;

    let upgrade = upgrade_protocol(&parts.headers);
    let wants_trailers = header_tokens(&parts.headers, TE.as_str()).any(|t| t == "trailers");

    strip_hop_by_hop(&mut parts.headers);
    if let Some(protocol) = upgrade {
        restore_upgrade(&mut parts.headers, protocol);
    }
    if wants_trailers {
        parts.headers.insert(TE, HeaderValue::from_static("trailers"));
    }
    parts
        .headers
        .insert(HOST, HeaderValue::from_str(&authority(base))?);
    if let Some(ip) = client_ip {
        append_forwarded_for(&mut parts.headers, ip);
    }

    Ok(Request::from_parts(parts, body))
}

/// Replace scheme and authority of `uri` with those of `base`, joining paths
/// and queries.
pub fn rewrite_uri(base: &Url, uri: &Uri) -> Result<Uri, ProxyError> {
    let path = join_paths(base.path(), uri.path());

    let query = match (
        base.query().filter(|q| !q.is_empty()),
        uri.query().filter(|q| !q.is_empty()),
    ) {
        (Some(b), Some(r)) => Some(format!("{b}&{r}")),
        (Some(q), None) | (None, Some(q)) => Some(q.to_string()),
        (None, None) => None,
    };

    let mut target = format!("{}://{}{}", base.scheme(), authority(base), path);
    if let Some(query) = query {
        target.push('?');
        target.push_str(&query);
    }

    Ok(target.parse::<Uri>()?)
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = header_tokens(headers, CONNECTION.as_str()).collect();

    for name in &listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// Protocol named in `Upgrade` when `Connection` asks for an upgrade.
pub fn upgrade_protocol(headers: &HeaderMap) -> Option<HeaderValue> {
    if header_tokens(headers, CONNECTION.as_str()).any(|t| t == "upgrade") {
        headers.get(UPGRADE).cloned()
    } else {
        None
    }
}

/// Put the upgrade pair back after hop-by-hop stripping.
pub fn restore_upgrade(headers: &mut HeaderMap, protocol: HeaderValue) {
    headers.insert(CONNECTION, HeaderValue::from_static("upgrade"));
    headers.insert(UPGRADE, protocol);
}

/// Lowercased comma-separated tokens across every value of `name`.
fn header_tokens<'a>(headers: &'a HeaderMap, name: &str) -> impl Iterator<Item = String> + 'a {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
}

fn authority(base: &Url) -> String {
    let host = base.host_str().unwrap_or_default();
    match base.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let value = if prior.is_empty() {
        ip.to_string()
    } else {
        format!("{}, {}", prior.join(", "), ip)
    };

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
