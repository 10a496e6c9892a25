//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::header::{CONNECTION, UPGRADE};
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use upstream_balancer::config::BalancerConfig;
use upstream_balancer::{Balancer, HttpServer, Shutdown};

/// Start a backend that answers every request with `status` and its own name.
pub async fn start_named_backend(name: &'static str, status: StatusCode) -> SocketAddr {
    let app = Router::new().fallback(move || async move { (status, name) });
    serve(app).await
}

/// Start a backend that reports back what it received as JSON.
pub async fn start_echo_backend() -> SocketAddr {
    let app = Router::new().fallback(echo);
    serve(app).await
}

/// Start a backend that answers 200 with the given extra headers.
pub async fn start_backend_with_headers(headers: &'static [(&'static str, &'static str)]) -> SocketAddr {
    let app = Router::new().fallback(move || async move {
        let mut response = Response::new(Body::from("with headers"));
        for (name, value) in headers {
            response.headers_mut().append(*name, value.parse().unwrap());
        }
        response
    });
    serve(app).await
}

/// Start a backend that accepts any upgrade and then echoes raw bytes.
pub async fn start_upgrade_backend() -> SocketAddr {
    let app = Router::new().fallback(accept_upgrade);
    serve(app).await
}

async fn accept_upgrade(mut request: Request<Body>) -> Response {
    let Some(protocol) = request.headers().get(UPGRADE).cloned() else {
        return (StatusCode::BAD_REQUEST, "expected an upgrade").into_response();
    };

    let on_upgrade = hyper::upgrade::on(&mut request);
    tokio::spawn(async move {
        let Ok(upgraded) = on_upgrade.await else { return };
        let mut io = TokioIo::new(upgraded);
        let mut buf = [0u8; 1024];
        loop {
            match io.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if io.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(CONNECTION, "upgrade")
        .header(UPGRADE, protocol)
        .body(Body::empty())
        .unwrap()
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "host": header("host"),
        "forwarded_for": header("x-forwarded-for"),
        "request_id": header("x-request-id"),
        "custom": header("x-custom"),
        "te": header("te"),
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A free local port with nothing listening on it.
pub async fn closed_port_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Balancer config pointing at the given local backends.
pub fn config_for(backends: &[SocketAddr]) -> BalancerConfig {
    backends
        .iter()
        .fold(BalancerConfig::default(), |config, addr| {
            config.with_upstream(format!("http://{}", addr))
        })
}

/// A running balancer plus the handles tests need.
pub struct TestBalancer {
    pub addr: SocketAddr,
    pub balancer: Arc<Balancer>,
    pub shutdown: Shutdown,
}

impl TestBalancer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestBalancer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the balancer on an ephemeral port.
pub async fn start_balancer(config: BalancerConfig) -> TestBalancer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).expect("valid test config");
    let balancer = server.balancer();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestBalancer {
        addr,
        balancer,
        shutdown,
    }
}

/// Client that never routes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
