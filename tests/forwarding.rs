//! What reaches the upstream, and what comes back.

use axum::http::StatusCode;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod common;

#[tokio::test]
async fn test_request_forwarded_intact() {
    let backend = common::start_echo_backend().await;
    let lb = common::start_balancer(common::config_for(&[backend])).await;

    let res = common::client()
        .post(lb.url("/submit/items?id=7&tag=a%20b"))
        .header("x-custom", "kept")
        .body("hello upstream")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["path"], "/submit/items");
    assert_eq!(echoed["query"], "id=7&tag=a%20b");
    assert_eq!(echoed["body"], "hello upstream");
    assert_eq!(echoed["custom"], "kept");
    assert_eq!(echoed["host"], backend.to_string());
    assert_eq!(echoed["forwarded_for"], "127.0.0.1");
    assert!(echoed["request_id"].is_string());
}

#[tokio::test]
async fn test_upstream_error_status_relayed() {
    let backend = common::start_named_backend("broken", StatusCode::INTERNAL_SERVER_ERROR).await;
    let lb = common::start_balancer(common::config_for(&[backend])).await;

    let res = common::client().get(lb.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "broken");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let dead = common::closed_port_addr().await;
    let alive = common::start_named_backend("alive", StatusCode::OK).await;
    let lb = common::start_balancer(common::config_for(&[dead, alive])).await;
    let client = common::client();

    // First pick is the dead address; no retry onto the next upstream.
    let res = client.get(lb.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 502);

    // The failure does not disturb later requests.
    let res = client.get(lb.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "alive");
}

#[tokio::test]
async fn test_hop_by_hop_response_headers_removed() {
    let backend = common::start_backend_with_headers(&[
        ("connection", "x-secret"),
        ("x-secret", "1"),
        ("keep-alive", "timeout=5"),
        ("x-visible", "yes"),
    ])
    .await;
    let lb = common::start_balancer(common::config_for(&[backend])).await;

    let res = common::client().get(lb.url("/")).send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert!(!res.headers().contains_key("x-secret"));
    assert!(!res.headers().contains_key("keep-alive"));
    assert_ne!(
        res.headers().get("connection").and_then(|v| v.to_str().ok()),
        Some("x-secret")
    );
    assert_eq!(res.headers()["x-visible"], "yes");
}

#[tokio::test]
async fn test_te_trailers_forwarded() {
    let backend = common::start_echo_backend().await;
    let lb = common::start_balancer(common::config_for(&[backend])).await;

    let res = common::client()
        .get(lb.url("/"))
        .header("te", "trailers")
        .send()
        .await
        .unwrap();

    let echoed: Value = res.json().await.unwrap();
    assert_eq!(echoed["te"], "trailers");
}

#[tokio::test]
async fn test_upgrade_tunnels_through_balancer() {
    let backend = common::start_upgrade_backend().await;
    let lb = common::start_balancer(common::config_for(&[backend])).await;

    let mut stream = TcpStream::connect(lb.addr).await.unwrap();
    let handshake = format!(
        "GET /chat HTTP/1.1\r\nHost: {}\r\nConnection: Upgrade\r\nUpgrade: echo\r\n\r\n",
        lb.addr
    );
    stream.write_all(handshake.as_bytes()).await.unwrap();

    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        let n = stream.read(&mut byte).await.unwrap();
        assert_eq!(n, 1, "connection closed during handshake");
        head.push(byte[0]);
    }
    let head = String::from_utf8(head).unwrap().to_ascii_lowercase();
    assert!(head.starts_with("http/1.1 101"), "unexpected handshake: {head}");
    assert!(head.contains("upgrade: echo"));

    stream.write_all(b"ping over the tunnel").await.unwrap();
    let mut echoed = [0u8; 20];
    stream.read_exact(&mut echoed).await.unwrap();
    assert_eq!(&echoed, b"ping over the tunnel");
}
