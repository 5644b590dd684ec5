//! Sender integration tests against mock HTTP servers and local socket listeners

use super::*;
use crate::types::Protocol;
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, UdpSocket},
};
use wiremock::{
    matchers::{body_string, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn http_config(url: String) -> TestConfiguration {
    TestConfiguration {
        timeout_ms: 2_000,
        ..TestConfiguration::new(url, Protocol::Http)
    }
}

fn socket_config(protocol: Protocol, port: u16, body: &str) -> TestConfiguration {
    TestConfiguration {
        port,
        body: Some(body.to_string()),
        timeout_ms: 500,
        ..TestConfiguration::new("127.0.0.1", protocol)
    }
}

/// Echo server answering every read on every accepted connection
async fn spawn_tcp_echo() -> (u16, Arc<std::sync::atomic::AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let accepted = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if socket.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    (port, accepted)
}

/// Port with nothing listening on it
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_http_success_records_status_and_length() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("healthy"))
        .mount(&server)
        .await;

    let sender = HttpSender::new(Duration::from_secs(2)).unwrap();
    let outcome = sender.send(&http_config(format!("{}/health", server.uri()))).await;

    assert!(outcome.success, "unexpected failure: {}", outcome.error_message);
    assert_eq!(outcome.status_code, 200);
    assert_eq!(outcome.content_length, 7);
    assert!(outcome.error_message.is_empty());
    assert!(outcome.response_time_ms >= 0.0);
}

#[tokio::test]
async fn test_http_post_sends_json_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("content-type", "application/json"))
        .and(header("x-api-key", "secret"))
        .and(body_string(r#"{"id":1}"#))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = http_config(format!("{}/orders", server.uri()));
    config.method = "POST".to_string();
    config.body = Some(r#"{"id":1}"#.to_string());
    config.headers.insert("X-Api-Key".to_string(), "secret".to_string());

    let sender = HttpSender::new(config.timeout()).unwrap();
    let outcome = sender.send(&config).await;

    assert!(outcome.success, "unexpected failure: {}", outcome.error_message);
    assert_eq!(outcome.status_code, 201);
}

#[tokio::test]
async fn test_http_get_ignores_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(body_string(""))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let mut config = http_config(server.uri());
    config.body = Some("ignored".to_string());

    let outcome = HttpSender::new(config.timeout()).unwrap().send(&config).await;
    assert!(outcome.success);
    assert_eq!(outcome.status_code, 204);
}

#[tokio::test]
async fn test_http_error_status_is_failure_with_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let config = http_config(server.uri());
    let outcome = HttpSender::new(config.timeout()).unwrap().send(&config).await;

    assert!(!outcome.success);
    assert!(!outcome.is_timeout);
    assert_eq!(outcome.status_code, 503);
    assert_eq!(outcome.content_length, 4);
    assert_eq!(outcome.error_message, "HTTP 503 Service Unavailable");
}

#[tokio::test]
async fn test_http_timeout_is_flagged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut config = http_config(server.uri());
    config.timeout_ms = 150;

    // The per-request deadline applies even to a client built without one
    let outcome = HttpSender::with_client(reqwest::Client::new()).send(&config).await;

    assert!(!outcome.success);
    assert!(outcome.is_timeout);
    assert_eq!(outcome.status_code, 0);
    assert!(outcome.response_time_ms >= 100.0);
    assert!(outcome.response_time_ms < 5_000.0);
}

#[tokio::test]
async fn test_http_connection_refused_is_plain_failure() {
    let port = closed_port().await;
    let config = http_config(format!("http://127.0.0.1:{}/", port));

    let outcome = HttpSender::new(config.timeout()).unwrap().send(&config).await;

    assert!(!outcome.success);
    assert!(!outcome.is_timeout);
    assert_eq!(outcome.status_code, 0);
    assert!(!outcome.error_message.is_empty());
}

#[tokio::test]
async fn test_http_invalid_method_fails_without_network() {
    let mut config = http_config("http://127.0.0.1:1/".to_string());
    config.method = "BAD METHOD".to_string();

    let outcome = HttpSender::new(config.timeout()).unwrap().send(&config).await;
    assert!(!outcome.success);
    assert!(outcome.error_message.contains("Invalid HTTP method"));
    assert_eq!(outcome.response_time_ms, 0.0);
}

#[tokio::test]
async fn test_tcp_echo_reuses_one_connection() {
    let (port, accepted) = spawn_tcp_echo().await;
    let pools = TransportPools::new();
    let sender = TcpSender::new(Arc::clone(&pools.tcp), Arc::clone(&pools.buffers));
    let config = socket_config(Protocol::Tcp, port, "ping");

    for _ in 0..5 {
        let outcome = sender.send(&config).await;
        assert!(outcome.success, "unexpected failure: {}", outcome.error_message);
        assert_eq!(outcome.content_length, 4);
        assert_eq!(outcome.status_code, 0);
    }

    let stats = pools.tcp.stats();
    assert_eq!(stats.opened, 1);
    assert_eq!(stats.reused, 4);
    assert_eq!(accepted.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(pools.buffers.allocations(), 1, "read buffer must be recycled");

    sender.shutdown().await;
    assert!(pools.tcp.is_empty());
}

#[tokio::test]
async fn test_tcp_remote_close_marks_dead_and_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        // First connection is closed right after the request arrives
        let (mut first, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 64];
        let _ = first.read(&mut buf).await;
        drop(first);

        let (mut second, _) = listener.accept().await.unwrap();
        let n = second.read(&mut buf).await.unwrap();
        second.write_all(&buf[..n]).await.unwrap();
        let _ = second.read(&mut buf).await;
    });

    let pools = TransportPools::new();
    let sender = TcpSender::new(Arc::clone(&pools.tcp), Arc::clone(&pools.buffers));
    let config = socket_config(Protocol::Tcp, port, "hello");

    let closed = sender.send(&config).await;
    assert!(!closed.success);
    assert!(!closed.is_timeout);
    assert!(
        closed.error_message.contains("closed") || closed.error_message.contains("Receive failed"),
        "unexpected message: {}",
        closed.error_message
    );

    let retried = sender.send(&config).await;
    assert!(retried.success, "unexpected failure: {}", retried.error_message);
    assert_eq!(retried.content_length, 5);

    let stats = pools.tcp.stats();
    assert_eq!(stats.opened, 2);
    assert_eq!(stats.replaced, 1);
}

#[tokio::test]
async fn test_tcp_silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let pools = TransportPools::new();
    let sender = TcpSender::new(Arc::clone(&pools.tcp), Arc::clone(&pools.buffers));
    let mut config = socket_config(Protocol::Tcp, port, "anyone?");
    config.timeout_ms = 150;

    let outcome = sender.send(&config).await;
    assert!(!outcome.success);
    assert!(outcome.is_timeout);
    assert!(outcome.response_time_ms >= 100.0);

    // A late reply would belong to the abandoned request, so the stream is retired
    let connection = pools.tcp.get("127.0.0.1", port).unwrap();
    assert!(!crate::pool::PooledConnection::is_alive(connection.as_ref()));

    let again = sender.send(&config).await;
    assert!(again.is_timeout);
    let stats = pools.tcp.stats();
    assert_eq!(stats.opened, 2);
    assert_eq!(stats.replaced, 1);
}

#[tokio::test]
async fn test_concurrent_tcp_load_gets_every_reply() {
    let (port, accepted) = spawn_tcp_echo().await;
    let config = TestConfiguration {
        number_of_requests: 200,
        concurrency: 16,
        show_progress: false,
        ..socket_config(Protocol::Tcp, port, "ping")
    };

    let stats = crate::executor::run_load_test(&config).await.unwrap();

    assert_eq!(stats.total_requests, 200);
    assert_eq!(stats.successful_requests, 200, "errors: {:?}", stats.top_errors);
    assert_eq!(stats.timeout_requests, 0);
    assert_eq!(stats.total_bytes, 800);
    assert_eq!(accepted.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_tcp_connection_refused() {
    let port = closed_port().await;
    let pools = TransportPools::new();
    let sender = TcpSender::new(Arc::clone(&pools.tcp), Arc::clone(&pools.buffers));

    let outcome = sender.send(&socket_config(Protocol::Tcp, port, "x")).await;
    assert!(!outcome.success);
    assert!(!outcome.is_timeout);
    assert!(outcome.error_message.starts_with("Connection to 127.0.0.1:"));
    assert!(pools.tcp.is_empty());
}

#[tokio::test]
async fn test_udp_echo_round_trip() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            let Ok((n, from)) = server.recv_from(&mut buf).await else {
                break;
            };
            let _ = server.send_to(&buf[..n], from).await;
        }
    });

    let pools = TransportPools::new();
    let sender = UdpSender::new(Arc::clone(&pools.udp), Arc::clone(&pools.buffers));
    let config = socket_config(Protocol::Udp, port, "datagram");

    for _ in 0..3 {
        let outcome = sender.send(&config).await;
        assert!(outcome.success, "unexpected failure: {}", outcome.error_message);
        assert_eq!(outcome.content_length, 8);
    }

    assert_eq!(pools.udp.stats().opened, 1);
}

#[tokio::test]
async fn test_udp_without_reply_times_out() {
    let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();

    let pools = TransportPools::new();
    let sender = UdpSender::new(Arc::clone(&pools.udp), Arc::clone(&pools.buffers));
    let mut config = socket_config(Protocol::Udp, port, "hello?");
    config.timeout_ms = 150;

    let outcome = sender.send(&config).await;
    assert!(!outcome.success);
    assert!(outcome.is_timeout);
    drop(server);
}

#[tokio::test]
async fn test_protocol_sender_selection() {
    let pools = TransportPools::new();

    let http = ProtocolSender::for_config(&http_config("http://localhost".into()), &pools).unwrap();
    assert_eq!(http.protocol(), Protocol::Http);

    let tcp = ProtocolSender::for_config(&socket_config(Protocol::Tcp, 7, ""), &pools).unwrap();
    assert_eq!(tcp.protocol(), Protocol::Tcp);

    let udp = ProtocolSender::for_config(&socket_config(Protocol::Udp, 7, ""), &pools).unwrap();
    assert_eq!(udp.protocol(), Protocol::Udp);

    assert!(http.pool_stats().is_none());
    assert_eq!(tcp.pool_stats().unwrap().opened, 0);
    assert_eq!(udp.pool_stats().unwrap().live, 0);
}
