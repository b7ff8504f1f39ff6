//! End-to-end tests over real sockets

mod common;

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use filehttpd::http::connection::Connection;
use filehttpd::server::Shutdown;
use filehttpd::server::listener::serve;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;

struct TestServer {
    addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<anyhow::Result<()>>,
}

async fn start(root: &Path, workers: usize, grace: Duration) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(serve(
        listener,
        common::dispatcher(root),
        workers,
        grace,
        shutdown.clone(),
    ));
    TestServer {
        addr,
        shutdown,
        handle,
    }
}

async fn exchange(addr: SocketAddr, raw: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8_lossy(&out).into_owned()
}

fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or("")
}

#[tokio::test]
async fn test_get_index_over_socket() {
    let root = common::docroot();
    let server = start(root.path(), 4, Duration::from_secs(1)).await;

    let response = exchange(server.addr, b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("\r\nConnection: Closed\r\n"));
    assert!(response.contains("\r\nContent-Type: text/html\r\n"));
    assert_eq!(body(&response), common::INDEX);
}

#[tokio::test]
async fn test_post_then_get_round_trip() {
    let root = common::docroot();
    let server = start(root.path(), 4, Duration::from_secs(1)).await;

    let created = exchange(
        server.addr,
        b"POST /note.txt HTTP/1.0\r\nContent-Length: 11\r\n\r\nhello world",
    )
    .await;
    assert!(created.starts_with("HTTP/1.0 201 Created\r\n"));

    let read = exchange(server.addr, b"GET /note.txt HTTP/1.1\r\n\r\n").await;
    assert!(read.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(read.contains("\r\nContent-Length: 11\r\n"));
    assert_eq!(body(&read), "hello world");
}

#[tokio::test]
async fn test_body_split_across_writes() {
    let root = common::docroot();
    fs::write(root.path().join("a.txt"), "").unwrap();
    let server = start(root.path(), 4, Duration::from_secs(1)).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"PUT /a.txt HTTP/1.1\r\nContent-Length: 6\r\n\r\nabc")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    stream.write_all(b"def").await.unwrap();

    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(fs::read_to_string(root.path().join("a.txt")).unwrap(), "abcdef");
}

#[tokio::test]
async fn test_malformed_requests_have_no_side_effects() {
    let root = common::docroot();
    let server = start(root.path(), 4, Duration::from_secs(1)).await;

    let attempts: [&[u8]; 3] = [
        b"POST /x.txt\r\nContent-Length: 1\r\n\r\nx",
        b"BREW /x.txt HTTP/1.1\r\nContent-Length: 1\r\n\r\nx",
        b"POST /x.txt HTTP/2.0\r\nContent-Length: 1\r\n\r\nx",
    ];

    for raw in attempts {
        let response = exchange(server.addr, raw).await;
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert_eq!(body(&response), "bad request page");
    }

    assert!(!root.path().join("x.txt").exists());
}

#[tokio::test]
async fn test_options_over_socket() {
    let root = common::docroot();
    let server = start(root.path(), 4, Duration::from_secs(1)).await;

    let response = exchange(server.addr, b"OPTIONS /whatever HTTP/1.1\r\n\r\n").await;

    assert!(response.starts_with(
        "HTTP/1.1 204 No Content\r\nAllow: GET, HEAD, PATCH, POST, DELETE, PUT, OPTIONS\r\n"
    ));
    assert!(response.ends_with("Connection: Closed\r\n\r\n"));
}

#[tokio::test]
async fn test_silent_client_gets_no_response() {
    let root = common::docroot();
    let server = start(root.path(), 4, Duration::from_secs(1)).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();

    assert!(out.is_empty());
}

#[tokio::test]
async fn test_pool_bounds_concurrent_connections() {
    let root = common::docroot();
    let server = start(root.path(), 1, Duration::from_secs(1)).await;

    // Occupies the only worker until the header block is finished.
    let mut slow = TcpStream::connect(server.addr).await.unwrap();
    slow.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let waiting = tokio::spawn(exchange(server.addr, b"GET / HTTP/1.1\r\n\r\n"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!waiting.is_finished());

    slow.write_all(b"\r\n").await.unwrap();
    let mut out = String::new();
    slow.read_to_string(&mut out).await.unwrap();
    assert!(out.starts_with("HTTP/1.1 200 OK"));

    let second = timeout(Duration::from_secs(5), waiting).await.unwrap().unwrap();
    assert!(second.starts_with("HTTP/1.1 200 OK"));
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let root = common::docroot();
    let server = start(root.path(), 2, Duration::from_secs(1)).await;

    server.shutdown.trigger();
    let result = timeout(Duration::from_secs(5), server.handle).await.unwrap();
    assert!(result.unwrap().is_ok());

    assert!(TcpStream::connect(server.addr).await.is_err());
}

#[tokio::test]
async fn test_shutdown_aborts_stalled_connections_after_grace() {
    let root = common::docroot();
    let server = start(root.path(), 2, Duration::from_millis(100)).await;

    let mut stalled = TcpStream::connect(server.addr).await.unwrap();
    stalled.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    server.shutdown.trigger();
    let result = timeout(Duration::from_secs(5), server.handle).await.unwrap();
    assert!(result.unwrap().is_ok());

    // The aborted handler dropped the socket without answering.
    let mut out = Vec::new();
    let _ = stalled.read_to_end(&mut out).await;
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_connection_over_in_memory_stream() {
    let root = common::docroot();
    let (mut client, server) = tokio::io::duplex(1024);

    let conn = Connection::new(server, common::dispatcher(root.path()));
    let task = tokio::spawn(conn.run());

    client.write_all(b"HEAD /index.html HTTP/1.0\r\n\r\n").await.unwrap();
    let mut out = String::new();
    client.read_to_string(&mut out).await.unwrap();
    task.await.unwrap().unwrap();

    assert!(out.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(!out.contains("Content-Length"));
    assert!(out.ends_with("\r\n\r\n"));
}
