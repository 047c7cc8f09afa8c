//! Connection lifecycle tests over in-memory transports

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use frog::client::engine::read_response;
use frog::http::connection::{Connection, Timeouts};
use frog::http::request::Request;
use frog::http::response::Response;
use frog::server::router::{Handler, RouteBuilder, RouteTable};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Response, &Request) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn routes() -> Arc<RouteTable> {
    let mut builder = RouteBuilder::new();
    builder.add(
        "^/id/([0-9]+)$",
        "GET",
        handler(|response, request| {
            response.ok(request.capture(1).unwrap_or_default());
            Ok(())
        }),
    );
    builder.add(
        "^/string$",
        "POST",
        handler(|response, request| {
            response.ok(&request.content);
            Ok(())
        }),
    );
    builder.add(
        "^/fail$",
        "GET",
        handler(|response, _| {
            response.ok("partial");
            anyhow::bail!("handler exploded")
        }),
    );
    builder.add(
        "^/silent$",
        "GET",
        handler(|_, _| Ok(())),
    );
    builder.add(
        "^/slow$",
        "GET",
        handler(|response, _| {
            std::thread::sleep(Duration::from_millis(1500));
            response.ok("late");
            Ok(())
        }),
    );
    Arc::new(builder.compile().unwrap())
}

fn spawn_connection(timeouts: Timeouts) -> (DuplexStream, JoinHandle<anyhow::Result<()>>) {
    let (client, server) = tokio::io::duplex(1024);
    let task = tokio::spawn(async move {
        let mut conn = Connection::new(server, routes(), timeouts);
        conn.run().await
    });
    (client, task)
}

async fn read_to_end(stream: &mut DuplexStream) -> Vec<u8> {
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    out
}

#[tokio::test]
async fn test_keep_alive_serves_sequential_requests() {
    let (mut client, task) = spawn_connection(Timeouts::default());
    let mut buf = BytesMut::new();

    client.write_all(b"GET /id/12358 HTTP/1.1\r\n\r\n").await.unwrap();
    let first = read_response(&mut client, &mut buf).await.unwrap();
    assert_eq!(first.status_code, "200 OK");
    assert_eq!(first.text(), "12358");

    client.write_all(b"GET /id/42 HTTP/1.1\r\n\r\n").await.unwrap();
    let second = read_response(&mut client, &mut buf).await.unwrap();
    assert_eq!(second.text(), "42");

    drop(client);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_http_1_0_closes_after_response() {
    let (mut client, task) = spawn_connection(Timeouts::default());

    client.write_all(b"GET /id/7 HTTP/1.0\r\n\r\n").await.unwrap();
    let raw = read_to_end(&mut client).await;

    assert_eq!(raw, b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\n7".to_vec());
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_pipelined_requests_answered_in_order() {
    let (mut client, task) = spawn_connection(Timeouts::default());
    let mut buf = BytesMut::new();

    client
        .write_all(b"POST /string HTTP/1.1\r\nContent-Length: 5\r\n\r\nfirstGET /id/2 HTTP/1.0\r\n\r\n")
        .await
        .unwrap();

    let first = read_response(&mut client, &mut buf).await.unwrap();
    let second = read_response(&mut client, &mut buf).await.unwrap();
    assert_eq!(first.text(), "first");
    assert_eq!(second.text(), "2");

    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_chunked_request_body() {
    let (mut client, task) = spawn_connection(Timeouts::default());

    client
        .write_all(b"POST /string HTTP/1.0\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nfro\r\n1\r\ng\r\n0\r\n\r\n")
        .await
        .unwrap();
    let raw = read_to_end(&mut client).await;

    assert!(raw.ends_with(b"Content-Length: 4\r\n\r\nfrog"));
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_unmatched_request_gets_no_response() {
    let (mut client, task) = spawn_connection(Timeouts::default());

    client.write_all(b"DELETE /id/1 HTTP/1.0\r\n\r\n").await.unwrap();

    assert!(read_to_end(&mut client).await.is_empty());
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_unmatched_request_keeps_1_1_connection() {
    let (mut client, task) = spawn_connection(Timeouts::default());
    let mut buf = BytesMut::new();

    client.write_all(b"DELETE /id/1 HTTP/1.1\r\n\r\n").await.unwrap();
    client.write_all(b"GET /id/5 HTTP/1.1\r\n\r\n").await.unwrap();

    let response = read_response(&mut client, &mut buf).await.unwrap();
    assert_eq!(response.text(), "5");

    drop(client);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_handler_writing_nothing_keeps_connection() {
    let (mut client, task) = spawn_connection(Timeouts::default());
    let mut buf = BytesMut::new();

    client.write_all(b"GET /silent HTTP/1.1\r\n\r\nGET /id/9 HTTP/1.1\r\n\r\n").await.unwrap();

    let response = read_response(&mut client, &mut buf).await.unwrap();
    assert_eq!(response.text(), "9");

    drop(client);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_handler_error_abandons_connection() {
    let (mut client, task) = spawn_connection(Timeouts::default());

    client.write_all(b"GET /fail HTTP/1.1\r\n\r\n").await.unwrap();

    assert!(read_to_end(&mut client).await.is_empty());
    let err = task.await.unwrap().unwrap_err();
    assert!(format!("{err:#}").contains("handler exploded"));
}

#[tokio::test]
async fn test_invalid_content_length_abandons_connection() {
    let (mut client, task) = spawn_connection(Timeouts::default());

    client
        .write_all(b"POST /string HTTP/1.1\r\nContent-Length: abc\r\n\r\n")
        .await
        .unwrap();

    assert!(read_to_end(&mut client).await.is_empty());
    assert!(task.await.unwrap().is_err());
}

#[tokio::test]
async fn test_start_line_without_protocol_is_not_framed() {
    let (mut client, task) = spawn_connection(Timeouts::default());

    // Dropped headers mean the body is never read or routed.
    client
        .write_all(b"POST /string\r\nContent-Length: 3\r\n\r\nabc")
        .await
        .unwrap();

    assert!(read_to_end(&mut client).await.is_empty());
    assert!(task.await.unwrap().is_err());
}

#[tokio::test]
async fn test_invalid_version_closes_after_response() {
    let (mut client, task) = spawn_connection(Timeouts::default());

    client.write_all(b"GET /id/3 HTTP/x.y\r\n\r\n").await.unwrap();
    let raw = read_to_end(&mut client).await;

    assert!(raw.ends_with(b"\r\n\r\n3"));
    assert!(task.await.unwrap().is_err());
}

#[tokio::test]
async fn test_request_timeout_closes_idle_connection() {
    let timeouts = Timeouts {
        request: Some(Duration::from_millis(200)),
        content: None,
    };
    let (mut client, task) = spawn_connection(timeouts);

    let raw = tokio::time::timeout(Duration::from_secs(5), read_to_end(&mut client))
        .await
        .expect("connection should be closed by its request timer");
    assert!(raw.is_empty());

    let err = task.await.unwrap().unwrap_err();
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_content_timeout_on_partial_body() {
    let timeouts = Timeouts {
        request: None,
        content: Some(Duration::from_millis(200)),
    };
    let (mut client, task) = spawn_connection(timeouts);

    client
        .write_all(b"POST /string HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc")
        .await
        .unwrap();

    let raw = tokio::time::timeout(Duration::from_secs(5), read_to_end(&mut client))
        .await
        .unwrap();
    assert!(raw.is_empty());
    assert!(task.await.unwrap().unwrap_err().to_string().contains("request body timed out"));
}

#[tokio::test]
async fn test_content_timeout_covers_slow_handler() {
    let timeouts = Timeouts {
        request: None,
        content: Some(Duration::from_millis(200)),
    };
    let (mut client, task) = spawn_connection(timeouts);

    client.write_all(b"GET /slow HTTP/1.1\r\n\r\n").await.unwrap();

    assert!(read_to_end(&mut client).await.is_empty());
    assert!(task.await.unwrap().unwrap_err().to_string().contains("response timed out"));
}

#[tokio::test]
async fn test_completed_phases_cancel_their_timers() {
    let timeouts = Timeouts {
        request: Some(Duration::from_millis(600)),
        content: Some(Duration::from_millis(150)),
    };
    let (mut client, task) = spawn_connection(timeouts);
    let mut buf = BytesMut::new();

    client
        .write_all(b"POST /string HTTP/1.1\r\nContent-Length: 2\r\n\r\nok")
        .await
        .unwrap();
    let response = read_response(&mut client, &mut buf).await.unwrap();
    assert_eq!(response.text(), "ok");

    // The content deadline has passed; only the fresh request timer applies.
    tokio::time::sleep(Duration::from_millis(300)).await;
    client.write_all(b"GET /id/1 HTTP/1.0\r\n\r\n").await.unwrap();
    let raw = read_to_end(&mut client).await;
    assert!(raw.ends_with(b"\r\n\r\n1"));

    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_handler_sees_peerless_request() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();

    let mut builder = RouteBuilder::new();
    builder.add(
        "^/peer$",
        "GET",
        handler(move |response, request| {
            assert!(request.remote_addr.is_none());
            counter.fetch_add(1, Ordering::SeqCst);
            response.ok("");
            Ok(())
        }),
    );
    let routes = Arc::new(builder.compile().unwrap());

    let (mut client, server) = tokio::io::duplex(1024);
    let task = tokio::spawn(async move {
        let mut conn = Connection::new(server, routes, Timeouts::default());
        assert!(conn.peer().is_none());
        conn.run().await
    });

    client.write_all(b"GET /peer HTTP/1.0\r\n\r\n").await.unwrap();
    read_to_end(&mut client).await;

    task.await.unwrap().unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
