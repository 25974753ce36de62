//! Serving handlers through the axum router.

use axum::{Router, body::Body};
use bytes::Bytes;
use etagology::{
    HandlerExt, ResponseSink, handler_fn,
    server::{HandlerRouter, Server, ServerOptions},
};
use http::{HeaderValue, Method, StatusCode, header};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

const HELLO_ETAG: &str = "\"aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d\"";

fn router(options: ServerOptions) -> Router {
    let handler = handler_fn(|request: http::Request<Bytes>, sink: &mut dyn ResponseSink| {
        sink.headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        match request.uri().path() {
            "/hello" => sink.write_all(b"hello"),
            "/echo" => {
                sink.set_status(StatusCode::CREATED);
                sink.write_all(request.body())
            }
            "/stream" => {
                etagology::disable(&request);

                sink.write_all(b"stream-chunk-1")?;
                sink.flush()?;
                sink.write_all(b"stream-chunk-2")
            }
            _ => Err(std::io::Error::other("no such page")),
        }
    })
    .with_etag();

    HandlerRouter::new(handler, options).into()
}

fn request(
    method: Method,
    uri: &str,
    if_none_match: Option<&str>,
    body: Body,
) -> http::Request<Body> {
    let mut builder = http::Request::builder().method(method).uri(uri);

    if let Some(if_none_match) = if_none_match {
        builder = builder.header(header::IF_NONE_MATCH, if_none_match);
    }

    builder.body(body).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_response_gets_an_etag() {
    let response = router(ServerOptions::default())
        .oneshot(request(Method::GET, "/hello", None, Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ETAG], HELLO_ETAG);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(body_bytes(response).await, "hello");
}

#[tokio::test]
async fn test_matching_token_gets_not_modified() {
    let response = router(ServerOptions::default())
        .oneshot(request(
            Method::GET,
            "/hello",
            Some(HELLO_ETAG),
            Body::empty(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(response.headers().get(header::ETAG), None);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_post_with_matching_token_gets_the_body() {
    let response = router(ServerOptions::default())
        .oneshot(request(
            Method::POST,
            "/echo",
            Some(HELLO_ETAG),
            Body::from("hello"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()[header::ETAG], HELLO_ETAG);
    assert_eq!(body_bytes(response).await, "hello");
}

#[tokio::test]
async fn test_streamed_response_has_no_etag() {
    let response = router(ServerOptions::default())
        .oneshot(request(Method::GET, "/stream", None, Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(header::ETAG), None);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(
        body_bytes(response).await,
        "stream-chunk-1stream-chunk-2"
    );
}

#[tokio::test]
async fn test_handler_failure_gets_internal_server_error() {
    let response = router(ServerOptions::default())
        .oneshot(request(Method::GET, "/missing", None, Body::empty()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_oversized_request_body_is_rejected() {
    let options = ServerOptions {
        max_request_body_size: 4,
        ..Default::default()
    };

    let response = router(options)
        .oneshot(request(
            Method::POST,
            "/echo",
            None,
            Body::from("way too large"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

async fn raw_get(
    addr: std::net::SocketAddr,
    path: &str,
    if_none_match: Option<&str>,
) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let mut request =
        format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n");

    if let Some(if_none_match) = if_none_match {
        request.push_str(&format!("If-None-Match: {if_none_match}\r\n"));
    }

    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    response
}

#[tokio::test]
async fn test_server_serves_until_shutdown() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server = Server::builder(listener)
        .with_options(ServerOptions::default())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        })
        .build();
    let serving = tokio::spawn(server.serve_with_router(router(ServerOptions::default())));

    let response = raw_get(addr, "/hello", None).await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(
        response.contains(&format!("etag: {HELLO_ETAG}\r\n")),
        "{response}"
    );
    assert!(response.contains("hello"), "{response}");

    let response = raw_get(addr, "/hello", Some(HELLO_ETAG)).await;

    assert!(
        response.starts_with("HTTP/1.1 304 Not Modified\r\n"),
        "{response}"
    );
    assert!(!response.contains("etag:"), "{response}");

    shutdown_tx.send(()).unwrap();
    serving.await.unwrap().unwrap();
}
