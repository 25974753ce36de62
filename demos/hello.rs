//! Run with
//!
//! ```not_rust
//! cargo run --example hello --features examples
//! ```
//!
//! Then:
//!
//! ```not_rust
//! curl -i http://127.0.0.1:3000/
//! curl -i -H 'If-None-Match: "<etag from above>"' http://127.0.0.1:3000/
//! curl -N http://127.0.0.1:3000/stream
//! ```

use std::{io, thread, time::Duration};

use bytes::Bytes;
use etagology::{HandlerExt, ResponseSink, handler_fn, server::Server};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    info!("Starting example `{}`...", env!("CARGO_BIN_NAME"));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    let server = Server::builder(listener)
        .with_options_from_env()?
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to register for `ctrl-c` signal: {err}");
            }
        })
        .build();

    let handler = handler_fn(|request: http::Request<Bytes>, sink: &mut dyn ResponseSink| {
        sink.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("text/plain; charset=utf-8"),
        );

        if request.uri().path() != "/stream" {
            return sink.write_all(b"Hello, World!\n");
        }

        // Streamed responses can't be hashed before they are sent.
        etagology::disable(&request);

        for i in 1..=5 {
            sink.write_all(format!("tick {i}\n").as_bytes())?;
            sink.flush()?;

            thread::sleep(Duration::from_millis(500));
        }

        Ok::<(), io::Error>(())
    })
    .with_etag();

    server.serve(handler).await.map_err(Into::into)
}
