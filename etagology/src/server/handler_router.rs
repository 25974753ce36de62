use std::sync::Arc;

use axum::{Router, body::Body, response::IntoResponse};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

use super::ServerOptions;
use crate::{Handler, ResponseSink};

/// A router that runs a [`Handler`] for every request.
#[derive(Debug, Clone, Default)]
pub struct HandlerRouter(Router);

impl HandlerRouter {
    /// Create a new router from a handler.
    ///
    /// The handler is given the whole request body, and runs on the blocking thread pool: it may
    /// block while it writes its response. Whatever it writes is streamed to the client.
    pub fn new<H>(handler: H, options: ServerOptions) -> Self
    where
        H: Handler<Bytes> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let options = Arc::new(options);

        let router = Router::new().fallback(move |request: axum::extract::Request| {
            let handler = handler.clone();
            let options = options.clone();

            async move { serve_request(handler, options, request).await }
        });

        Self(router)
    }
}

impl From<HandlerRouter> for Router {
    fn from(handler_router: HandlerRouter) -> Self {
        handler_router.0
    }
}

async fn serve_request<H>(
    handler: Arc<H>,
    options: Arc<ServerOptions>,
    request: axum::extract::Request,
) -> axum::response::Response
where
    H: Handler<Bytes> + Send + Sync + 'static,
{
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, options.max_request_body_size).await {
        Ok(body) => body,
        Err(err) => {
            warn!("Failed to read request body: {err}");

            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let request = http::Request::from_parts(parts, body);
    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(options.stream_capacity.max(1));

    tokio::task::spawn_blocking(move || {
        let mut sink = StreamingSink::new(head_tx, body_tx);

        match handler.serve(request, &mut sink) {
            Ok(()) => sink.commit(),
            Err(err) => {
                error!("Handler failed: {err}");

                sink.abort(err);
            }
        }
    });

    let (status, headers) = match head_rx.await {
        Ok(head) => head,
        Err(_) => {
            error!("Handler stopped before sending a response.");

            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let chunks = futures_util::stream::unfold(body_rx, |mut body_rx| async move {
        body_rx.recv().await.map(|chunk| (chunk, body_rx))
    });

    let mut response = axum::response::Response::new(Body::from_stream(chunks));
    *response.status_mut() = status;
    *response.headers_mut() = headers;

    response
}

/// A sink that streams a response to an axum body.
///
/// The status and headers are sent on the first body write or flush. After that, status and
/// header changes are ignored.
struct StreamingSink {
    headers: HeaderMap,
    status: Option<StatusCode>,
    head: Option<oneshot::Sender<(StatusCode, HeaderMap)>>,
    body: mpsc::Sender<std::io::Result<Bytes>>,
}

impl StreamingSink {
    fn new(
        head: oneshot::Sender<(StatusCode, HeaderMap)>,
        body: mpsc::Sender<std::io::Result<Bytes>>,
    ) -> Self {
        Self {
            headers: HeaderMap::new(),
            status: None,
            head: Some(head),
            body,
        }
    }

    /// Send the status and headers, unless they were already sent.
    fn commit(&mut self) {
        if let Some(head) = self.head.take() {
            let status = self.status.unwrap_or(StatusCode::OK);

            // The receiver only goes away with the client.
            let _ = head.send((status, self.headers.clone()));
        }
    }

    /// End the response with an error.
    ///
    /// Without a committed head, the client gets a `500 Internal Server Error`. Otherwise the body
    /// is cut short.
    fn abort(mut self, err: std::io::Error) {
        if self.head.take().is_none() {
            let _ = self.body.blocking_send(Err(err));
        }
    }
}

impl ResponseSink for StreamingSink {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn set_status(&mut self, status: StatusCode) {
        if self.head.is_none() {
            warn!("Ignoring status `{status}` set after the response head was sent.");

            return;
        }

        self.status = Some(status);
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.commit();

        self.body
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "client stopped receiving the response",
                )
            })?;

        Ok(buf.len())
    }

    fn supports_flush(&self) -> bool {
        true
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.commit();

        Ok(())
    }
}
