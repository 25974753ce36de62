//! Serving handlers over HTTP.

use std::{future::Future, pin::Pin};

mod handler_router;
mod options;

use axum::Router;
use bytes::Bytes;
pub use handler_router::HandlerRouter;
pub use options::{ServerOptions, ServerOptionsFromEnvError};

use crate::Handler;

type ShutdownSignal = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A server that runs a [`Handler`] for every request it receives on its listener.
///
/// Without a shutdown signal, the server runs until its listener fails.
pub struct Server {
    listener: tokio::net::TcpListener,
    shutdown: Option<ShutdownSignal>,
    options: ServerOptions,
}

/// Configures a [`Server`] before it starts.
pub struct ServerBuilder(Server);

/// An error that can occur while serving.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Accepting or serving connections failed.
    #[error("failed to serve: {0}")]
    Io(#[from] std::io::Error),

    /// The listener has no usable local address.
    #[error("failed to get the listener address: {0}")]
    LocalAddr(std::io::Error),
}

impl ServerBuilder {
    /// Use the specified options instead of the defaults.
    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.0.options = options;
        self
    }

    /// Read the options from the `ETAGOLOGY_*` environment variables.
    pub fn with_options_from_env(self) -> Result<Self, ServerOptionsFromEnvError> {
        Ok(self.with_options(ServerOptions::from_env()?))
    }

    /// Stop accepting connections once `signal` completes, and let in-flight responses finish.
    pub fn with_graceful_shutdown(
        mut self,
        signal: impl Future<Output = ()> + Send + 'static,
    ) -> Self {
        self.0.shutdown = Some(Box::pin(signal));
        self
    }

    /// Build the server.
    pub fn build(self) -> Server {
        self.0
    }
}

impl Server {
    /// Get a builder for a server accepting connections on `listener`.
    pub fn builder(listener: tokio::net::TcpListener) -> ServerBuilder {
        ServerBuilder(Self {
            listener,
            shutdown: None,
            options: ServerOptions::default(),
        })
    }

    /// Serve the specified handler.
    ///
    /// The handler is served as-is: wrap it with [`crate::HandlerExt::with_etag`] to get ETags.
    pub async fn serve<H>(self, handler: H) -> Result<(), ServeError>
    where
        H: Handler<Bytes> + Send + Sync + 'static,
    {
        let router = HandlerRouter::new(handler, self.options.clone());

        self.serve_with_router(router).await
    }

    /// Serve the specified router.
    ///
    /// Use this to add routes or layers around a [`HandlerRouter`].
    pub async fn serve_with_router(self, router: impl Into<Router>) -> Result<(), ServeError> {
        let local_addr = self.listener.local_addr().map_err(ServeError::LocalAddr)?;

        tracing::info!(
            "Etagology server listening on TCP/{local_addr} (request bodies up to {} byte(s), {} pending chunk(s) per response).",
            self.options.max_request_body_size,
            self.options.stream_capacity
        );

        let serve = axum::serve(self.listener, router.into());

        match self.shutdown {
            Some(signal) => serve.with_graceful_shutdown(signal).await,
            None => serve.await,
        }?;

        tracing::info!("Etagology server on TCP/{local_addr} stopped.");

        Ok(())
    }
}
