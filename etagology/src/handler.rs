//! Handlers and the ETag middleware.

use tracing::debug;

use crate::{DisableEtag, ResponseSink, decision, writer::EtagWriter};

/// A request handler that writes its response to a [`ResponseSink`].
///
/// The handler is called exactly once per request.
pub trait Handler<B> {
    /// Handle the request, writing the response to the sink.
    fn serve(
        &self,
        request: http::Request<B>,
        sink: &mut dyn ResponseSink,
    ) -> std::io::Result<()>;
}

/// A [`Handler`] built from a closure.
///
/// See [`handler_fn`].
#[derive(Debug, Clone, Copy)]
pub struct HandlerFn<F> {
    f: F,
}

/// Turn a closure into a [`Handler`].
///
/// # Example
///
/// ```rust
/// use etagology::{HandlerExt, ResponseSink, handler_fn};
///
/// let handler = handler_fn(|_request: http::Request<()>, sink: &mut dyn ResponseSink| {
///     sink.write_all(b"hello")
/// })
/// .with_etag();
/// ```
pub fn handler_fn<B, F>(f: F) -> HandlerFn<F>
where
    F: Fn(http::Request<B>, &mut dyn ResponseSink) -> std::io::Result<()>,
{
    HandlerFn { f }
}

impl<B, F> Handler<B> for HandlerFn<F>
where
    F: Fn(http::Request<B>, &mut dyn ResponseSink) -> std::io::Result<()>,
{
    fn serve(
        &self,
        request: http::Request<B>,
        sink: &mut dyn ResponseSink,
    ) -> std::io::Result<()> {
        (self.f)(request, sink)
    }
}

/// A handler that adds a content-derived ETag to the responses of another handler.
///
/// The wrapped handler's response is buffered and hashed. Once it returns, the response is sent
/// with an `ETag` header, unless the handler set one itself. If the request is a `GET` or `HEAD`
/// whose `If-None-Match` matches the ETag, and the response is successful, a bodiless
/// `304 Not Modified` is sent instead.
///
/// Handlers that stream their response can opt out through [`crate::disable()`]. Flushing the
/// sink opts out as well.
#[derive(Debug, Clone)]
pub struct Etag<H> {
    handler: H,
}

impl<H> Etag<H> {
    /// Wrap the specified handler.
    pub fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<B, H: Handler<B>> Handler<B> for Etag<H> {
    fn serve(
        &self,
        mut request: http::Request<B>,
        sink: &mut dyn ResponseSink,
    ) -> std::io::Result<()> {
        let method = request.method().clone();
        let if_none_match = decision::if_none_match(request.headers()).cloned();

        let mut writer = EtagWriter::new(sink);
        let handle = match DisableEtag::from_request(&request) {
            Some(outer) => writer.disable_handle().within(outer.clone()),
            None => writer.disable_handle(),
        };
        request.extensions_mut().insert(handle);

        self.handler.serve(request, &mut writer)?;

        let outcome = writer.finish(&method, if_none_match.as_ref())?;

        debug!("ETag processing done for `{method}` request: {outcome}.");

        Ok(())
    }
}

/// An extension trait that wraps handlers in the ETag middleware.
pub trait HandlerExt<B>: Handler<B> {
    /// Add content-derived ETags to the responses of this handler.
    fn with_etag(self) -> Etag<Self>
    where
        Self: Sized;
}

impl<B, H: Handler<B>> HandlerExt<B> for H {
    fn with_etag(self) -> Etag<Self> {
        Etag::new(self)
    }
}
