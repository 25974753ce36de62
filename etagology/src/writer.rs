//! The intercepting response writer.

use http::{HeaderMap, HeaderValue, Method, StatusCode};
use tracing::{debug, trace};

use crate::{
    buffer::ResponseBuffer,
    decision::{self, Outcome, Validator},
    disable::DisableEtag,
    hasher::ContentHasher,
    sink::{ResponseSink, write_fully},
};

/// Whether the writer still intercepts the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Body bytes are buffered and hashed, the status is held back.
    Buffering,

    /// Everything goes straight to the underlying sink.
    Passthrough,
}

/// A response sink that buffers and hashes a response before it reaches the real sink.
///
/// Headers go straight to the real sink's header map. The status and body are held back until
/// [`EtagWriter::finish`] decides whether to send them, or to send a `304 Not Modified` instead.
///
/// Flushing the writer, or disabling it, makes it send what it holds and get out of the way for
/// the rest of the request. There is no way back.
pub struct EtagWriter<'s> {
    inner: &'s mut dyn ResponseSink,
    hasher: ContentHasher,
    buffer: ResponseBuffer,
    status: Option<StatusCode>,
    mode: Mode,
    disable: DisableEtag,
    deferred_error: Option<std::io::Error>,
}

impl std::fmt::Debug for EtagWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtagWriter")
            .field("buffered", &self.buffer.len())
            .field("status", &self.status)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl<'s> EtagWriter<'s> {
    /// Create a new writer in front of the specified sink.
    pub fn new(inner: &'s mut dyn ResponseSink) -> Self {
        Self {
            inner,
            hasher: ContentHasher::new(),
            buffer: ResponseBuffer::new(),
            status: None,
            mode: Mode::Buffering,
            disable: DisableEtag::new(),
            deferred_error: None,
        }
    }

    /// Get the capability that disables this writer.
    pub fn disable_handle(&self) -> DisableEtag {
        self.disable.clone()
    }

    /// Whether the writer stopped intercepting the response.
    pub fn is_passthrough(&self) -> bool {
        self.mode == Mode::Passthrough
    }

    /// Stop intercepting the response.
    ///
    /// The pending status and the buffered body are sent to the real sink right away. Calling
    /// this again does nothing.
    pub fn disable(&mut self) -> std::io::Result<()> {
        self.disable.disable();

        self.enter_passthrough()
    }

    /// Decide what to send to the real sink, now that the handler is done.
    ///
    /// `if_none_match` is the conditional token of the request, if any.
    pub fn finish(
        mut self,
        method: &Method,
        if_none_match: Option<&HeaderValue>,
    ) -> std::io::Result<Outcome> {
        self.apply_disable()?;

        if self.is_passthrough() {
            return Ok(Outcome::Streamed);
        }

        let validator = match decision::explicit_etag(self.inner.headers()) {
            Some(etag) => Validator::Explicit(etag.clone()),
            None => Validator::Derived(HeaderValue::try_from(self.hasher.etag()).map_err(
                |err| std::io::Error::new(std::io::ErrorKind::InvalidData, err),
            )?),
        };

        if decision::is_not_modified(method, if_none_match, self.status, validator.value()) {
            debug!(
                "Client copy of a {}-byte(s) response is current, sending `304 Not Modified`.",
                self.hasher.len()
            );

            self.inner.set_status(StatusCode::NOT_MODIFIED);

            return Ok(Outcome::NotModified);
        }

        if let Validator::Derived(etag) = validator {
            self.inner.headers_mut().insert(http::header::ETAG, etag);
        }

        if let Some(status) = self.status.take() {
            self.inner.set_status(status);
        }

        if !self.buffer.is_empty() {
            let body = self.buffer.take();

            self.inner.write_all(&body)?;
        }

        Ok(Outcome::Emitted)
    }

    /// Enter passthrough mode if the handler asked for it through its [`DisableEtag`].
    ///
    /// Also reports a failed switch that happened in an operation that could not return it.
    fn apply_disable(&mut self) -> std::io::Result<()> {
        if let Some(err) = self.deferred_error.take() {
            return Err(err);
        }

        if self.disable.is_disabled() {
            self.enter_passthrough()
        } else {
            Ok(())
        }
    }

    /// Like [`Self::apply_disable`], for operations that can't fail: the error is kept for the
    /// next write, flush or finish.
    fn apply_disable_deferred(&mut self) {
        if let Err(err) = self.apply_disable() {
            self.deferred_error.get_or_insert(err);
        }
    }

    fn enter_passthrough(&mut self) -> std::io::Result<()> {
        if self.mode == Mode::Passthrough {
            return Ok(());
        }

        self.mode = Mode::Passthrough;

        debug!(
            "Switching to passthrough with {} buffered byte(s).",
            self.buffer.len()
        );

        if let Some(status) = self.status.take() {
            self.inner.set_status(status);
        }

        if !self.buffer.is_empty() {
            let body = self.buffer.take();

            self.inner.write_all(&body)?;
        }

        Ok(())
    }
}

impl ResponseSink for EtagWriter<'_> {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.apply_disable_deferred();

        self.inner.headers_mut()
    }

    fn set_status(&mut self, status: StatusCode) {
        self.apply_disable_deferred();

        match self.mode {
            Mode::Passthrough => self.inner.set_status(status),
            Mode::Buffering => self.status = Some(status),
        }
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.apply_disable()?;

        match self.mode {
            Mode::Passthrough => self.inner.write(buf),
            Mode::Buffering => {
                write_fully(&mut self.buffer, buf)?;
                write_fully(&mut self.hasher, buf)?;

                trace!("Buffered {} byte(s).", buf.len());

                Ok(buf.len())
            }
        }
    }

    fn supports_flush(&self) -> bool {
        self.inner.supports_flush()
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.apply_disable()?;

        if !self.inner.supports_flush() {
            return Ok(());
        }

        self.enter_passthrough()?;

        self.inner.flush()
    }
}
