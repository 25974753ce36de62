//! The response-writing contract.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use tracing::warn;

/// A destination for an HTTP response, written to incrementally.
///
/// This is the capability set handlers are given to produce their response: a header map, a
/// status setter, a byte writer and an optional flush.
///
/// Headers must be set before the first body write or flush: implementations that talk to a real
/// transport commit the status and headers at that point.
pub trait ResponseSink {
    /// The response headers.
    fn headers(&self) -> &HeaderMap;

    /// The response headers, for modification.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Set the response status.
    ///
    /// If never called, the response status is `200 OK`.
    fn set_status(&mut self, status: StatusCode);

    /// Write body bytes, returning how many bytes were consumed.
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize>;

    /// Whether the sink supports incremental flushing.
    fn supports_flush(&self) -> bool {
        false
    }

    /// Flush whatever was written so far to the client.
    ///
    /// Sinks that do not support flushing ignore this call.
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    /// Write all the bytes in `buf`.
    ///
    /// Unlike [`std::io::Write::write_all`], a partial write is not retried: it fails with
    /// [`std::io::ErrorKind::WriteZero`].
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        let written = self.write(buf)?;

        check_write_len(written, buf.len()).map(|_| ())
    }
}

/// Write `buf` to an [`std::io::Write`] in a single call, failing on a short write.
pub(crate) fn write_fully(
    writer: &mut impl std::io::Write,
    buf: &[u8],
) -> std::io::Result<usize> {
    let written = writer.write(buf)?;

    check_write_len(written, buf.len())
}

fn check_write_len(written: usize, expected: usize) -> std::io::Result<usize> {
    if written != expected {
        return Err(std::io::Error::new(
            std::io::ErrorKind::WriteZero,
            format!("short write: {written} of {expected} byte(s) written"),
        ));
    }

    Ok(written)
}

/// A call received by a [`ResponseRecorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// A status was set.
    Status(StatusCode),

    /// Body bytes were written.
    Body(Bytes),

    /// The sink was flushed.
    Flush,
}

/// An in-memory response sink that records everything written to it.
///
/// The recorder behaves like a real transport: the status is committed by the first status call,
/// body write or flush, and later status calls are ignored.
#[derive(Debug)]
pub struct ResponseRecorder {
    headers: HeaderMap,
    status: Option<StatusCode>,
    body: BytesMut,
    events: Vec<SinkEvent>,
    flushable: bool,
}

impl Default for ResponseRecorder {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            status: None,
            body: BytesMut::new(),
            events: Vec::new(),
            flushable: true,
        }
    }
}

impl ResponseRecorder {
    /// Create a new recorder that supports flushing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new recorder that does not support flushing.
    pub fn without_flush() -> Self {
        Self {
            flushable: false,
            ..Default::default()
        }
    }

    /// The committed status, `200 OK` if none was set.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// The body written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Every call received, in order.
    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    /// Turn the recording into an HTTP response.
    pub fn into_response(self) -> http::Response<Bytes> {
        let status = self.status();
        let mut response = http::Response::new(self.body.freeze());
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;

        response
    }

    fn commit(&mut self) {
        self.status.get_or_insert(StatusCode::OK);
    }
}

impl ResponseSink for ResponseRecorder {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn set_status(&mut self, status: StatusCode) {
        self.events.push(SinkEvent::Status(status));

        match self.status {
            Some(committed) => {
                warn!("Ignoring superfluous status `{status}`: `{committed}` was already committed.");
            }
            None => self.status = Some(status),
        }
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.commit();
        self.events.push(SinkEvent::Body(Bytes::copy_from_slice(buf)));
        self.body.extend_from_slice(buf);

        Ok(buf.len())
    }

    fn supports_flush(&self) -> bool {
        self.flushable
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if self.flushable {
            self.commit();
            self.events.push(SinkEvent::Flush);
        }

        Ok(())
    }
}
