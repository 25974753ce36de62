//! Response body buffering.

use bytes::{Bytes, BytesMut};

/// An append-only, in-memory store for response body bytes.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    bytes: BytesMut,
}

impl ResponseBuffer {
    /// Create a new, empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes at the end of the buffer.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// The number of buffered bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// All the buffered bytes, in write order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take all the buffered bytes out, leaving the buffer empty.
    pub fn take(&mut self) -> Bytes {
        self.bytes.split().freeze()
    }
}

impl std::io::Write for ResponseBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.extend(buf);

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_write_order() {
        let mut buffer = ResponseBuffer::new();
        buffer.extend(b"foo");
        buffer.extend(b"");
        buffer.extend(b"bar");

        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.as_bytes(), b"foobar");
    }

    #[test]
    fn test_take_empties_the_buffer() {
        let mut buffer = ResponseBuffer::new();
        buffer.extend(b"foo");

        assert_eq!(buffer.take(), Bytes::from_static(b"foo"));
        assert!(buffer.is_empty());
        assert!(buffer.take().is_empty());
    }
}
