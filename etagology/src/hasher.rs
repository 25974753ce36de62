//! Incremental content hashing.

use sha1::{Digest, Sha1};

/// The length, in bytes, of a content digest.
pub const DIGEST_LEN: usize = 20;

/// A streaming SHA-1 accumulator over a response body.
///
/// Bytes are consumed as they are written and never retained: only the digest state and a byte
/// count are kept around.
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    hasher: Sha1,
    len: u64,
}

impl ContentHasher {
    /// Create a new, empty hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes to the hasher.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.len += chunk.len() as u64;
    }

    /// The number of bytes consumed so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether no bytes were consumed yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the digest of everything consumed so far.
    ///
    /// This is a snapshot: the hasher can keep accepting bytes afterwards.
    pub fn digest(&self) -> [u8; DIGEST_LEN] {
        self.hasher.clone().finalize().into()
    }

    /// Get the entity-tag for everything consumed so far.
    ///
    /// The tag is the lowercase hexadecimal digest, wrapped in double quotes.
    pub fn etag(&self) -> String {
        format!("\"{}\"", hex::encode(self.digest()))
    }
}

impl std::io::Write for ContentHasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);

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
    fn test_empty_digest() {
        let hasher = ContentHasher::new();

        assert!(hasher.is_empty());
        assert_eq!(
            hasher.etag(),
            "\"da39a3ee5e6b4b0d3255bfef95601890afd80709\""
        );
    }

    #[test]
    fn test_chunked_updates_match_single_update() {
        let mut chunked = ContentHasher::new();
        chunked.update(b"hel");
        chunked.update(b"");
        chunked.update(b"lo");

        let mut single = ContentHasher::new();
        single.update(b"hello");

        assert_eq!(chunked.digest(), single.digest());
        assert_eq!(chunked.len(), 5);
        assert_eq!(
            chunked.etag(),
            "\"aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d\""
        );
    }

    #[test]
    fn test_digest_is_a_snapshot() {
        let mut hasher = ContentHasher::new();
        hasher.update(b"hello");

        let before = hasher.digest();
        assert_eq!(before, hasher.digest());

        hasher.update(b" world");
        assert_ne!(before, hasher.digest());
    }
}
