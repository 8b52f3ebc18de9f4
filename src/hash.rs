//! Content hashing shared by the committer and the existing-file scanner.
//!
//! Both sides must agree on the digest, so all hashing goes through this
//! module: SHA-256 over the full byte stream, rendered as lowercase hex.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Read size used when hashing files already on disk (1 MiB).
pub const HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// Hex-encoded SHA-256 digest of a resource's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hashes an in-memory buffer.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = ContentHasher::new();
        hasher.update(bytes);
        hasher.finalize()
    }

    /// Hashes a file by streaming it in [`HASH_CHUNK_SIZE`] chunks.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if the file cannot be opened or read.
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut hasher = ContentHasher::new();
        let mut buffer = vec![0_u8; HASH_CHUNK_SIZE];
        loop {
            let read = file.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(hasher.finalize())
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental hasher for streamed downloads.
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
}

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    #[must_use]
    pub fn finalize(self) -> ContentHash {
        ContentHash(format!("{:x}", self.inner.finalize()))
    }
}
