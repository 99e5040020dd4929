//! Content digests.

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Read buffer size used when hashing files and streams.
const CHUNK_SIZE: usize = 1024 * 1024;

/// A SHA256 digest (64 lowercase hex characters).
///
/// Every content hash in wheelhouse (local files, fetched remote assets,
/// extracted metadata records) is carried as this type, so two digests
/// compare equal exactly when the underlying bytes were identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Digest of an in-memory buffer.
    pub fn compute(data: &[u8]) -> Self {
        Self::from_hasher(Sha256::new_with_prefix(data))
    }

    /// Digest of everything readable from `reader`, consumed in 1 MiB chunks.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by the reader.
    pub fn compute_reader<R: Read>(mut reader: R) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self::from_hasher(hasher))
    }

    /// Digest of a file on disk, streamed rather than read whole.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or read.
    pub fn compute_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::compute_reader(file)
    }

    /// Finish an incremental hasher into a digest.
    pub fn from_hasher(hasher: Sha256) -> Self {
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `sha256=<hex>` form used by index integrity attributes.
    pub fn integrity(&self) -> String {
        format!("sha256={}", self.0)
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
