//! Streaming content digests for change detection.

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::domain::ContentDigest;

/// Chunk size for folding file content into the digest. Bounded memory
/// regardless of file size.
const DIGEST_CHUNK_BYTES: usize = 64 * 1024;

/// Result of digesting a path.
///
/// A missing or unreadable file is a normal outcome, not an error; only an
/// I/O failure mid-read surfaces as [`DigestError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestOutcome {
    Found(ContentDigest),
    NotFound,
}

/// I/O failure while hashing an existing, readable file.
#[derive(Debug, Error)]
#[error("digest computation failed for {path}: {source}")]
pub struct DigestError {
    pub path: PathBuf,
    #[source]
    source: io::Error,
}

/// Compute the SHA-256 digest of a file's full byte content, reading in
/// bounded-size chunks.
///
/// SHA-256 is overkill for a change detector, but it is the checksum
/// primitive already used for stored content elsewhere in the stack.
pub async fn compute_digest(path: &Path) -> Result<DigestOutcome, DigestError> {
    let mut file = match fs::File::open(path).await {
        Ok(file) => file,
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
            ) =>
        {
            return Ok(DigestOutcome::NotFound);
        }
        Err(err) => {
            return Err(DigestError {
                path: path.to_path_buf(),
                source: err,
            });
        }
    };

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; DIGEST_CHUNK_BYTES];
    loop {
        let read = file.read(&mut buffer).await.map_err(|source| DigestError {
            path: path.to_path_buf(),
            source,
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(DigestOutcome::Found(ContentDigest::from_hex(hex::encode(
        hasher.finalize(),
    ))))
}
