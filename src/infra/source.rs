//! Filesystem content source.

use std::io;
use std::path::{Path, PathBuf};

use async_stream::try_stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncReadExt;

/// Bounded-memory byte stream over a source file's content.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

const READ_CHUNK_BYTES: usize = 64 * 1024;

/// Errors opening a content source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source file not found: {0}")]
    NotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Where asset bytes come from.
///
/// Production uses [`FsContentSource`]; tests may substitute their own.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Whether the path currently exists and is a regular file candidate.
    async fn exists(&self, path: &Path) -> bool;

    /// Open the path for reading as a stream of bounded-size chunks.
    async fn open(&self, path: &Path) -> Result<ByteStream, SourceError>;

    /// Map a catalog path to the absolute path hashing should read.
    fn resolve(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }
}

/// Local-filesystem content source rooted at the configured media directory.
///
/// Relative paths are resolved against the root; absolute paths are used
/// verbatim (the asset catalog may reference either).
#[derive(Debug)]
pub struct FsContentSource {
    root: PathBuf,
}

impl FsContentSource {
    /// Initialise the source, creating the media root if it does not exist.
    pub fn new(root: PathBuf) -> Result<Self, io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The configured media root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ContentSource for FsContentSource {
    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(self.resolve(path)).await.unwrap_or(false)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    async fn open(&self, path: &Path) -> Result<ByteStream, SourceError> {
        let absolute = self.resolve(path);
        let file = match fs::File::open(&absolute).await {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(absolute));
            }
            Err(err) => return Err(SourceError::Io(err)),
        };

        let stream = try_stream! {
            let mut file = file;
            let mut buffer = vec![0u8; READ_CHUNK_BYTES];
            loop {
                let read = file.read(&mut buffer).await?;
                if read == 0 {
                    break;
                }
                yield Bytes::copy_from_slice(&buffer[..read]);
            }
        };

        Ok(Box::pin(stream))
    }
}
