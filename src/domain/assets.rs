//! Asset identity and the cache-entry invariant.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Caller-chosen stable name for one asset, independent of its filesystem
/// path and of whatever identifier the remote platform issues for it.
///
/// Unique within the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalKey(String);

impl LogicalKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogicalKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Hex-encoded SHA-256 fingerprint of a file's full byte content.
///
/// Used purely for change detection; identical bytes produce identical
/// digests, any byte difference changes the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Wrap an already hex-encoded digest.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reusable handle issued by the remote platform once content has been
/// transmitted. Stored and replayed verbatim, never inspected or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteIdentifier(String);

impl RemoteIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload flavour the remote platform distinguishes between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Document,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Document => f.write_str("document"),
        }
    }
}

/// One catalogued asset: where it lives on disk, what kind of payload it is,
/// and the caption sent alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSpec {
    pub key: LogicalKey,
    pub source_path: PathBuf,
    pub kind: MediaKind,
    pub caption: String,
}

impl AssetSpec {
    pub fn new(
        key: impl Into<LogicalKey>,
        source_path: impl Into<PathBuf>,
        kind: MediaKind,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            source_path: source_path.into(),
            kind,
            caption: caption.into(),
        }
    }
}

impl From<String> for LogicalKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Atomic pairing of a remote identifier and the content digest the backing
/// file had when that identifier was obtained.
///
/// Both fields are always replaced together; a stale digest is never paired
/// with a fresh identifier or vice versa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub identifier: RemoteIdentifier,
    pub digest: ContentDigest,
}
