//! Content change detection.

use std::path::Path;
use std::sync::Arc;

use crate::cache::AssetStore;
use crate::domain::LogicalKey;
use crate::infra::hasher::{self, DigestError, DigestOutcome};

/// Compares fresh content digests against recorded baselines to decide
/// whether a key's backing file changed on disk.
///
/// Baselines live in the store's digest map, keyed by the same logical keys
/// as the identifier entries but tracked independently.
pub struct ChangeDetector {
    store: Arc<AssetStore>,
}

impl ChangeDetector {
    pub fn new(store: Arc<AssetStore>) -> Self {
        Self { store }
    }

    /// Whether the content backing `key` changed since the last check.
    ///
    /// A key with no recorded baseline is treated as new: the fresh digest is
    /// recorded and `true` is returned. A differing digest replaces the
    /// baseline and returns `true`. A missing file returns `false` and
    /// records nothing; callers must not take the "file changed" branch for
    /// an absent file.
    pub async fn has_changed(&self, key: &LogicalKey, path: &Path) -> Result<bool, DigestError> {
        let fresh = match hasher::compute_digest(path).await? {
            DigestOutcome::Found(digest) => digest,
            DigestOutcome::NotFound => return Ok(false),
        };

        match self.store.baseline(key) {
            None => {
                self.store.record_baseline(key.clone(), fresh);
                Ok(true)
            }
            Some(previous) if previous != fresh => {
                self.store.record_baseline(key.clone(), fresh);
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }
}
