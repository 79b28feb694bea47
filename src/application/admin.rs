//! Cache-wide administrative operations.
//!
//! Every privileged entry point re-checks authorization through the injected
//! policy, independent of whatever gating the surrounding command layer
//! performs. An unauthorized call is rejected before any state is touched.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::cache::AssetStore;
use crate::domain::{AssetSpec, LogicalKey};
use crate::infra::hasher::{self, DigestOutcome};
use crate::infra::source::ContentSource;
use crate::infra::telemetry::METRIC_CACHE_INVALIDATION;

use super::delivery::{DeliveryOutcome, DeliveryService};

/// Shown instead of full remote identifiers in diagnostic output.
const IDENTIFIER_PREVIEW_CHARS: usize = 20;
/// Shown instead of full digests in diagnostic output.
const DIGEST_PREVIEW_CHARS: usize = 8;

/// Identity of the caller invoking an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CallerId(u64);

impl CallerId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Decides which callers may run privileged operations.
pub trait AdminPolicy: Send + Sync {
    fn is_privileged(&self, caller: CallerId) -> bool;
}

/// Flat allowlist of privileged caller identities.
pub struct AllowlistPolicy {
    ids: HashSet<u64>,
}

impl AllowlistPolicy {
    pub fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

impl AdminPolicy for AllowlistPolicy {
    fn is_privileged(&self, caller: CallerId) -> bool {
        self.ids.contains(&caller.get())
    }
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("caller {caller} is not privileged for `{operation}`")]
    PermissionDenied {
        caller: CallerId,
        operation: &'static str,
    },
}

/// Per-asset failure recorded during a forced recache.
#[derive(Debug, Serialize)]
pub struct RecacheFailure {
    pub key: LogicalKey,
    pub reason: String,
}

/// Aggregate result of [`AdminService::force_recache_all`].
#[derive(Debug, Serialize)]
pub struct RecacheReport {
    pub succeeded: Vec<LogicalKey>,
    pub failed: Vec<RecacheFailure>,
    /// Entries cached once the rebuild finished.
    pub cached_total: usize,
}

/// One catalog row of [`CacheStateReport`], cross-referencing the cache with
/// the live filesystem. Identifier and digest values are previews; full
/// values never leave the store through this report.
#[derive(Debug, Serialize)]
pub struct AssetStateRow {
    pub key: LogicalKey,
    pub source_path: String,
    pub exists: bool,
    pub cached: bool,
    pub identifier_preview: Option<String>,
    pub stored_digest_preview: Option<String>,
    pub current_digest_preview: Option<String>,
}

/// Diagnostic report produced by [`AdminService::describe_cache_state`].
#[derive(Debug, Serialize)]
pub struct CacheStateReport {
    pub generated_at: OffsetDateTime,
    pub entry_count: usize,
    pub baseline_count: usize,
    pub assets: Vec<AssetStateRow>,
}

/// Truncated summary row of [`CacheStatus`].
#[derive(Debug, Serialize)]
pub struct CacheStatusEntry {
    pub key: LogicalKey,
    pub identifier_preview: String,
    pub digest_preview: String,
}

/// Unprivileged read-only cache summary.
#[derive(Debug, Serialize)]
pub struct CacheStatus {
    pub total: usize,
    pub entries: Vec<CacheStatusEntry>,
}

/// Privileged cache-wide operations: clear, forced rebuild, diagnostics.
pub struct AdminService {
    store: Arc<AssetStore>,
    delivery: Arc<DeliveryService>,
    source: Arc<dyn ContentSource>,
    policy: Arc<dyn AdminPolicy>,
}

impl AdminService {
    pub fn new(
        store: Arc<AssetStore>,
        delivery: Arc<DeliveryService>,
        source: Arc<dyn ContentSource>,
        policy: Arc<dyn AdminPolicy>,
    ) -> Self {
        Self {
            store,
            delivery,
            source,
            policy,
        }
    }

    /// Remove every entry and baseline. Returns the number of entries
    /// removed.
    pub fn clear_cache(&self, caller: CallerId) -> Result<usize, AdminError> {
        self.authorize(caller, "clear_cache")?;

        let removed = self.store.clear_all();
        counter!(METRIC_CACHE_INVALIDATION, "reason" => "admin_clear").increment(removed as u64);
        info!(caller = caller.get(), removed, "Cache cleared");
        Ok(removed)
    }

    /// Rebuild the cache from scratch for every catalogued asset, ignoring
    /// current entry validity: each key is invalidated and re-transmitted
    /// from source, skipping the cache attempt entirely.
    ///
    /// A failure on one asset is recorded and processing continues with the
    /// rest.
    pub async fn force_recache_all(
        &self,
        caller: CallerId,
        catalog: &[AssetSpec],
    ) -> Result<RecacheReport, AdminError> {
        self.authorize(caller, "force_recache_all")?;

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for asset in catalog {
            match self.delivery.refresh(asset).await {
                DeliveryOutcome::Delivered { key, .. } => succeeded.push(key),
                DeliveryOutcome::NotFound { key } => failed.push(RecacheFailure {
                    key,
                    reason: "source file not found".to_string(),
                }),
                DeliveryOutcome::Failed { key, reason } => {
                    failed.push(RecacheFailure { key, reason });
                }
            }
        }

        let report = RecacheReport {
            cached_total: self.store.len(),
            succeeded,
            failed,
        };
        info!(
            caller = caller.get(),
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            cached_total = report.cached_total,
            "Force recache complete"
        );
        Ok(report)
    }

    /// Cross-reference the cache snapshot with live filesystem existence and
    /// the current on-disk digest of every catalogued asset.
    ///
    /// Read-only: baselines are not recorded and no entry is mutated.
    pub async fn describe_cache_state(
        &self,
        caller: CallerId,
        catalog: &[AssetSpec],
    ) -> Result<CacheStateReport, AdminError> {
        self.authorize(caller, "describe_cache_state")?;

        let mut assets = Vec::with_capacity(catalog.len());
        for asset in catalog {
            let entry = self.store.entry(&asset.key);
            let exists = self.source.exists(&asset.source_path).await;

            let current_digest_preview = if exists {
                let path = self.source.resolve(&asset.source_path);
                match hasher::compute_digest(&path).await {
                    Ok(DigestOutcome::Found(digest)) => {
                        Some(preview(digest.as_hex(), DIGEST_PREVIEW_CHARS))
                    }
                    Ok(DigestOutcome::NotFound) => None,
                    Err(err) => {
                        warn!(key = %asset.key, error = %err, "Digest failed during diagnostics");
                        None
                    }
                }
            } else {
                None
            };

            assets.push(AssetStateRow {
                key: asset.key.clone(),
                source_path: asset.source_path.display().to_string(),
                exists,
                cached: entry.is_some(),
                identifier_preview: entry
                    .map(|entry| preview(entry.identifier.as_str(), IDENTIFIER_PREVIEW_CHARS)),
                stored_digest_preview: self
                    .store
                    .baseline(&asset.key)
                    .map(|digest| preview(digest.as_hex(), DIGEST_PREVIEW_CHARS)),
                current_digest_preview,
            });
        }

        Ok(CacheStateReport {
            generated_at: OffsetDateTime::now_utc(),
            entry_count: self.store.len(),
            baseline_count: self.store.baseline_count(),
            assets,
        })
    }

    /// Truncated snapshot of the cache, open to any caller.
    pub fn cache_status(&self) -> CacheStatus {
        let entries: Vec<CacheStatusEntry> = self
            .store
            .snapshot()
            .into_iter()
            .map(|row| CacheStatusEntry {
                key: row.key,
                identifier_preview: preview(row.identifier.as_str(), IDENTIFIER_PREVIEW_CHARS),
                digest_preview: preview(row.digest.as_hex(), DIGEST_PREVIEW_CHARS),
            })
            .collect();
        CacheStatus {
            total: entries.len(),
            entries,
        }
    }

    fn authorize(&self, caller: CallerId, operation: &'static str) -> Result<(), AdminError> {
        if self.policy.is_privileged(caller) {
            Ok(())
        } else {
            warn!(
                caller = caller.get(),
                operation, "Unauthorized admin operation rejected"
            );
            Err(AdminError::PermissionDenied { caller, operation })
        }
    }
}

fn preview(value: &str, limit: usize) -> String {
    value.chars().take(limit).collect()
}
