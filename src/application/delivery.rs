//! The delivery protocol.
//!
//! Per request the pipeline is: check-changed → try-cache → fallback. A
//! stale or rejected cached identifier never causes permanent failure; it
//! triggers exactly one invalidation and one fallback to the source file.
//! The pipeline performs at most one cache read and one fallback write per
//! request; there is no retry loop.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::future::join_all;
use metrics::counter;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::cache::AssetStore;
use crate::domain::{AssetSpec, LogicalKey, RemoteIdentifier};
use crate::infra::hasher::{self, DigestOutcome};
use crate::infra::source::{ContentSource, SourceError};
use crate::infra::telemetry::{
    METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATION, METRIC_CACHE_MISS, METRIC_TRANSMIT,
    METRIC_TRANSMIT_FAILURE,
};
use crate::infra::transport::MediaTransport;

use super::changes::ChangeDetector;

/// Terminal state of one asset's delivery pipeline.
///
/// Every request ends in one of these; internal digest or transport errors
/// are folded into `Failed` with a human-readable reason and never escape as
/// raw errors.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// Content reached the requester.
    Delivered {
        key: LogicalKey,
        identifier: RemoteIdentifier,
        /// Whether a cached identifier was replayed (no bytes read).
        from_cache: bool,
    },
    /// Source file absent and no usable cache entry. No retry, no cache
    /// mutation.
    NotFound { key: LogicalKey },
    /// Transmission or digesting failed. The cache is never left with a
    /// partial entry.
    Failed { key: LogicalKey, reason: String },
}

impl DeliveryOutcome {
    pub fn key(&self) -> &LogicalKey {
        match self {
            Self::Delivered { key, .. } | Self::NotFound { key } | Self::Failed { key, .. } => key,
        }
    }

    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Aggregate of a multi-asset delivery request.
#[derive(Debug)]
pub struct DeliveryReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    /// Number of assets that reached the requester.
    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.is_delivered())
            .count()
    }

    /// Number of assets requested.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Orchestrates delivery of catalogued assets through the cache.
///
/// Same-key requests are serialized with a per-key async mutex so two
/// concurrent pipelines cannot interleave their cache mutations; different
/// keys proceed independently.
pub struct DeliveryService {
    store: Arc<AssetStore>,
    detector: ChangeDetector,
    source: Arc<dyn ContentSource>,
    transport: Arc<dyn MediaTransport>,
    key_locks: DashMap<LogicalKey, Arc<Mutex<()>>>,
    transmit_timeout: Duration,
}

impl DeliveryService {
    pub fn new(
        store: Arc<AssetStore>,
        source: Arc<dyn ContentSource>,
        transport: Arc<dyn MediaTransport>,
        transmit_timeout: Duration,
    ) -> Self {
        Self {
            detector: ChangeDetector::new(Arc::clone(&store)),
            store,
            source,
            transport,
            key_locks: DashMap::new(),
            transmit_timeout,
        }
    }

    /// The store this service writes through.
    pub fn store(&self) -> &Arc<AssetStore> {
        &self.store
    }

    /// Run the full pipeline for one asset.
    pub async fn deliver(&self, asset: &AssetSpec) -> DeliveryOutcome {
        let lock = self.key_lock(&asset.key);
        let _serialized = lock.lock().await;

        if let Some(outcome) = self.check_changed(asset).await {
            return outcome;
        }
        if let Some(outcome) = self.try_cache(asset).await {
            return outcome;
        }
        self.fallback(asset).await
    }

    /// Run each asset's pipeline concurrently and aggregate the outcomes.
    ///
    /// Partial failure on one key never aborts the others; every sibling
    /// result is captured before the report is assembled.
    pub async fn deliver_many(&self, assets: &[AssetSpec]) -> DeliveryReport {
        let outcomes = join_all(assets.iter().map(|asset| self.deliver(asset))).await;
        let report = DeliveryReport { outcomes };
        info!(
            delivered = report.delivered(),
            total = report.total(),
            "Multi-asset delivery complete"
        );
        report
    }

    /// Invalidate the key and rebuild its entry from source, skipping the
    /// cache attempt entirely. Used by forced recaching.
    pub(crate) async fn refresh(&self, asset: &AssetSpec) -> DeliveryOutcome {
        let lock = self.key_lock(&asset.key);
        let _serialized = lock.lock().await;

        if self.store.invalidate(&asset.key) {
            counter!(METRIC_CACHE_INVALIDATION, "reason" => "forced").increment(1);
            info!(key = %asset.key, reason = "forced", "Cache entry invalidated");
        }
        self.fallback(asset).await
    }

    fn key_lock(&self, key: &LogicalKey) -> Arc<Mutex<()>> {
        self.key_locks.entry(key.clone()).or_default().clone()
    }

    /// Step 1: purge the entry if the backing file changed on disk.
    ///
    /// Returns `Some` only when digesting failed outright, which ends the
    /// pipeline as `Failed`.
    async fn check_changed(&self, asset: &AssetSpec) -> Option<DeliveryOutcome> {
        let path = self.source.resolve(&asset.source_path);
        match self.detector.has_changed(&asset.key, &path).await {
            Ok(true) => {
                if self.store.invalidate(&asset.key) {
                    counter!(METRIC_CACHE_INVALIDATION, "reason" => "content_changed")
                        .increment(1);
                    info!(
                        key = %asset.key,
                        reason = "content_changed",
                        "Cache entry invalidated"
                    );
                }
                None
            }
            Ok(false) => None,
            Err(err) => Some(DeliveryOutcome::Failed {
                key: asset.key.clone(),
                reason: err.to_string(),
            }),
        }
    }

    /// Step 2: replay the cached identifier if one survives.
    ///
    /// Any reference failure (rejection, transport error, timeout) purges
    /// the entry and falls through to the source exactly once.
    async fn try_cache(&self, asset: &AssetSpec) -> Option<DeliveryOutcome> {
        let Some(identifier) = self.store.get(&asset.key) else {
            counter!(METRIC_CACHE_MISS).increment(1);
            debug!(key = %asset.key, "Cache miss");
            return None;
        };

        let attempt = timeout(
            self.transmit_timeout,
            self.transport.deliver_by_reference(&identifier, &asset.caption),
        )
        .await;

        match attempt {
            Ok(Ok(())) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                info!(key = %asset.key, "Delivered by cached reference");
                Some(DeliveryOutcome::Delivered {
                    key: asset.key.clone(),
                    identifier,
                    from_cache: true,
                })
            }
            Ok(Err(err)) => {
                self.purge_rejected(asset, &err.to_string());
                None
            }
            Err(_elapsed) => {
                self.purge_rejected(asset, "reference delivery timed out");
                None
            }
        }
    }

    fn purge_rejected(&self, asset: &AssetSpec, cause: &str) {
        self.store.invalidate(&asset.key);
        counter!(METRIC_CACHE_INVALIDATION, "reason" => "reference_rejected").increment(1);
        warn!(
            key = %asset.key,
            cause,
            "Cached identifier rejected; falling back to source"
        );
    }

    /// Step 3: transmit the source file and repopulate the cache.
    async fn fallback(&self, asset: &AssetSpec) -> DeliveryOutcome {
        let path = self.source.resolve(&asset.source_path);

        let digest = match hasher::compute_digest(&path).await {
            Ok(DigestOutcome::Found(digest)) => digest,
            Ok(DigestOutcome::NotFound) => {
                warn!(key = %asset.key, path = %path.display(), "Source file not found");
                return DeliveryOutcome::NotFound {
                    key: asset.key.clone(),
                };
            }
            Err(err) => {
                return DeliveryOutcome::Failed {
                    key: asset.key.clone(),
                    reason: err.to_string(),
                };
            }
        };

        let stream = match self.source.open(&asset.source_path).await {
            Ok(stream) => stream,
            // The file can vanish between digesting and opening.
            Err(SourceError::NotFound(_)) => {
                return DeliveryOutcome::NotFound {
                    key: asset.key.clone(),
                };
            }
            Err(err) => {
                return DeliveryOutcome::Failed {
                    key: asset.key.clone(),
                    reason: err.to_string(),
                };
            }
        };

        counter!(METRIC_TRANSMIT).increment(1);
        let attempt = timeout(
            self.transmit_timeout,
            self.transport.transmit(stream, asset.kind, &asset.caption),
        )
        .await;

        match attempt {
            Ok(Ok(identifier)) => {
                self.store
                    .put(asset.key.clone(), identifier.clone(), digest);
                info!(key = %asset.key, "Delivered from source and cached");
                DeliveryOutcome::Delivered {
                    key: asset.key.clone(),
                    identifier,
                    from_cache: false,
                }
            }
            Ok(Err(err)) => {
                counter!(METRIC_TRANSMIT_FAILURE).increment(1);
                warn!(key = %asset.key, error = %err, "Transmission failed");
                DeliveryOutcome::Failed {
                    key: asset.key.clone(),
                    reason: err.to_string(),
                }
            }
            Err(_elapsed) => {
                counter!(METRIC_TRANSMIT_FAILURE).increment(1);
                warn!(key = %asset.key, "Transmission timed out");
                DeliveryOutcome::Failed {
                    key: asset.key.clone(),
                    reason: format!(
                        "transmission timed out after {}s",
                        self.transmit_timeout.as_secs()
                    ),
                }
            }
        }
    }
}
