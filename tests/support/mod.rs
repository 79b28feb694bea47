//! Shared test support: a scripted in-memory stand-in for the remote
//! delivery platform, plus a filesystem-backed harness.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use staffetta::application::DeliveryService;
use staffetta::cache::AssetStore;
use staffetta::domain::{AssetSpec, MediaKind, RemoteIdentifier};
use staffetta::infra::source::{ByteStream, ContentSource, FsContentSource};
use staffetta::infra::transport::{MediaTransport, ReferenceError, TransportError};

/// Scripted remote platform: issues sequential identifiers, records every
/// interaction, and can be told to reject references or refuse uploads.
pub struct ScriptedTransport {
    transmit_count: AtomicUsize,
    reference_count: AtomicUsize,
    issued: AtomicUsize,
    reject_references: AtomicBool,
    refuse_transmits: AtomicBool,
    transmit_delay: Mutex<Option<Duration>>,
    delivered_references: Mutex<Vec<String>>,
    transmitted_sizes: Mutex<Vec<usize>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            transmit_count: AtomicUsize::new(0),
            reference_count: AtomicUsize::new(0),
            issued: AtomicUsize::new(0),
            reject_references: AtomicBool::new(false),
            refuse_transmits: AtomicBool::new(false),
            transmit_delay: Mutex::new(None),
            delivered_references: Mutex::new(Vec::new()),
            transmitted_sizes: Mutex::new(Vec::new()),
        })
    }

    /// Make every subsequent reference delivery fail as rejected.
    pub fn reject_references(&self, reject: bool) {
        self.reject_references.store(reject, Ordering::SeqCst);
    }

    /// Make every subsequent upload fail as refused.
    pub fn refuse_transmits(&self, refuse: bool) {
        self.refuse_transmits.store(refuse, Ordering::SeqCst);
    }

    /// Delay uploads, for exercising the transmission timeout.
    pub fn delay_transmits(&self, delay: Duration) {
        *self.transmit_delay.lock().unwrap() = Some(delay);
    }

    pub fn transmit_count(&self) -> usize {
        self.transmit_count.load(Ordering::SeqCst)
    }

    pub fn reference_count(&self) -> usize {
        self.reference_count.load(Ordering::SeqCst)
    }

    pub fn delivered_references(&self) -> Vec<String> {
        self.delivered_references.lock().unwrap().clone()
    }

    pub fn transmitted_sizes(&self) -> Vec<usize> {
        self.transmitted_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaTransport for ScriptedTransport {
    async fn transmit(
        &self,
        mut content: ByteStream,
        _kind: MediaKind,
        _caption: &str,
    ) -> Result<RemoteIdentifier, TransportError> {
        let delay = *self.transmit_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut size = 0;
        while let Some(chunk) = content.next().await {
            size += chunk?.len();
        }

        self.transmit_count.fetch_add(1, Ordering::SeqCst);
        if self.refuse_transmits.load(Ordering::SeqCst) {
            return Err(TransportError::refused("scripted refusal"));
        }

        self.transmitted_sizes.lock().unwrap().push(size);
        let serial = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RemoteIdentifier::new(format!("remote-id-{serial}")))
    }

    async fn deliver_by_reference(
        &self,
        identifier: &RemoteIdentifier,
        _caption: &str,
    ) -> Result<(), ReferenceError> {
        self.reference_count.fetch_add(1, Ordering::SeqCst);
        if self.reject_references.load(Ordering::SeqCst) {
            return Err(ReferenceError::Rejected);
        }
        self.delivered_references
            .lock()
            .unwrap()
            .push(identifier.as_str().to_string());
        Ok(())
    }
}

/// Everything a protocol test needs: a media directory, the store, the
/// scripted transport, and a wired delivery service.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub store: Arc<AssetStore>,
    pub source: Arc<FsContentSource>,
    pub transport: Arc<ScriptedTransport>,
    pub delivery: Arc<DeliveryService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    pub fn with_timeout(transmit_timeout: Duration) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(AssetStore::new());
        let source =
            Arc::new(FsContentSource::new(dir.path().join("media")).expect("content source"));
        let transport = ScriptedTransport::new();
        let delivery = Arc::new(DeliveryService::new(
            Arc::clone(&store),
            Arc::clone(&source) as Arc<dyn ContentSource>,
            Arc::clone(&transport) as Arc<dyn MediaTransport>,
            transmit_timeout,
        ));
        Self {
            dir,
            store,
            source,
            transport,
            delivery,
        }
    }

    /// Write a media file under the harness root and return a catalog entry
    /// for it.
    pub async fn write_asset(
        &self,
        key: &str,
        file_name: &str,
        kind: MediaKind,
        bytes: &[u8],
    ) -> AssetSpec {
        let path = self.source.root().join(file_name);
        tokio::fs::write(&path, bytes).await.expect("write asset");
        AssetSpec::new(key, path, kind, format!("caption for {key}"))
    }

    /// A catalog entry whose source file does not exist.
    pub fn missing_asset(&self, key: &str, file_name: &str, kind: MediaKind) -> AssetSpec {
        AssetSpec::new(
            key,
            self.source.root().join(file_name),
            kind,
            format!("caption for {key}"),
        )
    }
}
