//! Staffetta cache system.
//!
//! A single in-memory layer mapping logical asset keys to the remote
//! identifiers issued by the delivery platform, with a parallel map of
//! content-digest baselines for change detection.
//!
//! Entries are created on first successful transmission, replaced wholesale
//! when content changes or the remote side rejects an identifier, and removed
//! by invalidation or an administrative clear. Nothing persists across
//! restarts.

mod lock;
mod store;

pub use store::{AssetStore, SnapshotEntry};
