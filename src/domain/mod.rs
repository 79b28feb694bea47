//! Domain layer types and invariants.

pub mod assets;

pub use assets::{AssetSpec, CacheEntry, ContentDigest, LogicalKey, MediaKind, RemoteIdentifier};
