//! Staffetta delivery cache.
//!
//! Maps logical asset keys to the opaque upload identifiers a remote delivery
//! platform hands back after content is transmitted, so repeated requests for
//! the same asset are served by reference instead of re-uploading bytes.
//!
//! The crate is organised in the usual layers:
//!
//! - [`domain`]: asset identity (logical keys, content digests, remote
//!   identifiers) and the cache-entry invariant.
//! - [`cache`]: the in-memory store holding identifier entries and digest
//!   baselines.
//! - [`application`]: change detection, the delivery protocol
//!   (check-changed → try-cache → fallback), and privileged admin operations.
//! - [`infra`]: filesystem content source, streaming hasher, the remote
//!   transport boundary, and telemetry setup.
//! - [`config`]: layered settings (file → environment) including the asset
//!   catalog.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
