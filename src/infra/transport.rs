//! Remote delivery transport boundary.
//!
//! The crate never owns a network client; callers supply an implementation
//! that knows how to push bytes to the delivery platform and how to replay a
//! previously issued identifier.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{MediaKind, RemoteIdentifier};

use super::source::ByteStream;

/// Remote platform refused or could not accept a fresh upload.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("remote platform refused the upload: {reason}")]
    Refused { reason: String },
    #[error("transport failure during upload: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn refused(reason: impl Into<String>) -> Self {
        Self::Refused {
            reason: reason.into(),
        }
    }
}

/// Failure replaying a previously cached identifier.
///
/// `Rejected` is the stale-identifier signal; either variant makes the
/// orchestrator invalidate the entry and fall back to the source exactly
/// once.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("remote platform rejected the cached identifier")]
    Rejected,
    #[error("transport failure during reference delivery: {message}")]
    Transport { message: String },
}

impl ReferenceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Contract with the external delivery platform.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Transmit fresh content and obtain the identifier the platform issues
    /// for it. The stream must be consumed in bounded-memory chunks.
    async fn transmit(
        &self,
        content: ByteStream,
        kind: MediaKind,
        caption: &str,
    ) -> Result<RemoteIdentifier, TransportError>;

    /// Deliver by replaying a previously issued identifier; no bytes are
    /// read from disk.
    async fn deliver_by_reference(
        &self,
        identifier: &RemoteIdentifier,
        caption: &str,
    ) -> Result<(), ReferenceError>;
}
