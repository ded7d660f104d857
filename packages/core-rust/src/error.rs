//! Error taxonomy shared by every tier and by the chain.
//!
//! Absence is never an error: tiers report it as `Ok(None)`, `Ok(false)` or
//! through the missing list of a batch read.

/// Errors returned by [`KvStore`](crate::KvStore) implementations and the chain.
#[derive(Debug, thiserror::Error)]
pub enum KvStoreError {
    #[error("operation cancelled")]
    Cancelled,
    #[error("operation deadline exceeded")]
    DeadlineExceeded,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no store registered for backend kind {kind:?}")]
    UnknownBackend { kind: String },
    #[error("store {store}: serialization failed: {message}")]
    Serialization { store: String, message: String },
    #[error("store {store}: backend failure: {source}")]
    Backend {
        store: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KvStoreError {
    /// Wraps a transport or storage failure of the named store.
    pub fn backend(store: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Backend {
            store: store.into(),
            source: source.into(),
        }
    }

    /// Wraps an encode/decode failure of the named store.
    pub fn serialization(store: impl Into<String>, message: impl ToString) -> Self {
        Self::Serialization {
            store: store.into(),
            message: message.to_string(),
        }
    }

    /// Returns `true` for errors raised by the caller's context rather than a tier.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, KvStoreError>;
