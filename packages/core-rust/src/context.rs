//! Cancellation and deadline propagation for store calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{KvStoreError, Result};

/// Per-call context threaded through every tier operation.
///
/// Carries a cancellation token and an optional deadline. Cloning shares the
/// same token, so cancelling any clone cancels them all; use
/// [`child()`](StoreContext::child) for a context that can be cancelled
/// independently of its parent.
#[derive(Debug, Clone, Default)]
pub struct StoreContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl StoreContext {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Builds a context driven by an existing cancellation token.
    #[must_use]
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Returns a copy that expires `timeout` from now, or earlier if the
    /// current deadline is sooner.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a copy with the given deadline, keeping the earlier one if set.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Derives a context cancelled together with this one but cancellable on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails with the context error if the context is already done.
    ///
    /// # Errors
    ///
    /// [`KvStoreError::Cancelled`] or [`KvStoreError::DeadlineExceeded`].
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(KvStoreError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(KvStoreError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drives `fut` until it completes or the context fires.
    ///
    /// When the context fires first, `fut` is dropped, aborting whatever
    /// I/O it had in flight.
    ///
    /// # Errors
    ///
    /// Returns the context error, or whatever `fut` returns.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(KvStoreError::Cancelled),
            () = expired => Err(KvStoreError::DeadlineExceeded),
            result = fut => result,
        }
    }
}
