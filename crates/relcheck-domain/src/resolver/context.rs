//! Per-check cancellation context.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{DomainError, DomainResult};

/// Cancellation scope for one check and every nested check it issues.
///
/// Cloning is cheap and clones observe the same token and deadline.
#[derive(Debug, Clone, Default)]
pub struct CheckContext {
    cancellation: CancellationToken,
    deadline: Option<Deadline>,
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl CheckContext {
    /// Creates a context that is never cancelled and has no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context bound to an existing cancellation token.
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            deadline: None,
        }
    }

    /// Adds a deadline `timeout` from now. An earlier existing deadline wins.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let at = Instant::now() + timeout;
        match self.deadline {
            Some(existing) if existing.at <= at => {}
            _ => self.deadline = Some(Deadline { at, timeout }),
        }
        self
    }

    /// Creates a child context: cancelling the parent cancels the child,
    /// cancelling the child leaves the parent untouched.
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            deadline: self.deadline,
        }
    }

    /// The underlying cancellation token.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Cancels this context and all of its children.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns the error this context is done with, if any.
    pub fn err(&self) -> Option<DomainError> {
        if self.cancellation.is_cancelled() {
            return Some(DomainError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline.at => Some(timeout_error(deadline)),
            _ => None,
        }
    }

    /// Fails fast when the context is already done.
    pub fn check(&self) -> DomainResult<()> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Drives `future` until it completes or the context is done, whichever
    /// happens first. The future is dropped on cancellation.
    pub async fn run<F, T>(&self, future: F) -> DomainResult<T>
    where
        F: Future<Output = DomainResult<T>>,
    {
        self.check()?;

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => {
                    tokio::time::sleep_until(deadline.at).await;
                    deadline
                }
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(DomainError::Cancelled),
            deadline = expired => Err(timeout_error(deadline)),
            result = future => result,
        }
    }
}

fn timeout_error(deadline: Deadline) -> DomainError {
    DomainError::Timeout {
        duration_ms: deadline.timeout.as_millis() as u64,
    }
}
