//! Settable delegate reference shared by every resolver stage.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{DomainError, DomainResult};

use super::traits::CheckResolver;

/// The next stage of a resolver.
///
/// Set once during wiring and read on every check. Clearing it on close
/// breaks the `Arc` ring so the stages can be dropped.
pub(crate) struct DelegateSlot {
    owner: &'static str,
    inner: RwLock<Option<Arc<dyn CheckResolver>>>,
}

impl DelegateSlot {
    pub(crate) fn new(owner: &'static str) -> Self {
        Self {
            owner,
            inner: RwLock::new(None),
        }
    }

    pub(crate) fn set(&self, delegate: Arc<dyn CheckResolver>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(delegate);
    }

    pub(crate) fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub(crate) fn current(&self) -> Option<Arc<dyn CheckResolver>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the delegate or a resolver error naming the unwired stage.
    pub(crate) fn get(&self) -> DomainResult<Arc<dyn CheckResolver>> {
        self.current().ok_or_else(|| DomainError::ResolverError {
            message: format!("{} has no delegate", self.owner),
        })
    }
}
