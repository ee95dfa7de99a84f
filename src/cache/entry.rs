// Cache entry.
// A type-erased stored value with its expiry and the generation that produced it.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{HubError, Result};

pub(crate) type ErasedValue = Arc<dyn Any + Send + Sync>;

/// Stored value plus metadata.
#[derive(Clone)]
pub struct CacheEntry {
    value: ErasedValue,
    /// When the value was stored.
    pub stored_at: Instant,
    /// When the value stops being served as fresh.
    pub expires_at: Instant,
    /// Id of the generation that produced the value.
    pub generation: u64,
}

impl CacheEntry {
    pub(crate) fn new(
        value: ErasedValue,
        stored_at: Instant,
        expires_in: Duration,
        generation: u64,
    ) -> Self {
        Self {
            value,
            stored_at,
            expires_at: stored_at + expires_in,
            generation,
        }
    }

    /// Check if this entry has expired as of `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn is_live(&self, now: Instant) -> bool {
        !self.is_expired(now)
    }

    /// Clone the stored value out as `T`.
    pub fn value<T: Clone + 'static>(&self, key: &str) -> Result<T> {
        downcast(&self.value, key)
    }
}

pub(crate) fn downcast<T: Clone + 'static>(value: &ErasedValue, key: &str) -> Result<T> {
    (**value)
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| HubError::CacheTypeMismatch {
            key: key.to_string(),
        })
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("stored_at", &self.stored_at)
            .field("expires_at", &self.expires_at)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
