// Cache entry registry.
// Maps keys to stored values and in-flight generations, with at most one
// live generation per key.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{HubError, Result};

use super::entry::{CacheEntry, ErasedValue, downcast};
use super::policy::CachePolicy;

type Outcome = std::result::Result<ErasedValue, Arc<HubError>>;

/// A running generation. Callers that find one before its deadline join it
/// instead of starting their own.
struct InFlight {
    id: u64,
    deadline: Instant,
    timeout: Duration,
    outcome: Shared<BoxFuture<'static, Outcome>>,
}

#[derive(Default)]
struct Slot {
    entry: Option<CacheEntry>,
    generation: Option<InFlight>,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    stale: AtomicU64,
    generations: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
}

#[derive(Default)]
struct Inner {
    slots: Mutex<HashMap<String, Slot>>,
    next_generation: AtomicU64,
    counters: Counters,
}

/// Snapshot of registry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered from a live value.
    pub hits: u64,
    /// Calls answered from an expired value after a failure or timeout.
    pub stale: u64,
    /// Generations started.
    pub generations: u64,
    /// Generations that returned an error.
    pub failures: u64,
    /// Calls that stopped waiting on a generation.
    pub timeouts: u64,
}

/// Shared get-or-generate cache. Clones share the same entries.
#[derive(Clone, Default)]
pub struct CacheRegistry {
    inner: Arc<Inner>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live value for `key`, or generate one.
    ///
    /// Concurrent callers for the same key share a single generation. The
    /// generation runs on its own task, so it keeps going when callers stop
    /// waiting at `generate_timeout` and still stores its value when done.
    /// After a failure or timeout, an expired value is served if one exists.
    /// The generator is called without any registry lock held.
    pub async fn get<T, F, Fut>(&self, key: &str, policy: CachePolicy, generator: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (outcome, deadline, timeout, pending) = {
            let mut slots = self.inner.slots.lock();
            let now = Instant::now();
            let slot = slots.entry(key.to_string()).or_default();

            if let Some(entry) = slot.entry.as_ref().filter(|entry| entry.is_live(now)) {
                self.inner.counters.hits.fetch_add(1, Ordering::Relaxed);
                return entry.value(key);
            }

            match &slot.generation {
                Some(in_flight) if in_flight.deadline > now => {
                    debug!(key, generation = in_flight.id, "joining in-flight generation");
                    (in_flight.outcome.clone(), in_flight.deadline, in_flight.timeout, None)
                }
                _ => {
                    let (in_flight, sender) = self.begin_generation(key, policy, now);
                    let joined = (
                        in_flight.outcome.clone(),
                        in_flight.deadline,
                        in_flight.timeout,
                        Some((in_flight.id, sender)),
                    );
                    slot.generation = Some(in_flight);
                    joined
                }
            }
        };

        if let Some((id, sender)) = pending {
            self.run_generation(key, id, policy, generator(), sender);
        }

        match tokio::time::timeout_at(deadline, outcome).await {
            Ok(Ok(value)) => downcast(&value, key),
            Ok(Err(source)) => match self.stale(key)? {
                Some(value) => {
                    warn!(key, error = %source, "generation failed, serving stale value");
                    Ok(value)
                }
                None => Err(HubError::GenerationFailed {
                    key: key.to_string(),
                    source,
                }),
            },
            Err(_) => {
                self.inner.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                match self.stale(key)? {
                    Some(value) => {
                        warn!(key, ?timeout, "generation timed out, serving stale value");
                        Ok(value)
                    }
                    None => Err(HubError::GenerationTimeout {
                        key: key.to_string(),
                        timeout,
                    }),
                }
            }
        }
    }

    /// Reserve the next generation id for `key`. Joiners wait on the
    /// returned sender; dropping it unsent aborts the generation.
    fn begin_generation(
        &self,
        key: &str,
        policy: CachePolicy,
        now: Instant,
    ) -> (InFlight, oneshot::Sender<Outcome>) {
        let id = self.inner.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.counters.generations.fetch_add(1, Ordering::Relaxed);
        debug!(key, generation = id, "starting generation");

        let (sender, receiver) = oneshot::channel();
        let inner = self.inner.clone();
        let join_key = key.to_string();
        let outcome = async move {
            match receiver.await {
                Ok(outcome) => outcome,
                Err(_) => {
                    inner.release(&join_key, id);
                    Err(Arc::new(HubError::GenerationAborted {
                        key: join_key,
                        message: "generation ended without a result".to_string(),
                    }))
                }
            }
        }
        .boxed()
        .shared();

        let in_flight = InFlight {
            id,
            deadline: now + policy.generate_timeout,
            timeout: policy.generate_timeout,
            outcome,
        };
        (in_flight, sender)
    }

    /// Drive generation `id` on its own task and publish its outcome.
    fn run_generation<T, Fut>(
        &self,
        key: &str,
        id: u64,
        policy: CachePolicy,
        future: Fut,
        sender: oneshot::Sender<Outcome>,
    ) where
        T: Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let inner = self.inner.clone();
        let task_key = key.to_string();
        tokio::spawn(async move {
            let result = future.await.map(|value| Arc::new(value) as ErasedValue);
            let outcome = inner.complete(&task_key, id, policy.expires_in, result);
            // Nobody may be waiting any more.
            let _ = sender.send(outcome);
        });
    }

    /// Any stored value for `key`, expired or not.
    fn stale<T: Clone + 'static>(&self, key: &str) -> Result<Option<T>> {
        let slots = self.inner.slots.lock();
        match slots.get(key).and_then(|slot| slot.entry.as_ref()) {
            Some(entry) => {
                let value = entry.value(key)?;
                self.inner.counters.stale.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Number of keys with a stored value.
    pub fn len(&self) -> usize {
        self.inner
            .slots
            .lock()
            .values()
            .filter(|slot| slot.entry.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` has a value that would be served without generating.
    pub fn contains_live(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .slots
            .lock()
            .get(key)
            .and_then(|slot| slot.entry.as_ref())
            .is_some_and(|entry| entry.is_live(now))
    }

    /// Whether a generation for `key` is still within its deadline.
    pub fn in_flight(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .slots
            .lock()
            .get(key)
            .and_then(|slot| slot.generation.as_ref())
            .is_some_and(|in_flight| in_flight.deadline > now)
    }

    pub fn stats(&self) -> CacheStats {
        let counters = &self.inner.counters;
        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            stale: counters.stale.load(Ordering::Relaxed),
            generations: counters.generations.load(Ordering::Relaxed),
            failures: counters.failures.load(Ordering::Relaxed),
            timeouts: counters.timeouts.load(Ordering::Relaxed),
        }
    }
}

impl Inner {
    /// Record the result of generation `id`. The value is stored unless a
    /// later generation already stored one.
    fn complete(
        &self,
        key: &str,
        id: u64,
        expires_in: Duration,
        result: Result<ErasedValue>,
    ) -> Outcome {
        let mut slots = self.slots.lock();
        let slot = slots.entry(key.to_string()).or_default();
        if slot.generation.as_ref().is_some_and(|g| g.id == id) {
            slot.generation = None;
        }

        match result {
            Ok(value) => {
                if slot.entry.as_ref().is_some_and(|entry| entry.generation > id) {
                    debug!(key, generation = id, "dropping superseded generation result");
                } else {
                    slot.entry = Some(CacheEntry::new(
                        value.clone(),
                        Instant::now(),
                        expires_in,
                        id,
                    ));
                }
                Ok(value)
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                debug!(key, generation = id, error = %e, "generation failed");
                Err(Arc::new(e))
            }
        }
    }

    fn release(&self, key: &str, id: u64) {
        if let Some(slot) = self.slots.lock().get_mut(key) {
            if slot.generation.as_ref().is_some_and(|g| g.id == id) {
                slot.generation = None;
            }
        }
    }
}
