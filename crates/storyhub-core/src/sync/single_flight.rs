use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

type Flight<T> = Shared<BoxFuture<'static, T>>;

/// Collapses concurrent calls for the same key into one execution.
///
/// The first caller for a key starts the work; callers arriving while it is
/// still running await the same shared outcome. The slot is released when the
/// work settles, so the next call starts a fresh execution.
///
/// Clone is cheap and clones share the same in-flight table.
pub struct SingleFlight<K, T> {
    inflight: Arc<Mutex<HashMap<K, Flight<T>>>>,
}

impl<K, T> Clone for SingleFlight<K, T> {
    fn clone(&self) -> Self {
        Self {
            inflight: Arc::clone(&self.inflight),
        }
    }
}

impl<K, T> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` under `key`, or join the execution already in flight.
    ///
    /// `work` is only invoked when no execution for `key` is running.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            match inflight.get(&key) {
                Some(existing) => {
                    debug!(key = ?key, "Joining in-flight operation");
                    existing.clone()
                }
                None => {
                    let table = Arc::clone(&self.inflight);
                    let slot = key.clone();
                    let fut = work();
                    let flight = async move {
                        let outcome = fut.await;
                        table.lock().unwrap_or_else(|e| e.into_inner()).remove(&slot);
                        outcome
                    }
                    .boxed()
                    .shared();
                    inflight.insert(key, flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    /// Whether an execution for `key` is currently in flight.
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }
}
