// In-flight request deduplication

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Entry<T> = (u64, Shared<BoxFuture<'static, T>>);

/// Maps a request signature to the single pending operation for it.
///
/// An entry lives exactly as long as its operation is unsettled: it is removed
/// when the operation finishes, whatever the outcome. This bounds concurrency
/// per signature to one; it does not cache results.
pub struct PromiseTracker<T: Clone> {
    inflight: Arc<Mutex<HashMap<String, Entry<T>>>>,
    next_id: AtomicU64,
}

impl<T> PromiseTracker<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Return the pending operation for `signature`, starting one with `start`
    /// only if none is in flight. Every caller gets a handle to the same result.
    pub fn track<F, Fut>(&self, signature: &str, start: F) -> Shared<BoxFuture<'static, T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut inflight = self.inflight.lock();
        if let Some((_, pending)) = inflight.get(signature) {
            tracing::debug!(signature, "Joining in-flight request");
            return pending.clone();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = ReleaseGuard {
            inflight: Arc::clone(&self.inflight),
            signature: signature.to_string(),
            id,
        };
        let operation = start();
        let pending = async move {
            let _guard = guard;
            operation.await
        }
        .boxed()
        .shared();

        inflight.insert(signature.to_string(), (id, pending.clone()));
        pending
    }

    pub fn is_pending(&self, signature: &str) -> bool {
        self.inflight.lock().contains_key(signature)
    }

    pub fn len(&self) -> usize {
        self.inflight.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inflight.lock().is_empty()
    }
}

impl<T> Default for PromiseTracker<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Clears a tracker slot when its operation settles or is torn down
struct ReleaseGuard<T: Clone> {
    inflight: Arc<Mutex<HashMap<String, Entry<T>>>>,
    signature: String,
    id: u64,
}

impl<T: Clone> Drop for ReleaseGuard<T> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock();
        // A later operation may already own the slot
        if matches!(inflight.get(&self.signature), Some((id, _)) if *id == self.id) {
            inflight.remove(&self.signature);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_same_signature_starts_once() {
        let tracker: PromiseTracker<u32> = PromiseTracker::new();
        let starts = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel::<u32>();

        let first = {
            let starts = Arc::clone(&starts);
            tracker.track("GET:api/zoo", move || {
                starts.fetch_add(1, Ordering::SeqCst);
                async move { rx.await.unwrap_or(0) }
            })
        };
        let second = {
            let starts = Arc::clone(&starts);
            tracker.track("GET:api/zoo", move || {
                starts.fetch_add(1, Ordering::SeqCst);
                async { 99 }
            })
        };

        assert!(tracker.is_pending("GET:api/zoo"));
        tx.send(7).unwrap();

        let (a, b) = tokio::join!(first, second);
        assert_eq!((a, b), (7, 7));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_slot_released_after_failure() {
        let tracker: PromiseTracker<Result<u32, String>> = PromiseTracker::new();

        let failed = tracker.track("GET:api/zoo", || async { Err("boom".to_string()) });
        assert_eq!(failed.await, Err("boom".to_string()));
        assert!(tracker.is_empty());

        let retried = tracker.track("GET:api/zoo", || async { Ok(1) });
        assert_eq!(retried.await, Ok(1));
    }

    #[tokio::test]
    async fn test_different_signatures_do_not_share() {
        let tracker: PromiseTracker<u32> = PromiseTracker::new();
        let a = tracker.track("GET:api/zoo/1", || async { 1 });
        let b = tracker.track("GET:api/zoo/2", || async { 2 });
        assert_eq!(tracker.len(), 2);
        assert_eq!(tokio::join!(a, b), (1, 2));
    }
}
