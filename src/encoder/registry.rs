//! Lazily populated encoder cache with per-backend construction guards.
//!
//! The cache trades a brief duplicate-initialization risk window for
//! responsiveness: a caller that finds another request mid-construction is
//! told to retry (503 at the service boundary) instead of queuing behind a
//! model load of unknown duration.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::encoder::EncoderHandle;

/// How long the second caller waits before re-checking the cache once.
const RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Encoder {0} not supported")]
    UnsupportedBackend(String),
    #[error("Backend {id} unavailable: {reason}")]
    BackendUnavailable { id: String, reason: String },
    #[error("Encoder {0} is being initialized by another request")]
    InitializationInProgress(String),
}

/// Builds a backend handle for a known id. Construction must be
/// all-or-nothing: either a complete handle or an error, never a partial
/// handle. Kept synchronous so the per-key guard is never held across an
/// await point.
pub trait BackendFactory: Send + Sync {
    fn known(&self, backend_id: &str) -> bool;
    fn build(&self, backend_id: &str) -> Result<EncoderHandle, RegistryError>;
}

pub struct EncoderRegistry {
    factory: Box<dyn BackendFactory>,
    cache: RwLock<HashMap<String, EncoderHandle>>,
    /// One construction guard per backend id, never a single global guard.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl EncoderRegistry {
    pub fn new(factory: Box<dyn BackendFactory>) -> Self {
        Self {
            factory,
            cache: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached handle for `backend_id`, constructing it on first
    /// request. The cached read path takes no construction guard.
    pub async fn get_or_initialize(
        &self,
        backend_id: &str,
    ) -> Result<EncoderHandle, RegistryError> {
        if let Some(handle) = self.cache.read().get(backend_id) {
            return Ok(handle.clone());
        }

        if !self.factory.known(backend_id) {
            return Err(RegistryError::UnsupportedBackend(backend_id.to_string()));
        }

        let lock = {
            let mut locks = self.locks.lock();
            locks
                .entry(backend_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        // The guard must be dropped before any await so the returned future
        // stays Send; construction itself is synchronous.
        {
            if let Some(_guard) = lock.try_lock() {
                // Double-check: another caller may have finished between our
                // cache read and acquiring the guard.
                if let Some(handle) = self.cache.read().get(backend_id) {
                    return Ok(handle.clone());
                }

                tracing::info!("Initializing encoder backend {backend_id}");
                let handle = self.factory.build(backend_id)?;
                self.cache
                    .write()
                    .insert(backend_id.to_string(), handle.clone());
                return Ok(handle);
            }
        }

        // Someone else is constructing. Wait briefly, re-check once, then
        // report transient contention rather than blocking.
        tokio::time::sleep(RETRY_DELAY).await;
        if let Some(handle) = self.cache.read().get(backend_id) {
            return Ok(handle.clone());
        }
        Err(RegistryError::InitializationInProgress(
            backend_id.to_string(),
        ))
    }

    /// Best-effort teardown at process shutdown.
    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{EncoderHandle, LexicalIndex};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFactory {
        builds: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl CountingFactory {
        fn handle() -> EncoderHandle {
            EncoderHandle::Lexical(Arc::new(LexicalIndex::new(vec![], Default::default())))
        }
    }

    impl BackendFactory for CountingFactory {
        fn known(&self, backend_id: &str) -> bool {
            backend_id == "test"
        }

        fn build(&self, backend_id: &str) -> Result<EncoderHandle, RegistryError> {
            if backend_id != "test" {
                return Err(RegistryError::UnsupportedBackend(backend_id.to_string()));
            }
            self.builds.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            Ok(Self::handle())
        }
    }

    fn registry(delay: Duration) -> (Arc<EncoderRegistry>, Arc<AtomicUsize>) {
        let builds = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(EncoderRegistry::new(Box::new(CountingFactory {
            builds: builds.clone(),
            delay,
        })));
        (registry, builds)
    }

    #[test]
    fn test_get_or_initialize_future_is_send() {
        // Axum handlers require Send futures; the construction guard must
        // not be held across the retry sleep.
        fn assert_send<T: Send>(_: T) {}
        let (registry, _) = registry(Duration::ZERO);
        assert_send(async move { registry.get_or_initialize("test").await });
    }

    #[tokio::test]
    async fn test_unknown_backend_rejected() {
        let (registry, builds) = registry(Duration::ZERO);
        let err = registry.get_or_initialize("nope").await.unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedBackend(_)));
        assert_eq!(builds.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let (registry, builds) = registry(Duration::ZERO);
        registry.get_or_initialize("test").await.unwrap();
        registry.get_or_initialize("test").await.unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_initialization_builds_once() {
        let (registry, builds) = registry(Duration::from_millis(10));

        let r1 = registry.clone();
        let r2 = registry.clone();
        let t1 = tokio::spawn(async move { r1.get_or_initialize("test").await });
        let t2 = tokio::spawn(async move { r2.get_or_initialize("test").await });

        let a = t1.await.unwrap();
        let b = t2.await.unwrap();

        // At least one succeeds; a loser reports retryable contention.
        assert!(a.is_ok() || b.is_ok());
        for res in [a, b] {
            if let Err(e) = res {
                assert!(matches!(e, RegistryError::InitializationInProgress(_)));
            }
        }
        // A follow-up call observes the cached handle without rebuilding.
        assert!(registry.get_or_initialize("test").await.is_ok());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_construction_reports_in_progress() {
        let (registry, builds) = registry(Duration::from_millis(400));

        let r1 = registry.clone();
        let t1 = tokio::spawn(async move { r1.get_or_initialize("test").await });
        // Give the first task time to take the guard.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = registry.get_or_initialize("test").await.unwrap_err();
        assert!(matches!(err, RegistryError::InitializationInProgress(_)));

        assert!(t1.await.unwrap().is_ok());
        // After construction completes, the handle is served from cache.
        assert!(registry.get_or_initialize("test").await.is_ok());
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }
}
