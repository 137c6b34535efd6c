use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError, TryLockError,
};

use dashmap::DashMap;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::{ModelKey, ModelLoader, TranslationModel};

type Slot = Arc<Mutex<Option<Arc<dyn TranslationModel>>>>;

/// Memoizes one model pair per (src, tgt) key for the life of the process.
///
/// Each key owns a slot guarded by its own mutex, so two requests racing on an
/// unseen key load it once while other keys keep loading in parallel. A failed
/// load leaves the slot empty and the next caller retries. Nothing is evicted.
pub struct ModelCache {
    loader: Arc<dyn ModelLoader>,
    slots: DashMap<ModelKey, Slot>,
    loads: AtomicU64,
}

impl ModelCache {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            slots: DashMap::new(),
            loads: AtomicU64::new(0),
        }
    }

    /// Return the cached pair for `key`, loading it on first use.
    pub fn get(&self, key: &ModelKey) -> Result<Arc<dyn TranslationModel>> {
        // Clone the slot out so the shard lock is not held while loading
        let slot = self.slots.entry(key.clone()).or_default().clone();

        // A loader that panicked leaves the slot empty, so a poisoned lock is
        // safe to take over and the load is retried
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(model) = guard.as_ref() {
            debug!(pair = %key, "model cache hit");
            return Ok(model.clone());
        }

        info!(pair = %key, "loading translation model");
        self.loads.fetch_add(1, Ordering::Relaxed);
        let model = self.loader.load(key)?;
        *guard = Some(model.clone());
        Ok(model)
    }

    /// Number of keys holding a loaded model. Keys still loading are not counted.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|entry| is_loaded(entry.value())).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` holds a loaded model. Never waits on an in-flight load.
    pub fn contains(&self, key: &ModelKey) -> bool {
        self.slots.get(key).is_some_and(|slot| is_loaded(&slot))
    }

    /// Total loader invocations, successful or not.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}

fn is_loaded(slot: &Slot) -> bool {
    match slot.try_lock() {
        Ok(guard) => guard.is_some(),
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_some(),
        Err(TryLockError::WouldBlock) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslateError;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Duration;

    struct Echo(String);

    impl TranslationModel for Echo {
        fn translate(&self, text: &str) -> Result<String> {
            Ok(format!("[{}] {}", self.0, text))
        }
    }

    #[derive(Default)]
    struct CountingLoader {
        calls: AtomicUsize,
        fail_first: bool,
        delay: Option<Duration>,
    }

    impl ModelLoader for CountingLoader {
        fn load(&self, key: &ModelKey) -> Result<Arc<dyn TranslationModel>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(d) = self.delay {
                std::thread::sleep(d);
            }
            if self.fail_first && n == 0 {
                return Err(TranslateError::ModelLoad {
                    model: key.to_string(),
                    source: anyhow::anyhow!("network unavailable"),
                });
            }
            Ok(Arc::new(Echo(key.to_string())))
        }
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let loader = Arc::new(CountingLoader::default());
        let cache = ModelCache::new(loader.clone());
        let key = ModelKey::new("en", "fr");

        let a = cache.get(&key).unwrap();
        let b = cache.get(&key).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.load_count(), 1);
        assert!(cache.contains(&key));
    }

    #[test]
    fn distinct_pairs_get_distinct_models() {
        let loader = Arc::new(CountingLoader::default());
        let cache = ModelCache::new(loader.clone());

        let fr = cache.get(&ModelKey::new("en", "fr")).unwrap();
        let de = cache.get(&ModelKey::new("en", "de")).unwrap();

        assert_eq!(fr.translate("hi").unwrap(), "[en-fr] hi");
        assert_eq!(de.translate("hi").unwrap(), "[en-de] hi");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failed_load_is_not_cached() {
        let loader = Arc::new(CountingLoader {
            fail_first: true,
            ..Default::default()
        });
        let cache = ModelCache::new(loader.clone());
        let key = ModelKey::new("xx", "fr");

        assert!(matches!(
            cache.get(&key),
            Err(TranslateError::ModelLoad { .. })
        ));
        assert!(!cache.contains(&key));
        assert!(cache.is_empty());

        assert!(cache.get(&key).is_ok());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_misses_load_once() {
        let loader = Arc::new(CountingLoader {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let cache = Arc::new(ModelCache::new(loader.clone()));
        let key = ModelKey::new("de", "en");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let key = key.clone();
                std::thread::spawn(move || cache.get(&key).map(|_| ()))
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    struct PanicFirstLoader {
        calls: AtomicUsize,
    }

    impl ModelLoader for PanicFirstLoader {
        fn load(&self, key: &ModelKey) -> Result<Arc<dyn TranslationModel>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("loader crashed");
            }
            Ok(Arc::new(Echo(key.to_string())))
        }
    }

    #[test]
    fn panicking_load_is_retried() {
        let loader = Arc::new(PanicFirstLoader {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(ModelCache::new(loader.clone()));
        let key = ModelKey::new("en", "es");

        let crashed = {
            let cache = cache.clone();
            let key = key.clone();
            std::thread::spawn(move || cache.get(&key).map(|_| ())).join()
        };
        assert!(crashed.is_err());
        assert!(!cache.contains(&key));

        let model = cache.get(&key).unwrap();
        assert_eq!(model.translate("hola").unwrap(), "[en-es] hola");
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    /// Blocks inside `load` until released.
    struct GatedLoader {
        started: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl ModelLoader for GatedLoader {
        fn load(&self, key: &ModelKey) -> Result<Arc<dyn TranslationModel>> {
            self.started.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            Ok(Arc::new(Echo(key.to_string())))
        }
    }

    #[test]
    fn inspection_does_not_wait_for_inflight_load() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let cache = Arc::new(ModelCache::new(Arc::new(GatedLoader {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        })));
        let key = ModelKey::new("fr", "en");

        let loading = {
            let cache = cache.clone();
            let key = key.clone();
            std::thread::spawn(move || cache.get(&key).map(|_| ()))
        };
        started_rx.recv().unwrap();

        // The slot is held by the loading thread; these must return at once
        assert!(!cache.contains(&key));
        assert_eq!(cache.len(), 0);

        release_tx.send(()).unwrap();
        loading.join().unwrap().unwrap();
        assert!(cache.contains(&key));
        assert_eq!(cache.len(), 1);
    }
}
