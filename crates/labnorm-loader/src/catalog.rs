//! The published reference catalog.
//!
//! [`ReferenceCatalog`] owns the current [`CatalogSnapshot`] and replaces it
//! wholesale on reload. Readers clone an `Arc` and keep it for the duration
//! of their call, so a concurrent reload is never partially observable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::snapshot::CatalogSnapshot;
use crate::source::CatalogSource;
use crate::types::{CatalogConfig, CatalogError, CatalogResult};

/// Lifecycle state of the reference catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogState {
    /// Nothing has been published yet.
    Unloaded,
    /// A reload is in flight.
    Loading,
    /// A fresh snapshot is published.
    Ready,
    /// The published snapshot is past its TTL (it is still served).
    Stale,
}

/// Summary of the published catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogStats {
    /// Current state.
    pub state: CatalogState,
    /// Number of categories.
    pub categories: usize,
    /// Number of analytes.
    pub analytes: usize,
    /// Number of indexed synonym keys.
    pub synonyms: usize,
    /// Number of stored unit spellings.
    pub conversions: usize,
    /// When the published snapshot was built.
    pub loaded_at: Option<DateTime<Utc>>,
    /// Export date of the store, when known.
    pub export_date: Option<String>,
}

struct Published {
    snapshot: Arc<CatalogSnapshot>,
    /// `None` when the TTL is too large to represent: never stale.
    refresh_due: Option<Instant>,
}

impl Published {
    fn is_stale(&self) -> bool {
        self.refresh_due.is_some_and(|due| Instant::now() >= due)
    }
}

/// Outcome of the most recent reload attempt.
#[derive(Default)]
struct ReloadSlot {
    /// Reload requests answered by `last`.
    answered: u64,
    last: Option<Result<Arc<CatalogSnapshot>, String>>,
}

/// Handle to the reference catalog.
///
/// Construct one per process and share it by `Arc`.
pub struct ReferenceCatalog {
    source: Arc<dyn CatalogSource>,
    config: CatalogConfig,
    published: RwLock<Option<Published>>,
    requests: AtomicU64,
    reload: Mutex<ReloadSlot>,
}

impl std::fmt::Debug for ReferenceCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceCatalog")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

impl ReferenceCatalog {
    /// Creates an unloaded catalog reading from `source`.
    pub fn new(source: Arc<dyn CatalogSource>, config: CatalogConfig) -> Self {
        Self {
            source,
            config,
            published: RwLock::new(None),
            requests: AtomicU64::new(0),
            reload: Mutex::new(ReloadSlot::default()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Reads the store, builds a new snapshot and publishes it.
    ///
    /// Concurrent calls coalesce: a caller that waited while another reload
    /// completed receives that reload's outcome instead of reading the store
    /// again. On failure the previous snapshot stays published.
    ///
    /// # Errors
    /// Returns the store's error, or [`CatalogError::CoalescedReloadFailed`]
    /// when the awaited reload failed.
    pub async fn reload(&self) -> CatalogResult<Arc<CatalogSnapshot>> {
        let ticket = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        let mut slot = self.reload.lock().await;

        if slot.answered >= ticket {
            debug!("Catalog reload coalesced with a concurrent one");
            return match &slot.last {
                Some(Ok(snapshot)) => Ok(Arc::clone(snapshot)),
                Some(Err(message)) => Err(CatalogError::CoalescedReloadFailed {
                    message: message.clone(),
                }),
                None => Err(CatalogError::NotLoaded),
            };
        }

        let source = Arc::clone(&self.source);
        let config = self.config.clone();
        let started = Instant::now();
        let result =
            match tokio::task::spawn_blocking(move || CatalogSnapshot::load(source.as_ref(), &config))
                .await
            {
                Ok(result) => result,
                Err(e) => Err(CatalogError::Unavailable(format!("catalog load task failed: {e}"))),
            };

        // Everyone who asked before now is answered by this attempt.
        slot.answered = self.requests.load(Ordering::SeqCst);

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.publish(Arc::clone(&snapshot));
                slot.last = Some(Ok(Arc::clone(&snapshot)));
                info!(
                    "Reference catalog loaded in {:?}: {} categories, {} analytes, {} synonyms",
                    started.elapsed(),
                    snapshot.category_count(),
                    snapshot.analyte_count(),
                    snapshot.synonym_count()
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!("Reference catalog reload failed, keeping previous snapshot: {}", e);
                slot.last = Some(Err(e.to_string()));
                Err(e)
            }
        }
    }

    fn publish(&self, snapshot: Arc<CatalogSnapshot>) {
        let mut published = self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *published = Some(Published {
            snapshot,
            refresh_due: Instant::now().checked_add(self.config.ttl),
        });
    }

    /// Returns the published snapshot, stale or not. Never blocks on a reload.
    pub fn current(&self) -> Option<Arc<CatalogSnapshot>> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|p| Arc::clone(&p.snapshot))
    }

    /// Returns the published snapshot or [`CatalogError::NotLoaded`].
    pub fn snapshot(&self) -> CatalogResult<Arc<CatalogSnapshot>> {
        self.current().ok_or(CatalogError::NotLoaded)
    }

    /// Returns the published snapshot, starting a background reload if it is
    /// missing or stale.
    ///
    /// Outside a tokio runtime no reload is started.
    pub fn current_or_refresh(self: &Arc<Self>) -> Option<Arc<CatalogSnapshot>> {
        let current = self.current();
        let due = current.is_none() || self.is_stale();

        if due && self.reload.try_lock().is_ok() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let catalog = Arc::clone(self);
                    handle.spawn(async move {
                        // Failures are logged by reload; the old snapshot keeps serving.
                        let _ = catalog.reload().await;
                    });
                }
                Err(_) => debug!("No tokio runtime; skipping background catalog refresh"),
            }
        }

        current
    }

    /// Marks the published snapshot stale so the next refresh reloads it.
    pub fn invalidate(&self) {
        let mut published = self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(p) = published.as_mut() {
            p.refresh_due = Some(Instant::now());
        }
        debug!("Reference catalog invalidated");
    }

    /// Returns true if the published snapshot is past its TTL.
    pub fn is_stale(&self) -> bool {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(Published::is_stale)
    }

    /// Returns true while a reload is in flight.
    pub fn is_loading(&self) -> bool {
        self.reload.try_lock().is_err()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> CatalogState {
        if self.is_loading() {
            return CatalogState::Loading;
        }
        let published = self
            .published
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match published.as_ref() {
            None => CatalogState::Unloaded,
            Some(p) if p.is_stale() => CatalogState::Stale,
            Some(_) => CatalogState::Ready,
        }
    }

    /// Returns counts and timing of the published snapshot.
    pub fn stats(&self) -> CatalogStats {
        let state = self.state();
        match self.current() {
            Some(snapshot) => CatalogStats {
                state,
                categories: snapshot.category_count(),
                analytes: snapshot.analyte_count(),
                synonyms: snapshot.synonym_count(),
                conversions: snapshot.conversion_count(),
                loaded_at: Some(snapshot.loaded_at()),
                export_date: snapshot.export_date().map(str::to_string),
            },
            None => CatalogStats {
                state,
                categories: 0,
                analytes: 0,
                synonyms: 0,
                conversions: 0,
                loaded_at: None,
                export_date: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    use super::*;
    use crate::fixtures::sample_records;
    use crate::source::{CatalogRecords, StaticCatalogSource};

    /// A source that counts fetches and can be made to fail or stall.
    #[derive(Default)]
    struct TestSource {
        fetches: AtomicUsize,
        failing: AtomicBool,
        delay: Option<Duration>,
        shrink_on_odd: bool,
    }

    impl TestSource {
        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Default::default()
            }
        }
    }

    impl CatalogSource for TestSource {
        fn fetch(&self) -> CatalogResult<CatalogRecords> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(CatalogError::Unavailable("connection refused".to_string()));
            }
            let mut records = sample_records();
            if self.shrink_on_odd && n % 2 == 1 {
                records.analytes.truncate(2);
            }
            Ok(records)
        }
    }

    fn make_catalog(source: Arc<dyn CatalogSource>) -> Arc<ReferenceCatalog> {
        Arc::new(ReferenceCatalog::new(source, CatalogConfig::default()))
    }

    #[tokio::test]
    async fn test_unloaded_catalog() {
        let catalog = make_catalog(Arc::new(StaticCatalogSource::new(sample_records())));

        assert_eq!(catalog.state(), CatalogState::Unloaded);
        assert!(catalog.current().is_none());
        assert!(matches!(catalog.snapshot(), Err(CatalogError::NotLoaded)));
        assert_eq!(catalog.stats().analytes, 0);
    }

    #[tokio::test]
    async fn test_reload_publishes_snapshot() {
        let catalog = make_catalog(Arc::new(StaticCatalogSource::new(sample_records())));

        let snapshot = catalog.reload().await.unwrap();
        assert_eq!(catalog.state(), CatalogState::Ready);
        assert!(Arc::ptr_eq(&snapshot, &catalog.current().unwrap()));

        let stats = catalog.stats();
        assert_eq!(stats.state, CatalogState::Ready);
        assert_eq!(stats.categories, 3);
        assert_eq!(stats.analytes, snapshot.analyte_count());
        assert!(stats.loaded_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_snapshot() {
        let source = Arc::new(TestSource::default());
        let catalog = make_catalog(source.clone());

        let first = catalog.reload().await.unwrap();
        source.failing.store(true, Ordering::SeqCst);

        let result = catalog.reload().await;
        assert!(matches!(result, Err(CatalogError::Unavailable(_))));
        assert!(Arc::ptr_eq(&first, &catalog.current().unwrap()));
        assert_eq!(catalog.state(), CatalogState::Ready);
    }

    #[tokio::test]
    async fn test_first_load_failure_leaves_unloaded() {
        let source = Arc::new(TestSource::default());
        source.failing.store(true, Ordering::SeqCst);
        let catalog = make_catalog(source);

        assert!(catalog.reload().await.is_err());
        assert_eq!(catalog.state(), CatalogState::Unloaded);
    }

    #[tokio::test]
    async fn test_invalidate_marks_stale_but_keeps_serving() {
        let catalog = make_catalog(Arc::new(StaticCatalogSource::new(sample_records())));
        catalog.reload().await.unwrap();

        catalog.invalidate();
        assert!(catalog.is_stale());
        assert_eq!(catalog.state(), CatalogState::Stale);
        assert!(catalog.current().is_some());
    }

    #[tokio::test]
    async fn test_unbounded_ttl_never_goes_stale() {
        let catalog = Arc::new(ReferenceCatalog::new(
            Arc::new(StaticCatalogSource::new(sample_records())),
            CatalogConfig::default().with_ttl(Duration::from_secs(u64::MAX)),
        ));

        let handle = tokio::spawn({
            let catalog = Arc::clone(&catalog);
            async move { catalog.reload().await.map(|_| ()) }
        });
        assert!(handle.await.unwrap().is_ok());
        assert!(!catalog.is_stale());
        assert_eq!(catalog.state(), CatalogState::Ready);

        catalog.invalidate();
        assert_eq!(catalog.state(), CatalogState::Stale);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_reloads_coalesce() {
        let source = Arc::new(TestSource::slow(Duration::from_millis(200)));
        let catalog = make_catalog(source.clone());

        let (a, b, c) = tokio::join!(catalog.reload(), catalog.reload(), catalog.reload());
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_coalesced_failure_is_reported() {
        let source = Arc::new(TestSource::slow(Duration::from_millis(200)));
        source.failing.store(true, Ordering::SeqCst);
        let catalog = make_catalog(source.clone());

        let (a, b) = tokio::join!(catalog.reload(), catalog.reload());
        let errors = [a.unwrap_err(), b.unwrap_err()];

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, CatalogError::CoalescedReloadFailed { .. }))
                .count(),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_see_whole_snapshots_during_reload() {
        let source = Arc::new(TestSource {
            shrink_on_odd: true,
            ..Default::default()
        });
        let catalog = make_catalog(source);
        let full = catalog.reload().await.unwrap().analyte_count();

        let mut readers = Vec::new();
        for _ in 0..4 {
            let catalog = Arc::clone(&catalog);
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let snapshot = catalog.current().unwrap();
                    let count = snapshot.analyte_count();
                    assert!(count == full || count == 2);
                    assert!(snapshot
                        .analytes()
                        .iter()
                        .all(|a| snapshot.analyte(&a.id).is_some() && snapshot.category_of(a).is_some()));
                    tokio::task::yield_now().await;
                }
            }));
        }
        for _ in 0..10 {
            catalog.reload().await.unwrap();
        }
        for reader in readers {
            reader.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_current_or_refresh_reloads_in_background() {
        let source = Arc::new(TestSource::default());
        let catalog = Arc::new(ReferenceCatalog::new(
            source.clone(),
            CatalogConfig::default().with_ttl(Duration::ZERO),
        ));

        // Nothing published yet: returns None and starts a load.
        assert!(catalog.current_or_refresh().is_none());
        for _ in 0..100 {
            if catalog.current().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let first = catalog.current().unwrap();

        // TTL zero: always stale, so the stale snapshot is served and replaced.
        let served = catalog.current_or_refresh().unwrap();
        assert!(Arc::ptr_eq(&first, &served));
        for _ in 0..100 {
            if source.fetches.load(Ordering::SeqCst) >= 2 && !catalog.is_loading() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!Arc::ptr_eq(&first, &catalog.current().unwrap()));
    }
}
