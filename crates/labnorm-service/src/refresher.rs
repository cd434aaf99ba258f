//! Background catalog refresh.

use std::sync::Arc;
use std::time::Duration;

use labnorm_loader::ReferenceCatalog;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Shortest interval between staleness checks.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(1);

/// Spawns a task that reloads the catalog whenever it is missing or stale.
///
/// Staleness is checked every `interval`. A failed reload is logged and
/// retried on the next tick; the previous snapshot keeps serving. Abort the
/// returned handle to stop refreshing. A zero interval is raised to
/// [`MIN_REFRESH_INTERVAL`].
pub fn spawn_refresher(catalog: Arc<ReferenceCatalog>, interval: Duration) -> JoinHandle<()> {
    let interval = interval.max(MIN_REFRESH_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if catalog.current().is_some() && !catalog.is_stale() {
                continue;
            }

            debug!("Reference catalog is due for refresh");
            if let Err(e) = catalog.reload().await {
                warn!("Scheduled catalog refresh failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use labnorm_loader::{CatalogConfig, CatalogRecords, CatalogResult, CatalogSource};

    use super::*;

    #[derive(Default)]
    struct CountingSource {
        fetches: AtomicUsize,
    }

    impl CatalogSource for CountingSource {
        fn fetch(&self) -> CatalogResult<CatalogRecords> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(CatalogRecords::default())
        }
    }

    #[tokio::test]
    async fn test_refresher_reloads_stale_catalog() {
        let source = Arc::new(CountingSource::default());
        let catalog = Arc::new(ReferenceCatalog::new(
            source.clone(),
            CatalogConfig::default().with_ttl(Duration::ZERO),
        ));

        let handle = spawn_refresher(Arc::clone(&catalog), Duration::from_millis(10));
        for _ in 0..200 {
            if source.fetches.load(Ordering::SeqCst) >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handle.abort();

        assert!(source.fetches.load(Ordering::SeqCst) >= 2);
        assert!(catalog.current().is_some());
    }

    #[tokio::test]
    async fn test_refresher_survives_zero_interval() {
        let source = Arc::new(CountingSource::default());
        let catalog = Arc::new(ReferenceCatalog::new(source.clone(), CatalogConfig::default()));

        let handle = spawn_refresher(Arc::clone(&catalog), Duration::ZERO);
        for _ in 0..200 {
            if catalog.current().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(!handle.is_finished());
        handle.abort();
        assert!(catalog.current().is_some());
    }

    #[tokio::test]
    async fn test_refresher_leaves_fresh_catalog_alone() {
        let source = Arc::new(CountingSource::default());
        let catalog = Arc::new(ReferenceCatalog::new(source.clone(), CatalogConfig::default()));
        catalog.reload().await.unwrap();

        let handle = spawn_refresher(Arc::clone(&catalog), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }
}
