//! Once-per-page provider loading.
//!
//! Loads are memoized per script URL in a table owned by the UI thread. The
//! first caller starts the load; everyone else awaits the same shared
//! outcome. A failed or timed-out load is evicted so the next call starts
//! over.

use crate::{
    core::config::LoaderConfig,
    prelude::HashMap,
    runtime,
    traits::{LoadFuture, ProviderHandle, ScriptSource},
    LoadFailure, Result,
};
use futures::future::{FutureExt, Shared};
use std::{cell::RefCell, time::Duration};

type SharedLoad = Shared<LoadFuture>;

thread_local! {
    static LOADS: RefCell<HashMap<String, SharedLoad>> = RefCell::new(HashMap::default());
}

/// Makes a provider available, at most one load per script URL at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderLoader {
    timeout: Option<Duration>,
}

impl ProviderLoader {
    pub fn new(config: &LoaderConfig) -> Self {
        Self {
            timeout: config.timeout(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Resolve once the provider behind `source` is ready.
    ///
    /// Concurrent and later callers for the same URL share one `load()`.
    /// With a timeout configured, a caller gives up with
    /// [`LoadFailure::TimedOut`] and the pending load is evicted.
    pub async fn ensure_loaded(&self, source: &dyn ScriptSource) -> Result<ProviderHandle> {
        let url = source.url().to_string();
        let load = LOADS.with(|loads| {
            loads
                .borrow_mut()
                .entry(url.clone())
                .or_insert_with(|| {
                    log::info!("loading map provider from {}", url);
                    source.load().shared()
                })
                .clone()
        });

        let outcome = match self.timeout {
            Some(limit) => runtime::timeout(limit, load.clone())
                .await
                .unwrap_or(Err(LoadFailure::TimedOut(limit))),
            None => load.clone().await,
        };

        match outcome {
            Ok(provider) => Ok(provider),
            Err(failure) => {
                log::warn!("map provider load failed: {}", failure);
                evict(&url, &load);
                Err(failure.into())
            }
        }
    }

    /// Whether a load for `url` has completed successfully
    pub fn is_loaded(url: &str) -> bool {
        LOADS.with(|loads| {
            loads
                .borrow()
                .get(url)
                .and_then(|load| load.peek())
                .map_or(false, |outcome| outcome.is_ok())
        })
    }

    /// Drop the memo entry for `url`; the next caller loads again
    pub fn forget(url: &str) -> bool {
        LOADS.with(|loads| loads.borrow_mut().remove(url).is_some())
    }
}

impl Default for ProviderLoader {
    fn default() -> Self {
        Self::new(&LoaderConfig::default())
    }
}

// Only evict the load we awaited; a retry may already have replaced it.
fn evict(url: &str, load: &SharedLoad) {
    LOADS.with(|loads| {
        let mut loads = loads.borrow_mut();
        if loads.get(url).map_or(false, |current| current.ptr_eq(load)) {
            loads.remove(url);
        }
    });
}

#[cfg(all(test, feature = "tokio-runtime"))]
mod tests {
    use super::*;
    use crate::{
        core::geo::Point,
        provider::headless::{HeadlessProvider, HeadlessScriptSource, LoadBehavior},
        MapError,
    };

    fn source(url: &str, behavior: LoadBehavior) -> HeadlessScriptSource {
        HeadlessScriptSource::new(url, HeadlessProvider::new(Point::new(800.0, 600.0)))
            .with_behavior(behavior)
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let loader = ProviderLoader::new(&LoaderConfig::unbounded());
        let source = source("memo://shared", LoadBehavior::After(Duration::from_millis(5)));

        let (a, b, c) = futures::join!(
            loader.ensure_loaded(&source),
            loader.ensure_loaded(&source),
            loader.ensure_loaded(&source)
        );

        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(source.load_count(), 1);
        assert!(ProviderLoader::is_loaded("memo://shared"));

        // Later callers reuse the finished load too
        loader.ensure_loaded(&source).await.unwrap();
        assert_eq!(source.load_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_evicted() {
        let loader = ProviderLoader::new(&LoaderConfig::unbounded());
        let broken = source("memo://broken", LoadBehavior::Fail("404".to_string()));

        let outcome = loader.ensure_loaded(&broken).await;
        assert!(matches!(
            outcome,
            Err(MapError::ProviderLoad(LoadFailure::Script { ref reason, .. })) if reason == "404"
        ));
        assert!(!ProviderLoader::is_loaded("memo://broken"));

        let fixed = source("memo://broken", LoadBehavior::Immediate);
        loader.ensure_loaded(&fixed).await.unwrap();
        assert_eq!(fixed.load_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_load_times_out() {
        let loader = ProviderLoader::new(&LoaderConfig::with_timeout(Duration::from_secs(2)));
        let hung = source("memo://hung", LoadBehavior::Hang);

        let outcome = loader.ensure_loaded(&hung).await;
        assert!(matches!(
            outcome,
            Err(MapError::ProviderLoad(LoadFailure::TimedOut(d))) if d == Duration::from_secs(2)
        ));

        // Evicted, so a second attempt calls load() again
        let _ = loader.ensure_loaded(&hung).await;
        assert_eq!(hung.load_count(), 2);
    }

    #[tokio::test]
    async fn test_forget() {
        let loader = ProviderLoader::default();
        let source = source("memo://forget", LoadBehavior::Immediate);

        let handle = loader.ensure_loaded(&source).await.unwrap();
        assert_eq!(format!("{:?}", handle), r#"MapProvider { name: "headless" }"#);
        assert!(ProviderLoader::forget("memo://forget"));
        assert!(!ProviderLoader::forget("memo://forget"));

        loader.ensure_loaded(&source).await.unwrap();
        assert_eq!(source.load_count(), 2);
    }
}
