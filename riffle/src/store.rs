//! CatalogSearch - the service the catalog's serving layer talks to
//!
//! Owns a corpus provider and a `SearchEngine`. The index is built lazily on
//! the first query and replaced wholesale by `rebuild`.
//!
//! Async Cancellation Architecture:
//! The async entry points run the scoring pipeline on a blocking thread. When
//! the caller drops the future, a drop guard fires a `CancellationToken`; the
//! scoring loop checks it between batches and bails out with `Cancelled`.

use std::sync::{Arc, Once};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::SearchConfig;
use crate::corpus::CorpusProvider;
use crate::interface::{CatalogSearchApi, IndexStats, RiffleError, SearchQuery, SearchResponse, Suggestion};
use crate::search::SearchEngine;

/// Runtime for async calls made outside any tokio context (e.g. `futures::executor`).
/// Shared by every `CatalogSearch` and never dropped. `None` if it couldn't be created,
/// in which case the pipeline runs inline on the caller's thread.
static FALLBACK_RUNTIME: Lazy<Option<tokio::runtime::Runtime>> = Lazy::new(|| {
    match tokio::runtime::Builder::new_multi_thread()
        .thread_name("riffle-fallback")
        .enable_all()
        .build()
    {
        Ok(runtime) => Some(runtime),
        Err(e) => {
            tracing::warn!(error = %e, "failed to create fallback runtime, searching inline");
            None
        }
    }
});

static RAYON_INIT: Once = Once::new();

/// Initialize the global rayon pool with core reservation and lower priority
fn init_rayon() {
    RAYON_INIT.call_once(|| {
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        // Leave 2 cores to tokio so the serving layer stays responsive
        let rayon_threads = num_threads.saturating_sub(2).max(1);

        let built = rayon::ThreadPoolBuilder::new()
            .num_threads(rayon_threads)
            .thread_name(|i| format!("riffle-rayon-{}", i))
            .start_handler(|_| {
                use thread_priority::*;
                if let Err(e) = set_current_thread_priority(ThreadPriority::Min) {
                    tracing::debug!(error = ?e, "could not lower rayon thread priority");
                }
            })
            .build_global();
        // The host application may own the global pool already
        match built {
            Ok(()) => tracing::debug!(threads = rayon_threads, "rayon global pool initialised"),
            Err(e) => tracing::debug!(error = %e, "rayon global pool already set, using it"),
        }
    });
}

/// Current runtime if there is one, otherwise the global fallback
fn runtime_handle() -> Option<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current()
        .ok()
        .or_else(|| FALLBACK_RUNTIME.as_ref().map(|rt| rt.handle().clone()))
}

/// State shared with blocking search threads
struct Catalog {
    provider: Arc<dyn CorpusProvider>,
    engine: SearchEngine,
    build_lock: Mutex<()>,
}

impl Catalog {
    /// Build the index on first use. Concurrent first queries build it once.
    fn ensure_indexed(&self) -> Result<(), RiffleError> {
        if self.engine.is_built() {
            return Ok(());
        }
        let _lock = self.build_lock.lock();
        if self.engine.is_built() {
            return Ok(());
        }
        self.fetch_and_rebuild()?;
        Ok(())
    }

    fn rebuild(&self) -> Result<IndexStats, RiffleError> {
        let _lock = self.build_lock.lock();
        self.fetch_and_rebuild()
    }

    /// Caller holds `build_lock`
    fn fetch_and_rebuild(&self) -> Result<IndexStats, RiffleError> {
        let records = self.provider.fetch_corpus().map_err(|e| {
            tracing::warn!(error = %e, "corpus fetch failed, keeping current snapshot");
            e
        })?;
        Ok(self.engine.rebuild(records))
    }

    fn search(&self, query: &SearchQuery, token: &CancellationToken) -> Result<SearchResponse, RiffleError> {
        query.check()?;
        self.ensure_indexed()?;
        self.engine.search_with_token(query, token)
    }

    fn suggest(&self, partial: &str, limit: usize, token: &CancellationToken) -> Result<Vec<Suggestion>, RiffleError> {
        crate::interface::check_suggest_args(partial, limit)?;
        self.ensure_indexed()?;
        self.engine.suggest_with_token(partial, limit, token)
    }
}

/// Thread-safe catalog search service
///
/// Concurrency Model:
/// - Queries read an immutable snapshot; a rebuild swaps it atomically
/// - Async search/suggest run on tokio blocking threads with cancellation
/// - Uses the global FALLBACK_RUNTIME when called outside any runtime
/// - Large snapshots are scored on the shared rayon pool
pub struct CatalogSearch {
    catalog: Arc<Catalog>,
}

impl CatalogSearch {
    /// Fails with `Configuration` on an invalid config. Doesn't touch the provider.
    pub fn new(provider: Arc<dyn CorpusProvider>, config: SearchConfig) -> Result<Self, RiffleError> {
        init_rayon();
        let engine = SearchEngine::new(config)?;
        Ok(Self {
            catalog: Arc::new(Catalog {
                provider,
                engine,
                build_lock: Mutex::new(()),
            }),
        })
    }

    /// Service over the book catalog weighting (title, author, genre)
    pub fn books(provider: Arc<dyn CorpusProvider>) -> Result<Self, RiffleError> {
        Self::new(provider, SearchConfig::books())
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.catalog.engine
    }

    /// Blocking search on the caller's thread
    pub fn search_sync(&self, query: &SearchQuery) -> Result<SearchResponse, RiffleError> {
        self.catalog.search(query, &CancellationToken::new())
    }

    /// Blocking suggest on the caller's thread
    pub fn suggest_sync(&self, partial: &str, limit: usize) -> Result<Vec<Suggestion>, RiffleError> {
        self.catalog.suggest(partial, limit, &CancellationToken::new())
    }
}

#[async_trait::async_trait]
impl CatalogSearchApi for CatalogSearch {
    async fn search(&self, query: SearchQuery) -> Result<SearchResponse, RiffleError> {
        // Reject bad input before touching a thread
        query.check()?;

        let token = CancellationToken::new();
        let _guard = token.clone().drop_guard();

        let catalog = Arc::clone(&self.catalog);
        let Some(runtime) = runtime_handle() else {
            return catalog.search(&query, &token);
        };

        let token_clone = token.clone();
        let handle = runtime.spawn_blocking(move || catalog.search(&query, &token_clone));

        match handle.await {
            Ok(result) => result,
            Err(_join_error) => Err(RiffleError::Cancelled),
        }
    }

    async fn suggest(&self, partial: String, limit: usize) -> Result<Vec<Suggestion>, RiffleError> {
        crate::interface::check_suggest_args(&partial, limit)?;

        let token = CancellationToken::new();
        let _guard = token.clone().drop_guard();

        let catalog = Arc::clone(&self.catalog);
        let Some(runtime) = runtime_handle() else {
            return catalog.suggest(&partial, limit, &token);
        };

        let token_clone = token.clone();
        let handle = runtime.spawn_blocking(move || catalog.suggest(&partial, limit, &token_clone));

        match handle.await {
            Ok(result) => result,
            Err(_join_error) => Err(RiffleError::Cancelled),
        }
    }

    fn rebuild(&self) -> Result<IndexStats, RiffleError> {
        self.catalog.rebuild()
    }

    fn record_count(&self) -> usize {
        self.catalog.engine.num_records()
    }
}
