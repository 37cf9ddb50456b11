//! The retrieval facade.
//!
//! [`RetrievalService`] owns the corpus for the life of the process. It moves
//! through `Uninitialized -> Initializing -> Ready | Failed` exactly once:
//! load the saved index if it is usable, otherwise build it from records and
//! save it. Queries made before `Ready`, or after `Failed`, get empty
//! results instead of errors.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};
use serde::Serialize;
use tokio::sync::watch;

use crate::config::Settings;
use crate::corpus::{DocumentBuilder, JsonFileSource, RecordSource, load_records};
use crate::error::InitError;
use crate::semantic::{Corpus, CorpusStore, SearchResult, SemanticError, format_context};
use crate::vector::{EmbeddingGenerator, FastEmbedGenerator, VectorError};

/// Produces the embedding model. Called once, on the initialization thread.
pub type ModelLoader =
    Box<dyn Fn() -> Result<Arc<dyn EmbeddingGenerator>, VectorError> + Send + Sync>;

/// Lifecycle of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl ServiceState {
    /// `Ready` and `Failed` are never left.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime parameters of the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub index_path: PathBuf,
    pub index_name: String,
    pub top_k: usize,
    pub batch_size: usize,
    pub query_timeout: Duration,
}

impl ServiceConfig {
    /// Defaults from [`Settings::default`] with the index stored at `index_path`.
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        let mut config = Self::from_settings(&Settings::default());
        config.index_path = index_path.into();
        config
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            index_path: settings.index_dir(),
            index_name: settings.corpus.index_name.clone(),
            top_k: settings.semantic.top_k,
            batch_size: settings.semantic.batch_size,
            query_timeout: Duration::from_millis(settings.semantic.query_timeout_ms),
        }
    }
}

/// Snapshot for health checks. Cheap, never blocks on initialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub initialized: bool,
    pub total_documents: usize,
    pub index_size: usize,
    pub state: ServiceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

/// Everything needed to answer queries, published as one unit.
struct Engine {
    corpus: Corpus,
    embedder: Arc<dyn EmbeddingGenerator>,
}

impl Engine {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>, SemanticError> {
        if self.corpus.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let vector = self
            .embedder
            .generate_embeddings(&[query])?
            .pop()
            .ok_or_else(|| VectorError::EmbeddingFailed("model returned no embedding".into()))?;
        self.corpus.search(&vector, top_k)
    }
}

enum Phase {
    Uninitialized,
    Initializing,
    Ready(Arc<Engine>),
    Failed(Arc<InitError>),
}

impl Phase {
    fn state(&self) -> ServiceState {
        match self {
            Phase::Uninitialized => ServiceState::Uninitialized,
            Phase::Initializing => ServiceState::Initializing,
            Phase::Ready(_) => ServiceState::Ready,
            Phase::Failed(_) => ServiceState::Failed,
        }
    }
}

/// Shared retrieval facade. Wrap in an `Arc` and hand clones to request handlers.
pub struct RetrievalService {
    config: ServiceConfig,
    loader: ModelLoader,
    source: Arc<dyn RecordSource>,
    phase: RwLock<Phase>,
    state_tx: watch::Sender<ServiceState>,
    settle_lock: Mutex<()>,
    settled: Condvar,
}

impl std::fmt::Debug for RetrievalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalService")
            .field("config", &self.config)
            .field("source", &self.source.describe())
            .field("state", &self.state())
            .finish()
    }
}

impl RetrievalService {
    pub fn new(config: ServiceConfig, loader: ModelLoader, source: Arc<dyn RecordSource>) -> Self {
        let (state_tx, _) = watch::channel(ServiceState::Uninitialized);
        Self {
            config,
            loader,
            source,
            phase: RwLock::new(Phase::Uninitialized),
            state_tx,
            settle_lock: Mutex::new(()),
            settled: Condvar::new(),
        }
    }

    /// Service backed by an already loaded embedding model.
    pub fn with_embedder(
        config: ServiceConfig,
        embedder: Arc<dyn EmbeddingGenerator>,
        source: Arc<dyn RecordSource>,
    ) -> Self {
        Self::new(config, Box::new(move || Ok(Arc::clone(&embedder))), source)
    }

    /// Service using the configured fastembed model and constituents list.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let model = settings.semantic.model.clone();
        let cache_dir = settings.models_dir();
        let loader: ModelLoader = Box::new(move || {
            let generator = FastEmbedGenerator::new(&model, &cache_dir, false)?;
            Ok(Arc::new(generator) as Arc<dyn EmbeddingGenerator>)
        });
        let source = Arc::new(JsonFileSource::new(settings.records_file()));
        Self::new(ServiceConfig::from_settings(settings), loader, source)
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> ServiceState {
        self.phase.read().state()
    }

    /// Starts initialization in the background and returns immediately.
    ///
    /// Runs on tokio's blocking pool when called inside a runtime, otherwise on
    /// a dedicated thread. Calls after the first are no-ops.
    pub fn initialize(self: &Arc<Self>) {
        if !self.begin() {
            tracing::debug!(state = %self.state(), "initialize already requested");
            return;
        }

        let service = Arc::clone(self);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let task = handle.spawn_blocking(move || service.run_initialization());
                let watcher = Arc::clone(self);
                handle.spawn(async move {
                    if let Err(e) = task.await {
                        watcher.finish(Err(InitError::Aborted(e.to_string())));
                    }
                });
            }
            Err(_) => {
                let spawned = std::thread::Builder::new()
                    .name("tickrag-init".to_string())
                    .spawn(move || service.run_initialization());
                if let Err(e) = spawned {
                    self.finish(Err(InitError::Aborted(e.to_string())));
                }
            }
        }
    }

    /// Initializes on the calling thread and returns the resulting state.
    ///
    /// If initialization is already running elsewhere, waits for it instead of
    /// starting a second one.
    pub fn initialize_blocking(&self) -> ServiceState {
        if self.begin() {
            self.run_initialization();
        }

        let mut guard = self.settle_lock.lock();
        loop {
            let state = self.state();
            if state.is_terminal() {
                return state;
            }
            self.settled.wait(&mut guard);
        }
    }

    /// Resolves once the service reaches `Ready` or `Failed`.
    ///
    /// Never resolves if `initialize` is never called.
    pub async fn wait_ready(&self) -> ServiceState {
        let mut rx = self.state_tx.subscribe();
        let settled = rx.wait_for(|state| state.is_terminal()).await.map(|s| *s);
        settled.unwrap_or_else(|_| self.state())
    }

    /// Ranked documents for `query`. Empty when not ready or on any query error.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        let Some(engine) = self.engine() else {
            tracing::debug!(state = %self.state(), "search before ready, returning no results");
            return Vec::new();
        };

        match engine.search(query, top_k) {
            Ok(results) => {
                tracing::debug!(query, top_k, results = results.len(), "search");
                results
            }
            Err(e) => {
                tracing::warn!(error = %e, "query failed, returning no results");
                Vec::new()
            }
        }
    }

    /// Context block for `query` using the configured `top_k`.
    pub fn get_context(&self, query: &str) -> String {
        self.get_context_with_limit(query, self.config.top_k)
    }

    /// Context block built from the top `top_k` results, one entry per symbol.
    pub fn get_context_with_limit(&self, query: &str, top_k: usize) -> String {
        format_context(&self.config.index_name, self.search(query, top_k))
    }

    /// [`get_context`](Self::get_context) off the async executor, bounded by
    /// the configured query timeout. A timeout yields an empty string.
    pub async fn get_context_async(self: &Arc<Self>, query: &str) -> String {
        if self.engine().is_none() {
            return String::new();
        }

        let service = Arc::clone(self);
        let query = query.to_string();
        let task = tokio::task::spawn_blocking(move || service.get_context(&query));

        match tokio::time::timeout(self.config.query_timeout, task).await {
            Ok(Ok(context)) => context,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "query task failed, returning no context");
                String::new()
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.query_timeout.as_millis() as u64,
                    "query timed out, returning no context"
                );
                String::new()
            }
        }
    }

    pub fn get_status(&self) -> Status {
        let phase = self.phase.read();
        let (total_documents, index_size) = match &*phase {
            Phase::Ready(engine) => (engine.corpus.len(), engine.corpus.index().row_count()),
            _ => (0, 0),
        };
        let (error, error_code) = match &*phase {
            Phase::Failed(e) => (Some(e.to_string()), Some(e.status_code())),
            _ => (None, None),
        };
        Status {
            initialized: matches!(*phase, Phase::Ready(_)),
            total_documents,
            index_size,
            state: phase.state(),
            error,
            error_code,
        }
    }

    /// The error that sent the service to `Failed`, if any.
    #[must_use]
    pub fn init_error(&self) -> Option<Arc<InitError>> {
        match &*self.phase.read() {
            Phase::Failed(e) => Some(Arc::clone(e)),
            _ => None,
        }
    }

    // Private helper methods

    /// Claims the one initialization run. True only for the first caller.
    fn begin(&self) -> bool {
        let mut phase = self.phase.write();
        if !matches!(*phase, Phase::Uninitialized) {
            return false;
        }
        *phase = Phase::Initializing;
        drop(phase);
        self.state_tx.send_replace(ServiceState::Initializing);
        true
    }

    fn engine(&self) -> Option<Arc<Engine>> {
        match &*self.phase.read() {
            Phase::Ready(engine) => Some(Arc::clone(engine)),
            _ => None,
        }
    }

    fn run_initialization(&self) {
        tracing::info!(
            index = %self.config.index_path.display(),
            source = %self.source.describe(),
            "initializing retrieval service"
        );
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.load_or_build()))
            .unwrap_or_else(|payload| Err(InitError::Aborted(panic_message(payload.as_ref()))));
        self.finish(outcome);
    }

    fn load_or_build(&self) -> Result<Engine, InitError> {
        let embedder = (self.loader)().map_err(InitError::ModelUnavailable)?;
        let model_name = embedder.model_name().to_string();
        let dimension = embedder.dimension();
        let store = CorpusStore::new(&self.config.index_path);

        match store.load(&model_name, dimension) {
            Ok((corpus, _)) => return Ok(Engine { corpus, embedder }),
            Err(SemanticError::NotFound) => {
                tracing::info!("no saved index found, building a new one");
            }
            Err(e) => {
                tracing::warn!(error = %e, "saved index is unusable, rebuilding");
            }
        }

        let records = load_records(self.source.as_ref());
        let documents = DocumentBuilder::new(self.config.index_name.clone()).build(&records);
        tracing::info!(
            records = records.len(),
            documents = documents.len(),
            model = %model_name,
            "embedding documents"
        );

        let corpus = Corpus::build(documents, embedder.as_ref(), self.config.batch_size)
            .map_err(InitError::Build)?;
        store
            .save(&corpus, &model_name, dimension)
            .map_err(InitError::Persist)?;

        Ok(Engine { corpus, embedder })
    }

    /// Publishes the terminal state. Readers see either the old phase or the
    /// complete new one.
    fn finish(&self, outcome: Result<Engine, InitError>) {
        let state = {
            let mut phase = self.phase.write();
            if phase.state().is_terminal() {
                return;
            }
            match outcome {
                Ok(engine) => {
                    tracing::info!(documents = engine.corpus.len(), "retrieval service ready");
                    *phase = Phase::Ready(Arc::new(engine));
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        code = %e.status_code(),
                        "retrieval service failed to initialize"
                    );
                    *phase = Phase::Failed(Arc::new(e));
                }
            }
            phase.state()
        };

        self.state_tx.send_replace(state);
        let _guard = self.settle_lock.lock();
        self.settled.notify_all();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("initialization panicked: {detail}")
}
