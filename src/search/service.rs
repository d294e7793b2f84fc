//! Main search service implementation

use crate::config::StateConfig;
use crate::metrics::{
    outcome, INDEX_DOCUMENTS, SEARCH_DURATION_SECONDS, SEARCH_QUERIES_TOTAL,
    SEARCH_STALE_HITS_TOTAL,
};
use crate::models::Forum;
use crate::search::config::SearchConfig;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::{IndexManager, IndexStats};
use crate::search::query::{ForumQuery, QueryEngine, SearchHit};
use crate::search::sync::{ReconcileReport, SyncOperation, SyncWorker};
use crate::state::{create_store, ForumStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use strum::Display;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A search hit merged with the live forum it points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumResult {
    /// Forum ID
    pub id: String,

    /// Highlighted title, or the live title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Highlighted description, or the live description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Search score/relevance
    pub score: f32,
}

impl ForumResult {
    fn from_hit(hit: SearchHit, forum: Option<&Forum>) -> Self {
        Self {
            id: hit.mongo_id,
            title: hit
                .title_highlight
                .or_else(|| forum.map(|f| f.title.clone())),
            description: hit
                .description_highlight
                .or_else(|| forum.map(|f| f.description.clone())),
            posts: forum.map(|f| f.posts),
            replies: forum.map(|f| f.replies),
            last_active: forum.map(|f| f.last_active),
            image: forum.and_then(|f| f.image.clone()),
            created_at: forum.map(|f| f.created_at),
            updated_at: forum.map(|f| f.updated_at),
            score: hit.score,
        }
    }

    /// Whether the live forum was found when the result was built
    pub fn is_stale(&self) -> bool {
        self.created_at.is_none()
    }
}

/// Merge hits with live forums, keeping hit order.
///
/// Hits without a live forum are kept with only their ID, score and highlights.
pub fn merge_hits(hits: Vec<SearchHit>, forums: Vec<Forum>) -> Vec<ForumResult> {
    let by_id: HashMap<String, Forum> = forums.into_iter().map(|f| (f.mongo_id(), f)).collect();

    hits.into_iter()
        .map(|hit| {
            let forum = by_id.get(&hit.mongo_id);
            if forum.is_none() {
                warn!(forum_id = %hit.mongo_id, "Search hit has no live forum");
                SEARCH_STALE_HITS_TOTAL.inc();
            }
            ForumResult::from_hit(hit, forum)
        })
        .collect()
}

/// Lifecycle of the service's connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ServiceState {
    Uninitialized,
    Ready,
}

enum StoreSource {
    Configured(StateConfig),
    Provided(Arc<dyn ForumStore>),
}

struct Ready {
    store: Arc<dyn ForumStore>,
    indexes: Arc<IndexManager>,
    sync: SyncWorker,
    /// Serializes index setup
    setup_lock: Mutex<()>,
}

/// Forum search service: index setup, synchronization and queries.
///
/// Connections to the forum store and the index root are made lazily, at most
/// once, by the first operation (or an explicit [`SearchService::initialize`]).
pub struct SearchService {
    config: SearchConfig,

    store_source: StoreSource,

    ready: OnceCell<Ready>,
}

impl SearchService {
    /// Create a service that opens the forum store described by `state`
    pub fn new(config: SearchConfig, state: StateConfig) -> Self {
        Self {
            config,
            store_source: StoreSource::Configured(state),
            ready: OnceCell::new(),
        }
    }

    /// Create a service over an already opened forum store
    pub fn with_store(config: SearchConfig, store: Arc<dyn ForumStore>) -> Self {
        Self {
            config,
            store_source: StoreSource::Provided(store),
            ready: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn state(&self) -> ServiceState {
        if self.ready.initialized() {
            ServiceState::Ready
        } else {
            ServiceState::Uninitialized
        }
    }

    /// Connect to the forum store and the index root. Idempotent.
    pub async fn initialize(&self) -> SearchResult<()> {
        self.ready().await.map(|_| ())
    }

    async fn ready(&self) -> SearchResult<&Ready> {
        self.ready
            .get_or_try_init(|| async {
                info!(index = %self.config.index_name, "Initializing search service");

                let store = match &self.store_source {
                    StoreSource::Configured(state) => create_store(state).await.map_err(|e| {
                        SearchError::Unreachable(format!("Forum store unavailable: {}", e))
                    })?,
                    StoreSource::Provided(store) => store.clone(),
                };

                let indexes = Arc::new(IndexManager::connect(self.config.clone()).await?);
                let sync =
                    SyncWorker::new(store.clone(), indexes.clone(), self.config.bulk_batch_size);

                info!("Search service ready");
                Ok::<_, SearchError>(Ready {
                    store,
                    indexes,
                    sync,
                    setup_lock: Mutex::new(()),
                })
            })
            .await
    }

    /// The forum store the index is derived from
    pub async fn store(&self) -> SearchResult<Arc<dyn ForumStore>> {
        Ok(self.ready().await?.store.clone())
    }

    /// Ensure the forum index exists, optionally rebuilding it from scratch.
    ///
    /// A newly created index is filled with every forum in the store.
    pub async fn setup_index(&self, delete_existing: bool) -> SearchResult<()> {
        let result = self.setup_index_inner(delete_existing).await;
        result.map_err(|e| {
            error!(error = %e, delete_existing, "Search index setup failed");
            match e {
                SearchError::IndexSetupFailed(_) => e,
                other => SearchError::IndexSetupFailed(other.to_string()),
            }
        })
    }

    async fn setup_index_inner(&self, delete_existing: bool) -> SearchResult<()> {
        let ready = self.ready().await?;
        let _guard = ready.setup_lock.lock().await;

        let mut exists = ready.indexes.exists().await;
        if exists && delete_existing {
            ready.indexes.delete().await?;
            exists = false;
        }

        if exists {
            debug!(index = %self.config.index_name, "Search index already exists");
            return Ok(());
        }

        ready.indexes.create().await?;
        let indexed = ready.sync.sync_all().await?;
        info!(index = %self.config.index_name, indexed, "Search index set up");
        Ok(())
    }

    /// Search forums by title and description.
    ///
    /// Failures are logged with their cause and reported as [`SearchError::SearchFailed`].
    pub async fn search_forums(&self, query: &str) -> SearchResult<Vec<ForumResult>> {
        let timer = SEARCH_DURATION_SECONDS.start_timer();
        let result = self.run_search(query).await;
        timer.observe_duration();

        SEARCH_QUERIES_TOTAL
            .with_label_values(&[outcome(&result)])
            .inc();

        result.map_err(|e| {
            error!(error = %e, query, "Forum search failed");
            SearchError::SearchFailed
        })
    }

    async fn run_search(&self, text: &str) -> SearchResult<Vec<ForumResult>> {
        let ready = self.ready().await?;
        let index = ready.indexes.current().await?;

        let query = ForumQuery::new(text).with_limit(self.config.max_results);
        let hits = QueryEngine::new(&index, self.config.highlight_max_chars).execute(&query)?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = hits
            .iter()
            .filter_map(|hit| Uuid::parse_str(&hit.mongo_id).ok())
            .collect();
        let forums = ready.store.find_by_ids(&ids).await?;

        debug!(query = text, hits = hits.len(), live = forums.len(), "Merging search hits");
        Ok(merge_hits(hits, forums))
    }

    /// Mirror one forum write into the index
    pub async fn sync_document(&self, forum: &Forum, operation: SyncOperation) -> SearchResult<()> {
        let ready = self.ready().await?;
        ready.sync.sync_document(forum, operation).await.map_err(|e| {
            error!(error = %e, forum_id = %forum.id, operation = %operation, "Forum sync failed");
            e
        })
    }

    /// Bulk index every forum in the store
    pub async fn sync_all(&self) -> SearchResult<usize> {
        self.ready().await?.sync.sync_all().await
    }

    /// Repair drift between the store and the index
    pub async fn reconcile(&self) -> SearchResult<ReconcileReport> {
        self.ready().await?.sync.reconcile().await
    }

    /// Get index statistics
    pub async fn stats(&self) -> SearchResult<IndexStats> {
        let stats = self.ready().await?.indexes.current().await?.stats().await?;
        INDEX_DOCUMENTS.set(stats.total_documents as f64);
        Ok(stats)
    }
}
