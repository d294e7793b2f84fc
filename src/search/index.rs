//! Search index lifecycle and writes

use crate::search::config::SearchConfig;
use crate::search::document::{
    build_forum_schema, forum_analyzer, ForumDocument, ForumFields, SearchDocument, FORUM_ANALYZER,
};
use crate::search::error::{SearchError, SearchResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tantivy::collector::{Count, DocSetCollector};
use tantivy::query::AllQuery;
use tantivy::schema::{Schema, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Name of the index
    pub index_name: String,

    /// Total number of documents in the index
    pub total_documents: u64,

    /// Index size in bytes
    pub index_size_bytes: u64,

    /// Number of segments
    pub num_segments: usize,

    /// Last commit made through this process
    pub last_commit: Option<DateTime<Utc>>,
}

/// An open forum index with its writer and reader
pub struct ForumIndex {
    index: Index,

    schema: Schema,

    fields: ForumFields,

    /// Single writer, serialized across tasks
    writer: Arc<RwLock<IndexWriter>>,

    reader: IndexReader,

    path: PathBuf,

    name: String,

    refresh_on_write: bool,

    last_commit: RwLock<Option<DateTime<Utc>>>,
}

impl ForumIndex {
    fn from_index(index: Index, config: &SearchConfig) -> SearchResult<Self> {
        // Custom analyzers are not persisted with the index
        index.tokenizers().register(FORUM_ANALYZER, forum_analyzer());

        let schema = index.schema();
        let fields = ForumFields::from_schema(&schema)?;

        let writer = index
            .writer_with_num_threads(config.indexing_threads.max(1), config.writer_heap_size)
            .map_err(|e| {
                SearchError::IndexSetupFailed(format!("Failed to create writer: {}", e))
            })?;

        let reader = index
            .reader_builder()
            .reload_policy(if config.refresh_on_write {
                ReloadPolicy::Manual
            } else {
                ReloadPolicy::OnCommitWithDelay
            })
            .try_into()
            .map_err(|e| {
                SearchError::IndexSetupFailed(format!("Failed to create reader: {}", e))
            })?;

        Ok(Self {
            index,
            schema,
            fields,
            writer: Arc::new(RwLock::new(writer)),
            reader,
            path: config.index_dir(),
            name: config.index_name.clone(),
            refresh_on_write: config.refresh_on_write,
            last_commit: RwLock::new(None),
        })
    }

    /// Get the schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get the index
    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn fields(&self) -> ForumFields {
        self.fields
    }

    /// Searcher over the last reloaded generation
    pub fn searcher(&self) -> Searcher {
        self.reader.searcher()
    }

    /// Make every committed change visible to searchers
    pub fn refresh(&self) -> SearchResult<()> {
        self.reader.reload()?;
        Ok(())
    }

    async fn commit(&self, writer: &mut IndexWriter) -> tantivy::Result<()> {
        writer.commit()?;
        if self.refresh_on_write {
            self.reader.reload()?;
        }
        *self.last_commit.write().await = Some(Utc::now());
        Ok(())
    }

    fn id_term(&self, mongo_id: &str) -> Term {
        Term::from_field_text(self.fields.mongo_id, mongo_id)
    }

    /// Upsert a single forum document, keyed by its store ID
    pub async fn index_document(&self, document: &ForumDocument) -> SearchResult<()> {
        let tantivy_doc = document.to_tantivy_doc(&self.schema);

        let mut writer = self.writer.write().await;

        writer.delete_term(self.id_term(&document.document_id()));
        writer
            .add_document(tantivy_doc)
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to add document: {}", e)))?;

        self.commit(&mut writer).await.map_err(|e| {
            SearchError::IndexingFailed(format!("Failed to commit document: {}", e))
        })?;

        debug!(mongo_id = %document.mongo_id, "Indexed forum document");
        Ok(())
    }

    /// Upsert many documents, committing every `batch_size` documents (0 = one commit)
    pub async fn bulk_index(
        &self,
        documents: &[ForumDocument],
        batch_size: usize,
    ) -> SearchResult<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let chunk_size = if batch_size == 0 {
            documents.len()
        } else {
            batch_size
        };

        let mut writer = self.writer.write().await;
        let mut indexed = 0;

        for chunk in documents.chunks(chunk_size) {
            for document in chunk {
                writer.delete_term(self.id_term(&document.document_id()));
                writer
                    .add_document(document.to_tantivy_doc(&self.schema))
                    .map_err(|e| {
                        SearchError::IndexingFailed(format!(
                            "Failed to add document {}: {}",
                            document.mongo_id, e
                        ))
                    })?;
            }

            self.commit(&mut writer).await.map_err(|e| {
                SearchError::IndexingFailed(format!("Failed to commit batch: {}", e))
            })?;

            indexed += chunk.len();
            debug!(indexed, total = documents.len(), "Committed bulk batch");
        }

        Ok(indexed)
    }

    /// Remove every document carrying the given store ID
    pub async fn delete_by_mongo_id(&self, mongo_id: &str) -> SearchResult<()> {
        let mut writer = self.writer.write().await;

        writer.delete_term(self.id_term(mongo_id));

        self.commit(&mut writer).await.map_err(|e| {
            SearchError::DeletionFailed(format!("Failed to commit deletion: {}", e))
        })?;

        debug!(mongo_id, "Deleted forum document");
        Ok(())
    }

    /// Remove several documents in one commit
    pub async fn delete_many(&self, mongo_ids: &[String]) -> SearchResult<usize> {
        if mongo_ids.is_empty() {
            return Ok(0);
        }

        let mut writer = self.writer.write().await;
        for mongo_id in mongo_ids {
            writer.delete_term(self.id_term(mongo_id));
        }

        self.commit(&mut writer).await.map_err(|e| {
            SearchError::DeletionFailed(format!("Failed to commit deletions: {}", e))
        })?;

        Ok(mongo_ids.len())
    }

    /// Store IDs of every visible document
    pub fn mongo_ids(&self) -> SearchResult<HashSet<String>> {
        let searcher = self.reader.searcher();
        let addresses = searcher.search(&AllQuery, &DocSetCollector)?;

        let mut ids = HashSet::with_capacity(addresses.len());
        for address in addresses {
            let doc: TantivyDocument = searcher.doc(address)?;
            if let Some(id) = doc.get_first(self.fields.mongo_id).and_then(|v| v.as_str()) {
                ids.insert(id.to_string());
            }
        }

        Ok(ids)
    }

    /// Get index statistics
    pub async fn stats(&self) -> SearchResult<IndexStats> {
        let searcher = self.reader.searcher();

        let total_documents = searcher.search(&AllQuery, &Count)? as u64;
        let num_segments = searcher.segment_readers().len();

        let index_size_bytes = std::fs::read_dir(&self.path)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0);

        Ok(IndexStats {
            index_name: self.name.clone(),
            total_documents,
            index_size_bytes,
            num_segments,
            last_commit: *self.last_commit.read().await,
        })
    }
}

/// Owns the forum index directory and the handle to the open index
pub struct IndexManager {
    config: SearchConfig,

    current: RwLock<Option<Arc<ForumIndex>>>,
}

impl IndexManager {
    /// Prepare the index root and open the forum index if one exists
    pub async fn connect(config: SearchConfig) -> SearchResult<Self> {
        std::fs::create_dir_all(&config.index_path).map_err(|e| {
            SearchError::Unreachable(format!(
                "Cannot use index root {}: {}",
                config.index_path.display(),
                e
            ))
        })?;

        let current = if Self::index_exists(&config.index_dir()) {
            let index = Index::open_in_dir(config.index_dir())?;
            info!(index = %config.index_name, "Opened existing search index");
            Some(Arc::new(ForumIndex::from_index(index, &config)?))
        } else {
            None
        };

        Ok(Self {
            config,
            current: RwLock::new(current),
        })
    }

    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Whether the forum index is currently set up
    pub async fn exists(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// The open forum index
    pub async fn current(&self) -> SearchResult<Arc<ForumIndex>> {
        self.current
            .read()
            .await
            .clone()
            .ok_or_else(|| SearchError::IndexNotFound(self.config.index_name.clone()))
    }

    /// Create the forum index with the forum schema and analyzer
    pub async fn create(&self) -> SearchResult<Arc<ForumIndex>> {
        let mut current = self.current.write().await;

        let dir = self.config.index_dir();
        std::fs::create_dir_all(&dir)?;

        let index = Index::create_in_dir(&dir, build_forum_schema())?;
        let forum_index = Arc::new(ForumIndex::from_index(index, &self.config)?);
        *current = Some(forum_index.clone());

        info!(index = %self.config.index_name, path = %dir.display(), "Created search index");
        Ok(forum_index)
    }

    /// Drop the forum index and its files
    pub async fn delete(&self) -> SearchResult<()> {
        let mut current = self.current.write().await;

        // Release the writer lock before the files go away
        drop(current.take());

        let dir = self.config.index_dir();
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }

        info!(index = %self.config.index_name, "Deleted search index");
        Ok(())
    }
}
