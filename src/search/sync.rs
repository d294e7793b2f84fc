//! Keeps the forum index in step with the forum store

use crate::metrics::{
    outcome, BULK_DOCUMENTS_INDEXED_TOTAL, RECONCILE_RUNS_TOTAL, SYNC_OPERATIONS_TOTAL,
};
use crate::models::Forum;
use crate::search::document::ForumDocument;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::{ForumIndex, IndexManager};
use crate::state::ForumStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumString};
use tracing::{info, warn};
use uuid::Uuid;

/// What a single-document sync does to the index
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SyncOperation {
    /// Insert or replace the forum's document
    Index,
    /// Remove the forum's document
    Delete,
}

/// Outcome of a reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Forums written to the index
    pub indexed: usize,
    /// Orphaned documents removed from the index
    pub removed: usize,
}

/// Writes store changes into the forum index
pub struct SyncWorker {
    store: Arc<dyn ForumStore>,
    indexes: Arc<IndexManager>,
    batch_size: usize,
}

impl SyncWorker {
    pub fn new(store: Arc<dyn ForumStore>, indexes: Arc<IndexManager>, batch_size: usize) -> Self {
        Self {
            store,
            indexes,
            batch_size,
        }
    }

    /// Mirror one forum write into the index.
    ///
    /// Before the index is set up there is nothing to keep in sync; the full
    /// sync run by setup picks the forum up instead.
    pub async fn sync_document(&self, forum: &Forum, operation: SyncOperation) -> SearchResult<()> {
        let index = match self.indexes.current().await {
            Ok(index) => index,
            Err(SearchError::IndexNotFound(name)) => {
                warn!(
                    index = %name,
                    forum_id = %forum.id,
                    operation = %operation,
                    "Search index not set up, skipping sync"
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let result = match operation {
            SyncOperation::Index => index.index_document(&ForumDocument::from(forum)).await,
            SyncOperation::Delete => index.delete_by_mongo_id(&forum.mongo_id()).await,
        };

        SYNC_OPERATIONS_TOTAL
            .with_label_values(&[operation.as_ref(), outcome(&result)])
            .inc();

        result
    }

    /// Bulk index every forum in the store
    pub async fn sync_all(&self) -> SearchResult<usize> {
        let index = self.indexes.current().await?;
        let forums = self.store.all_forums().await?;

        let indexed = self.index_forums(&index, &forums).await?;
        info!(indexed, "Synced all forums into the search index");
        Ok(indexed)
    }

    async fn index_forums(&self, index: &ForumIndex, forums: &[Forum]) -> SearchResult<usize> {
        if forums.is_empty() {
            return Ok(0);
        }

        let documents: Vec<ForumDocument> = forums.iter().map(ForumDocument::from).collect();
        let indexed = index.bulk_index(&documents, self.batch_size).await?;
        BULK_DOCUMENTS_INDEXED_TOTAL.inc_by(indexed as u64);
        Ok(indexed)
    }

    /// Reindex every forum and drop documents whose forum no longer exists
    pub async fn reconcile(&self) -> SearchResult<ReconcileReport> {
        let result = self.reconcile_inner().await;
        RECONCILE_RUNS_TOTAL
            .with_label_values(&[outcome(&result)])
            .inc();
        result
    }

    async fn reconcile_inner(&self) -> SearchResult<ReconcileReport> {
        let index = self.indexes.current().await?;
        let forums = self.store.all_forums().await?;
        let live: HashSet<String> = forums.iter().map(Forum::mongo_id).collect();

        let indexed = self.index_forums(&index, &forums).await?;
        index.refresh()?;

        let candidates: Vec<String> = index
            .mongo_ids()?
            .into_iter()
            .filter(|id| !live.contains(id))
            .collect();
        let orphans = self.confirm_orphans(candidates).await?;
        let removed = index.delete_many(&orphans).await?;
        index.refresh()?;

        info!(indexed, removed, "Reconciled search index with forum store");
        Ok(ReconcileReport { indexed, removed })
    }

    // Forums created after the store snapshot are live, not orphaned
    async fn confirm_orphans(&self, candidates: Vec<String>) -> SearchResult<Vec<String>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let ids: Vec<Uuid> = candidates
            .iter()
            .filter_map(|id| Uuid::parse_str(id).ok())
            .collect();
        let created_since: HashSet<String> = self
            .store
            .find_by_ids(&ids)
            .await?
            .iter()
            .map(Forum::mongo_id)
            .collect();

        Ok(candidates
            .into_iter()
            .filter(|id| !created_since.contains(id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::config::SearchConfig;
    use crate::search::document::SearchDocument;
    use crate::state::create_in_memory_store;
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn worker(temp_dir: &TempDir) -> (SyncWorker, Arc<dyn ForumStore>, Arc<IndexManager>) {
        let config = SearchConfig {
            index_path: temp_dir.path().to_path_buf(),
            writer_heap_size: 20_000_000,
            bulk_batch_size: 2,
            ..Default::default()
        };
        let store = create_in_memory_store();
        let indexes = Arc::new(IndexManager::connect(config).await.unwrap());
        let worker = SyncWorker::new(store.clone(), indexes.clone(), 2);
        (worker, store, indexes)
    }

    #[test]
    fn test_sync_operation_strings() {
        assert_eq!(SyncOperation::Index.to_string(), "index");
        assert_eq!(SyncOperation::Delete.as_ref(), "delete");
        assert_eq!(
            SyncOperation::from_str("delete").unwrap(),
            SyncOperation::Delete
        );
        assert!(SyncOperation::from_str("upsert").is_err());
    }

    #[tokio::test]
    async fn test_sync_before_setup_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let (worker, _, indexes) = worker(&temp_dir).await;

        let forum = Forum::new("Knitting", "Patterns");
        worker
            .sync_document(&forum, SyncOperation::Index)
            .await
            .unwrap();
        assert!(!indexes.exists().await);
    }

    #[tokio::test]
    async fn test_sync_document_index_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let (worker, _, indexes) = worker(&temp_dir).await;
        let index = indexes.create().await.unwrap();

        let forum = Forum::new("Knitting", "Patterns");
        worker
            .sync_document(&forum, SyncOperation::Index)
            .await
            .unwrap();
        assert!(index.mongo_ids().unwrap().contains(&forum.mongo_id()));

        worker
            .sync_document(&forum, SyncOperation::Delete)
            .await
            .unwrap();
        assert!(index.mongo_ids().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_all_in_batches() {
        let temp_dir = TempDir::new().unwrap();
        let (worker, store, indexes) = worker(&temp_dir).await;
        indexes.create().await.unwrap();

        for i in 0..5 {
            store
                .save_forum(&Forum::new(format!("Forum {}", i), "Body"))
                .await
                .unwrap();
        }

        assert_eq!(worker.sync_all().await.unwrap(), 5);
        let stats = indexes.current().await.unwrap().stats().await.unwrap();
        assert_eq!(stats.total_documents, 5);
    }

    #[tokio::test]
    async fn test_sync_all_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let (worker, _, indexes) = worker(&temp_dir).await;
        indexes.create().await.unwrap();

        assert_eq!(worker.sync_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_removes_orphans() {
        let temp_dir = TempDir::new().unwrap();
        let (worker, store, indexes) = worker(&temp_dir).await;
        let index = indexes.create().await.unwrap();

        let kept = Forum::new("Pottery", "Wheel throwing");
        store.save_forum(&kept).await.unwrap();

        // Indexed but never stored, as if its delete sync was lost
        let orphan = Forum::new("Ghost", "Gone");
        index
            .index_document(&ForumDocument::from(&orphan))
            .await
            .unwrap();

        let report = worker.reconcile().await.unwrap();
        assert_eq!(report, ReconcileReport { indexed: 1, removed: 1 });

        let ids = index.mongo_ids().unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(&ForumDocument::from(&kept).document_id()));
    }
}
