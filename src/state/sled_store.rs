use crate::error::{AppError, Result};
use crate::models::Forum;
use crate::state::{paginate, ForumStore};
use async_trait::async_trait;
use sled::Db;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Persistent forum store using Sled embedded database
#[derive(Clone)]
pub struct SledStore {
    db: Arc<Db>,
    forums_tree: sled::Tree,
}

impl SledStore {
    /// Create a new Sled store at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            AppError::Database(format!("Failed to open Sled database: {}", e))
        })?;

        let forums_tree = db.open_tree("forums").map_err(|e| {
            AppError::Database(format!("Failed to open forums tree: {}", e))
        })?;

        tracing::info!("Initialized Sled store at {:?}", path.as_ref());

        Ok(Self {
            db: Arc::new(db),
            forums_tree,
        })
    }

    fn serialize_forum(forum: &Forum) -> Result<Vec<u8>> {
        bincode::serialize(forum)
            .map_err(|e| AppError::Serialization(format!("Failed to serialize forum: {}", e)))
    }

    fn deserialize_forum(bytes: &[u8]) -> Result<Forum> {
        bincode::deserialize(bytes)
            .map_err(|e| AppError::Serialization(format!("Failed to deserialize forum: {}", e)))
    }

    fn forum_key(id: &Uuid) -> Vec<u8> {
        id.as_bytes().to_vec()
    }

    fn write(&self, forum: &Forum) -> Result<()> {
        let key = Self::forum_key(&forum.id);
        let value = Self::serialize_forum(forum)?;

        self.forums_tree
            .insert(key, value)
            .map_err(|e| AppError::Database(format!("Failed to write forum: {}", e)))?;

        self.forums_tree
            .flush()
            .map_err(|e| AppError::Database(format!("Failed to flush forums tree: {}", e)))?;

        Ok(())
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| AppError::Database(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl ForumStore for SledStore {
    async fn save_forum(&self, forum: &Forum) -> Result<()> {
        self.write(forum)?;
        tracing::debug!(forum_id = %forum.id, "Forum saved to Sled");
        Ok(())
    }

    async fn get_forum(&self, id: &Uuid) -> Result<Option<Forum>> {
        match self.forums_tree.get(Self::forum_key(id)) {
            Ok(Some(bytes)) => Ok(Some(Self::deserialize_forum(&bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(AppError::Database(format!("Failed to get forum: {}", e))),
        }
    }

    async fn update_forum(&self, forum: &Forum) -> Result<()> {
        let exists = self
            .forums_tree
            .contains_key(Self::forum_key(&forum.id))
            .map_err(|e| AppError::Database(format!("Failed to check forum existence: {}", e)))?;

        if !exists {
            return Err(AppError::NotFound(format!("Forum {} not found", forum.id)));
        }

        self.write(forum)?;
        tracing::debug!(forum_id = %forum.id, "Forum updated in Sled");
        Ok(())
    }

    async fn delete_forum(&self, id: &Uuid) -> Result<()> {
        let removed = self
            .forums_tree
            .remove(Self::forum_key(id))
            .map_err(|e| AppError::Database(format!("Failed to delete forum: {}", e)))?;

        if removed.is_none() {
            return Err(AppError::NotFound(format!("Forum {} not found", id)));
        }

        self.forums_tree
            .flush()
            .map_err(|e| AppError::Database(format!("Failed to flush forums tree: {}", e)))?;

        tracing::debug!(forum_id = %id, "Forum deleted from Sled");
        Ok(())
    }

    async fn list_forums(&self, page: u32, page_size: u32) -> Result<Vec<Forum>> {
        let forums = self.all_forums().await?;
        Ok(paginate(forums, page, page_size))
    }

    async fn count_forums(&self) -> Result<u64> {
        Ok(self.forums_tree.len() as u64)
    }

    async fn all_forums(&self) -> Result<Vec<Forum>> {
        let mut forums = Vec::with_capacity(self.forums_tree.len());

        for result in self.forums_tree.iter() {
            let (_, value) = result
                .map_err(|e| AppError::Database(format!("Failed to iterate forums: {}", e)))?;
            forums.push(Self::deserialize_forum(&value)?);
        }

        Ok(forums)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Forum>> {
        let mut forums = Vec::with_capacity(ids.len());

        for id in ids {
            if let Some(forum) = self.get_forum(id).await? {
                forums.push(forum);
            }
        }

        Ok(forums)
    }
}
