use crate::error::{AppError, Result};
use crate::models::Forum;
use crate::state::{paginate, ForumStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory forum store (for development and testing)
#[derive(Clone)]
pub struct InMemoryStore {
    forums: Arc<DashMap<Uuid, Forum>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            forums: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ForumStore for InMemoryStore {
    async fn save_forum(&self, forum: &Forum) -> Result<()> {
        self.forums.insert(forum.id, forum.clone());
        tracing::debug!(forum_id = %forum.id, "Forum saved");
        Ok(())
    }

    async fn get_forum(&self, id: &Uuid) -> Result<Option<Forum>> {
        Ok(self.forums.get(id).map(|entry| entry.clone()))
    }

    async fn update_forum(&self, forum: &Forum) -> Result<()> {
        if self.forums.contains_key(&forum.id) {
            self.forums.insert(forum.id, forum.clone());
            tracing::debug!(forum_id = %forum.id, "Forum updated");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Forum {} not found", forum.id)))
        }
    }

    async fn delete_forum(&self, id: &Uuid) -> Result<()> {
        if self.forums.remove(id).is_some() {
            tracing::debug!(forum_id = %id, "Forum deleted");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Forum {} not found", id)))
        }
    }

    async fn list_forums(&self, page: u32, page_size: u32) -> Result<Vec<Forum>> {
        let forums = self
            .forums
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        Ok(paginate(forums, page, page_size))
    }

    async fn count_forums(&self) -> Result<u64> {
        Ok(self.forums.len() as u64)
    }

    async fn all_forums(&self) -> Result<Vec<Forum>> {
        Ok(self
            .forums
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Forum>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.forums.get(id).map(|entry| entry.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_get_forum() {
        let store = InMemoryStore::new();

        let forum = Forum::new("Photography", "Lenses, light and composition");
        let id = forum.id;
        store.save_forum(&forum).await.unwrap();

        let retrieved = store.get_forum(&id).await.unwrap();
        assert_eq!(retrieved, Some(forum));
    }

    #[tokio::test]
    async fn test_update_missing_forum_fails() {
        let store = InMemoryStore::new();

        let forum = Forum::new("Chess", "Openings");
        let result = store.update_forum(&forum).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_forum() {
        let store = InMemoryStore::new();

        let forum = Forum::new("Chess", "Openings");
        store.save_forum(&forum).await.unwrap();
        store.delete_forum(&forum.id).await.unwrap();

        assert!(store.get_forum(&forum.id).await.unwrap().is_none());
        assert!(store.delete_forum(&forum.id).await.is_err());
    }

    #[tokio::test]
    async fn test_list_forums_pagination() {
        let store = InMemoryStore::new();

        for i in 0..5 {
            let mut forum = Forum::new(format!("Forum {}", i), "Description");
            forum.created_at = forum.created_at + chrono::Duration::seconds(i);
            store.save_forum(&forum).await.unwrap();
        }

        let first = store.list_forums(0, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].title, "Forum 4");
        assert_eq!(first[1].title, "Forum 3");

        let last = store.list_forums(2, 2).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].title, "Forum 0");

        assert_eq!(store.count_forums().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_find_by_ids_skips_missing() {
        let store = InMemoryStore::new();

        let a = Forum::new("Yoga", "Morning flows");
        let b = Forum::new("Baking", "Sourdough");
        store.save_forum(&a).await.unwrap();
        store.save_forum(&b).await.unwrap();

        let found = store
            .find_by_ids(&[a.id, Uuid::new_v4(), b.id])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, a.id);
        assert_eq!(found[1].id, b.id);
    }
}
