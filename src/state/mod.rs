pub mod store;
pub mod sled_store;
pub mod redis_store;
pub mod factory;

pub use store::*;
pub use sled_store::SledStore;
pub use redis_store::RedisStore;
pub use factory::{create_store, create_in_memory_store};

use crate::error::Result;
use crate::models::Forum;
use async_trait::async_trait;
use uuid::Uuid;

/// Trait for forum storage operations.
///
/// This is the system of record the search index is derived from.
#[async_trait]
pub trait ForumStore: Send + Sync {
    /// Save a forum
    async fn save_forum(&self, forum: &Forum) -> Result<()>;

    /// Get a forum by ID
    async fn get_forum(&self, id: &Uuid) -> Result<Option<Forum>>;

    /// Update an existing forum
    async fn update_forum(&self, forum: &Forum) -> Result<()>;

    /// Delete a forum
    async fn delete_forum(&self, id: &Uuid) -> Result<()>;

    /// List forums, newest first
    async fn list_forums(&self, page: u32, page_size: u32) -> Result<Vec<Forum>>;

    /// Count all forums
    async fn count_forums(&self) -> Result<u64>;

    /// Every forum in the store, in no particular order
    async fn all_forums(&self) -> Result<Vec<Forum>>;

    /// Fetch the forums with the given IDs in one call. Missing IDs are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Forum>>;
}

/// Newest-first page of a forum list
pub(crate) fn paginate(mut forums: Vec<Forum>, page: u32, page_size: u32) -> Vec<Forum> {
    forums.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let start = (page as usize).saturating_mul(page_size as usize);

    forums
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect()
}
