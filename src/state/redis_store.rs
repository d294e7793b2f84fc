use crate::error::{AppError, Result};
use crate::models::Forum;
use crate::state::{paginate, ForumStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use uuid::Uuid;

/// Redis-based persistent forum store.
///
/// Forums are stored as JSON under `{prefix}:forum:{id}`; the set
/// `{prefix}:forums` holds every forum ID.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisStore {
    /// Create a new Redis store
    pub async fn new(redis_url: &str) -> Result<Self> {
        Self::new_with_prefix(redis_url, "skillswap").await
    }

    /// Create a new Redis store with custom key prefix
    pub async fn new_with_prefix(redis_url: &str, prefix: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| AppError::Database(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Redis: {}", e)))?;

        let mut test_conn = connection.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut test_conn)
            .await
            .map_err(|e| AppError::Database(format!("Redis connection test failed: {}", e)))?;

        tracing::info!("Initialized Redis store with prefix '{}'", prefix);

        Ok(Self {
            connection,
            key_prefix: prefix.to_string(),
        })
    }

    fn forum_key(&self, id: &Uuid) -> String {
        format!("{}:forum:{}", self.key_prefix, id)
    }

    fn forums_set_key(&self) -> String {
        format!("{}:forums", self.key_prefix)
    }

    fn serialize_forum(forum: &Forum) -> Result<String> {
        serde_json::to_string(forum)
            .map_err(|e| AppError::Serialization(format!("Failed to serialize forum: {}", e)))
    }

    fn deserialize_forum(json: &str) -> Result<Forum> {
        serde_json::from_str(json)
            .map_err(|e| AppError::Serialization(format!("Failed to deserialize forum: {}", e)))
    }

    async fn write(&self, forum: &Forum) -> Result<()> {
        let value = Self::serialize_forum(forum)?;
        let mut conn = self.connection.clone();

        redis::pipe()
            .atomic()
            .set(self.forum_key(&forum.id), value)
            .ignore()
            .sadd(self.forums_set_key(), forum.id.to_string())
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to write forum: {}", e)))
    }

    /// Load forums stored under the given keys, skipping keys that no longer exist
    async fn load(&self, keys: Vec<String>) -> Result<Vec<Forum>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to load forums: {}", e)))?;

        values
            .into_iter()
            .flatten()
            .map(|json| Self::deserialize_forum(&json))
            .collect()
    }
}

#[async_trait]
impl ForumStore for RedisStore {
    async fn save_forum(&self, forum: &Forum) -> Result<()> {
        self.write(forum).await?;
        tracing::debug!(forum_id = %forum.id, "Forum saved to Redis");
        Ok(())
    }

    async fn get_forum(&self, id: &Uuid) -> Result<Option<Forum>> {
        let mut conn = self.connection.clone();

        let value: Option<String> = conn
            .get(self.forum_key(id))
            .await
            .map_err(|e| AppError::Database(format!("Failed to get forum: {}", e)))?;

        value.map(|json| Self::deserialize_forum(&json)).transpose()
    }

    async fn update_forum(&self, forum: &Forum) -> Result<()> {
        let mut conn = self.connection.clone();

        let exists: bool = conn
            .exists(self.forum_key(&forum.id))
            .await
            .map_err(|e| AppError::Database(format!("Failed to check forum existence: {}", e)))?;

        if !exists {
            return Err(AppError::NotFound(format!("Forum {} not found", forum.id)));
        }

        self.write(forum).await?;
        tracing::debug!(forum_id = %forum.id, "Forum updated in Redis");
        Ok(())
    }

    async fn delete_forum(&self, id: &Uuid) -> Result<()> {
        let mut conn = self.connection.clone();

        let (removed, _): (u64, u64) = redis::pipe()
            .atomic()
            .del(self.forum_key(id))
            .srem(self.forums_set_key(), id.to_string())
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete forum: {}", e)))?;

        if removed == 0 {
            return Err(AppError::NotFound(format!("Forum {} not found", id)));
        }

        tracing::debug!(forum_id = %id, "Forum deleted from Redis");
        Ok(())
    }

    async fn list_forums(&self, page: u32, page_size: u32) -> Result<Vec<Forum>> {
        let forums = self.all_forums().await?;
        Ok(paginate(forums, page, page_size))
    }

    async fn count_forums(&self) -> Result<u64> {
        let mut conn = self.connection.clone();

        conn.scard(self.forums_set_key())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count forums: {}", e)))
    }

    async fn all_forums(&self) -> Result<Vec<Forum>> {
        let mut conn = self.connection.clone();

        let ids: Vec<String> = conn
            .smembers(self.forums_set_key())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list forum ids: {}", e)))?;

        let keys = ids
            .iter()
            .map(|id| format!("{}:forum:{}", self.key_prefix, id))
            .collect();

        self.load(keys).await
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Forum>> {
        let keys = ids.iter().map(|id| self.forum_key(id)).collect();
        self.load(keys).await
    }
}
