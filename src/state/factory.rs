use crate::config::{StateBackend, StateConfig};
use crate::error::{AppError, Result};
use crate::state::{ForumStore, InMemoryStore, RedisStore, SledStore};
use std::sync::Arc;

/// Create a forum store based on configuration
pub async fn create_store(config: &StateConfig) -> Result<Arc<dyn ForumStore>> {
    match config.backend {
        StateBackend::Memory => Ok(create_in_memory_store()),

        StateBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                AppError::Configuration("Sled backend requires 'path' configuration".to_string())
            })?;

            tracing::info!(path = ?path, "Initializing Sled storage backend");

            let store = SledStore::new(path)?;
            Ok(Arc::new(store))
        }

        StateBackend::Redis => {
            let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                AppError::Configuration("Redis backend requires 'redis_url' configuration".to_string())
            })?;

            tracing::info!(url = %redis_url, "Initializing Redis storage backend");

            let store = RedisStore::new_with_prefix(redis_url, &config.key_prefix).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Create an in-memory store (for testing and development)
pub fn create_in_memory_store() -> Arc<dyn ForumStore> {
    tracing::info!("Initializing in-memory storage backend");
    Arc::new(InMemoryStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state_config(backend: StateBackend) -> StateConfig {
        StateConfig {
            backend,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_sled_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = StateConfig {
            path: Some(temp_dir.path().to_path_buf()),
            ..state_config(StateBackend::Sled)
        };

        let store = create_store(&config).await.unwrap();
        assert_eq!(store.count_forums().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_in_memory_store() {
        let store = create_store(&state_config(StateBackend::Memory)).await.unwrap();
        assert_eq!(store.count_forums().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sled_requires_path() {
        let config = StateConfig {
            path: None,
            ..state_config(StateBackend::Sled)
        };

        let result = create_store(&config).await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_redis_requires_url() {
        let config = StateConfig {
            redis_url: None,
            ..state_config(StateBackend::Redis)
        };

        let result = create_store(&config).await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
