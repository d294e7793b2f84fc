//! Search configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Search service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Root directory holding search indexes
    pub index_path: PathBuf,

    /// Name of the forum index (a directory under `index_path`)
    pub index_name: String,

    /// Index writer heap size in bytes (default: 50MB)
    pub writer_heap_size: usize,

    /// Number of threads for indexing
    pub indexing_threads: usize,

    /// Reload the reader after every commit so writes are immediately searchable
    pub refresh_on_write: bool,

    /// Documents per commit during a full sync (0 = everything in one commit)
    pub bulk_batch_size: usize,

    /// Maximum search results to return
    pub max_results: usize,

    /// Maximum characters in a highlighted snippet
    pub highlight_max_chars: usize,

    /// Cron expression for the periodic reconciliation job (disabled when unset)
    pub reconcile_schedule: Option<String>,
}

impl SearchConfig {
    /// Directory of the forum index
    pub fn index_dir(&self) -> PathBuf {
        self.index_path.join(&self.index_name)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("./data/search"),
            index_name: "forums".to_string(),
            writer_heap_size: 50_000_000, // 50MB
            indexing_threads: 1,
            refresh_on_write: true,
            bulk_batch_size: 1000,
            max_results: 50,
            highlight_max_chars: 200,
            reconcile_schedule: None,
        }
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn index_path(mut self, path: PathBuf) -> Self {
        self.config.index_path = path;
        self
    }

    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.config.index_name = name.into();
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn indexing_threads(mut self, threads: usize) -> Self {
        self.config.indexing_threads = threads;
        self
    }

    pub fn refresh_on_write(mut self, enabled: bool) -> Self {
        self.config.refresh_on_write = enabled;
        self
    }

    pub fn bulk_batch_size(mut self, size: usize) -> Self {
        self.config.bulk_batch_size = size;
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.config.max_results = max;
        self
    }

    pub fn highlight_max_chars(mut self, chars: usize) -> Self {
        self.config.highlight_max_chars = chars;
        self
    }

    pub fn reconcile_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.config.reconcile_schedule = Some(schedule.into());
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = SearchConfigBuilder::new()
            .index_path(PathBuf::from("/tmp/search"))
            .index_name("boards")
            .bulk_batch_size(0)
            .max_results(10)
            .build();

        assert_eq!(config.index_dir(), PathBuf::from("/tmp/search/boards"));
        assert_eq!(config.bulk_batch_size, 0);
        assert_eq!(config.max_results, 10);
        assert!(config.refresh_on_write);
        assert!(config.reconcile_schedule.is_none());
    }
}
