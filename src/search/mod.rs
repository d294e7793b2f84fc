//! Full-text forum search powered by Tantivy
//!
//! The index is a derived copy of the forum store, kept current by
//! sync-on-write and repaired by periodic reconciliation.
//!
//! - **Index lifecycle**: create, delete and rebuild the forum index
//! - **Sync**: single document upserts and deletes, bulk sync of every forum
//! - **Queries**: typo tolerant matching over title and description plus
//!   title prefix matching, with highlighted fragments
//! - **Merge**: hits are joined with live forum data in rank order
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │           Search Service API                     │
//! ├─────────────────────────────────────────────────┤
//! │  - setup_index()    - search_forums()            │
//! │  - sync_document()  - sync_all()                 │
//! │  - reconcile()      - stats()                    │
//! └─────────────────────────────────────────────────┘
//!            │                         │
//!            ▼                         ▼
//! ┌──────────────────────┐  ┌──────────────────────┐
//! │  Sync Worker         │  │  Query Engine        │
//! └──────────────────────┘  └──────────────────────┘
//!            │                         │
//!            ▼                         ▼
//! ┌─────────────────────────────────────────────────┐
//! │           Index Manager                          │
//! ├─────────────────────────────────────────────────┤
//! │  - Schema and "forum_text" analyzer              │
//! │  - Single writer, manually reloaded reader       │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use skillswap_search::config::StateConfig;
//! use skillswap_search::search::{SearchConfig, SearchService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let search = SearchService::new(SearchConfig::default(), StateConfig::default());
//!     search.setup_index(false).await?;
//!
//!     for forum in search.search_forums("progamming").await? {
//!         println!("{} {:?}", forum.id, forum.title);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod config;
mod document;
mod error;
mod index;
mod query;
mod reconciler;
mod service;
mod sync;

pub use config::{SearchConfig, SearchConfigBuilder};
pub use document::{
    build_forum_schema, forum_analyzer, ForumDocument, ForumFields, SearchDocument, FORUM_ANALYZER,
};
pub use error::{SearchError, SearchResult};
pub use index::{ForumIndex, IndexManager, IndexStats};
pub use query::{
    auto_fuzziness, ForumQuery, QueryEngine, SearchHit, HIGHLIGHT_POST_TAG, HIGHLIGHT_PRE_TAG,
    PREFIX_BOOST, TITLE_BOOST,
};
pub use reconciler::Reconciler;
pub use service::{merge_hits, ForumResult, SearchService, ServiceState};
pub use sync::{ReconcileReport, SyncOperation, SyncWorker};
