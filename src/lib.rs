//! Forum search for SkillSwap Hub.
//!
//! Forums live in a [`state::ForumStore`]; a Tantivy index derived from the
//! store serves typo tolerant, prefix boosted search with highlighting. See
//! [`search::SearchService`] for the entry point.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod search;
pub mod state;

pub use error::{AppError, Result};
