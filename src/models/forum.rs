use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A discussion board. The system of record for forum search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Forum {
    /// Unique identifier
    pub id: Uuid,

    /// Board title
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Board description
    #[validate(length(min = 1, max = 5000))]
    pub description: String,

    /// Number of posts
    pub posts: u64,

    /// Number of replies across all posts
    pub replies: u64,

    /// Last time anything happened on the board
    pub last_active: DateTime<Utc>,

    /// Cover image (URL or path)
    pub image: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Forum {
    /// Create a new forum
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            posts: 0,
            replies: 0,
            last_active: now,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the cover image
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Apply a partial update, bumping `updated_at`
    pub fn apply(&mut self, update: ForumUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(posts) = update.posts {
            self.posts = posts;
        }
        if let Some(replies) = update.replies {
            self.replies = replies;
        }
        if let Some(image) = update.image {
            self.image = Some(image);
        }

        let now = Utc::now();
        self.last_active = update.last_active.unwrap_or(now);
        self.updated_at = now;
    }

    /// Identifier as stored in the search index
    pub fn mongo_id(&self) -> String {
        self.id.to_string()
    }
}

/// Partial forum update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForumUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub posts: Option<u64>,
    pub replies: Option<u64>,
    pub last_active: Option<DateTime<Utc>>,
    pub image: Option<String>,
}
