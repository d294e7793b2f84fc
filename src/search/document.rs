//! Search document structures, schema and text analysis

use crate::models::Forum;
use crate::search::error::SearchResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tantivy::schema::*;
use tantivy::tokenizer::{
    Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer,
};
use tantivy::TantivyDocument;

/// Name under which the forum analyzer is registered on every index
pub const FORUM_ANALYZER: &str = "forum_text";

pub const FIELD_MONGO_ID: &str = "mongo_id";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_TITLE_KEYWORD: &str = "title_keyword";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_POSTS: &str = "posts";
pub const FIELD_REPLIES: &str = "replies";
pub const FIELD_LAST_ACTIVE: &str = "last_active";
pub const FIELD_IMAGE: &str = "image";
pub const FIELD_CREATED_AT: &str = "created_at";
pub const FIELD_UPDATED_AT: &str = "updated_at";

// Used only if tantivy was built without its bundled stop word lists
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Trait for documents that can be indexed and searched
pub trait SearchDocument {
    /// Convert to Tantivy document
    fn to_tantivy_doc(&self, schema: &Schema) -> TantivyDocument;

    /// Get the identifier the document is upserted and deleted by
    fn document_id(&self) -> String;
}

/// Forum projection stored in the search index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumDocument {
    /// ID of the forum in the store
    pub mongo_id: String,

    pub title: String,

    pub description: String,

    pub posts: u64,

    pub replies: u64,

    pub last_active: DateTime<Utc>,

    pub image: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl From<&Forum> for ForumDocument {
    fn from(forum: &Forum) -> Self {
        Self {
            mongo_id: forum.mongo_id(),
            title: forum.title.clone(),
            description: forum.description.clone(),
            posts: forum.posts,
            replies: forum.replies,
            last_active: forum.last_active,
            image: forum.image.clone(),
            created_at: forum.created_at,
            updated_at: forum.updated_at,
        }
    }
}

impl From<Forum> for ForumDocument {
    fn from(forum: Forum) -> Self {
        Self::from(&forum)
    }
}

fn to_tantivy_date(value: DateTime<Utc>) -> tantivy::DateTime {
    tantivy::DateTime::from_timestamp_secs(value.timestamp())
}

impl SearchDocument for ForumDocument {
    fn to_tantivy_doc(&self, schema: &Schema) -> TantivyDocument {
        let mut doc = TantivyDocument::new();

        if let Ok(field) = schema.get_field(FIELD_MONGO_ID) {
            doc.add_text(field, &self.mongo_id);
        }

        // Title is indexed twice: analyzed for matching, raw for exact lookups
        if let Ok(field) = schema.get_field(FIELD_TITLE) {
            doc.add_text(field, &self.title);
        }
        if let Ok(field) = schema.get_field(FIELD_TITLE_KEYWORD) {
            doc.add_text(field, &self.title);
        }

        if let Ok(field) = schema.get_field(FIELD_DESCRIPTION) {
            doc.add_text(field, &self.description);
        }

        if let Ok(field) = schema.get_field(FIELD_POSTS) {
            doc.add_u64(field, self.posts);
        }
        if let Ok(field) = schema.get_field(FIELD_REPLIES) {
            doc.add_u64(field, self.replies);
        }

        if let Ok(field) = schema.get_field(FIELD_LAST_ACTIVE) {
            doc.add_date(field, to_tantivy_date(self.last_active));
        }

        if let Some(ref image) = self.image {
            if let Ok(field) = schema.get_field(FIELD_IMAGE) {
                doc.add_text(field, image);
            }
        }

        if let Ok(field) = schema.get_field(FIELD_CREATED_AT) {
            doc.add_date(field, to_tantivy_date(self.created_at));
        }
        if let Ok(field) = schema.get_field(FIELD_UPDATED_AT) {
            doc.add_date(field, to_tantivy_date(self.updated_at));
        }

        doc
    }

    fn document_id(&self) -> String {
        self.mongo_id.clone()
    }
}

/// Build the custom forum analyzer: tokenize, lowercase, drop stop words, stem.
pub fn forum_analyzer() -> TextAnalyzer {
    let stop_words = StopWordFilter::new(Language::English).unwrap_or_else(|| {
        StopWordFilter::remove(ENGLISH_STOP_WORDS.iter().map(|word| word.to_string()))
    });

    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(stop_words)
        .filter(Stemmer::new(Language::English))
        .build()
}

/// Build the search schema for forums
pub fn build_forum_schema() -> Schema {
    let mut schema_builder = Schema::builder();

    let analyzed = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(FORUM_ANALYZER)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();

    // Foreign key back to the forum store
    schema_builder.add_text_field(FIELD_MONGO_ID, STRING | STORED);

    schema_builder.add_text_field(FIELD_TITLE, analyzed.clone());
    schema_builder.add_text_field(FIELD_TITLE_KEYWORD, STRING);
    schema_builder.add_text_field(FIELD_DESCRIPTION, analyzed);

    schema_builder.add_u64_field(FIELD_POSTS, INDEXED | STORED | FAST);
    schema_builder.add_u64_field(FIELD_REPLIES, INDEXED | STORED | FAST);

    schema_builder.add_date_field(FIELD_LAST_ACTIVE, INDEXED | STORED | FAST);

    schema_builder.add_text_field(FIELD_IMAGE, STORED);

    schema_builder.add_date_field(FIELD_CREATED_AT, INDEXED | STORED | FAST);
    schema_builder.add_date_field(FIELD_UPDATED_AT, INDEXED | STORED | FAST);

    schema_builder.build()
}

/// Resolved handles of the fields the query engine touches
#[derive(Debug, Clone, Copy)]
pub struct ForumFields {
    pub mongo_id: Field,
    pub title: Field,
    pub description: Field,
}

impl ForumFields {
    pub fn from_schema(schema: &Schema) -> SearchResult<Self> {
        Ok(Self {
            mongo_id: schema.get_field(FIELD_MONGO_ID)?,
            title: schema.get_field(FIELD_TITLE)?,
            description: schema.get_field(FIELD_DESCRIPTION)?,
        })
    }
}
