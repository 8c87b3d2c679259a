//! Post model
//!
//! The post is the only entity of the blog platform: a titled piece of
//! content filed under a category, with an optional list of free-form tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Blog post entity.
///
/// `id`, `created_at` and `updated_at` are owned by the storage layer; a
/// post handed out by the repository always has all three populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier, assigned on insert
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    /// Ordered tag list, possibly empty
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation timestamp, never changes after insert
    pub created_at: DateTime<Utc>,
    /// Refreshed by the storage layer on every update
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new, not yet persisted post.
    ///
    /// The ID is 0 and both timestamps are placeholders; the repository
    /// replaces all three when the row is written.
    pub fn new(title: String, content: String, category: String, tags: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title,
            content,
            category,
            tags,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the user-editable fields, keeping identity and timestamps.
    pub fn apply(&mut self, input: UpdatePostInput) {
        self.title = input.title;
        self.content = input.content;
        self.category = input.category;
        self.tags = input.tags;
    }
}

/// Input for creating a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

/// Input for replacing the editable fields of a post.
///
/// This is a full replacement: omitted tags clear the tag list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostInput {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

/// Accept `"tags": null` as an empty list.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<CreatePostInput> for Post {
    fn from(input: CreatePostInput) -> Self {
        Post::new(input.title, input.content, input.category, input.tags)
    }
}
