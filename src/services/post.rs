//! Post service
//!
//! Business rules for the post lifecycle:
//! - title, content and category are required on create and update
//! - updates are read-modify-write: only the editable fields of an existing
//!   post are replaced, so an update can never create a row or move
//!   `created_at`
//! - deletes check existence first, so deleting an unknown id is reported
//!   as not found rather than silently succeeding
//!
//! Updates are not guarded against concurrent writers: two interleaved
//! updates of the same post can lose one of the changes.

use crate::db::repositories::PostRepository;
use crate::models::{CreatePostInput, Post, UpdatePostInput};
use std::sync::Arc;

/// Message returned when a required field is missing
pub const REQUIRED_FIELDS_MESSAGE: &str = "all fields (title, content, category) are required";

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Caller-supplied fields failed the required-field checks
    #[error("Validation error: {0}")]
    Validation(String),

    /// No post has this id
    #[error("Post not found: {0}")]
    NotFound(i64),

    /// The storage layer failed
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Reject input whose title, content or category is empty.
pub fn validate_required(
    title: &str,
    content: &str,
    category: &str,
) -> Result<(), PostServiceError> {
    if [title, content, category]
        .iter()
        .any(|field| field.is_empty())
    {
        return Err(PostServiceError::Validation(
            REQUIRED_FIELDS_MESSAGE.to_string(),
        ));
    }
    Ok(())
}

/// Post service for managing blog posts
pub struct PostService {
    repo: Arc<dyn PostRepository>,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    /// Validate and store a new post.
    ///
    /// # Returns
    /// The stored post, with id and timestamps assigned by storage
    ///
    /// # Errors
    /// - `Validation` if title, content or category is empty
    /// - `Storage` if the insert fails
    pub async fn create_post(&self, input: CreatePostInput) -> Result<Post, PostServiceError> {
        validate_required(&input.title, &input.content, &input.category)?;

        let post = self.repo.create(&Post::from(input)).await?;
        tracing::info!(post_id = post.id, "Post created");
        Ok(post)
    }

    /// All posts; empty when there are none.
    pub async fn get_all_posts(&self) -> Result<Vec<Post>, PostServiceError> {
        Ok(self.repo.get_all().await?)
    }

    /// Fetch one post.
    ///
    /// A missing post is `NotFound`; a failed lookup is `Storage`.
    pub async fn get_post_by_id(&self, id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(PostServiceError::NotFound(id))
    }

    /// Replace the editable fields of an existing post.
    ///
    /// The stored post is fetched, its title, content, category and tags
    /// are overwritten from `input`, and the merged post is written back.
    /// Its id and `created_at` come from the stored row, never the input.
    ///
    /// # Errors
    /// - `Validation` if title, content or category is empty (nothing is read or written)
    /// - `NotFound` if no post has this id
    /// - `Storage` if the read or the write fails
    pub async fn update_post(
        &self,
        id: i64,
        input: UpdatePostInput,
    ) -> Result<(), PostServiceError> {
        validate_required(&input.title, &input.content, &input.category)?;

        let mut post = self.get_post_by_id(id).await?;
        post.apply(input);
        self.repo.update(&post).await?;

        tracing::info!(post_id = id, "Post updated");
        Ok(())
    }

    /// Delete an existing post.
    ///
    /// # Errors
    /// - `NotFound` if no post has this id
    /// - `Storage` if the lookup or the delete fails
    pub async fn delete_post(&self, id: i64) -> Result<(), PostServiceError> {
        let post = self.get_post_by_id(id).await?;
        self.repo.delete(post.id).await?;

        tracing::info!(post_id = id, "Post deleted");
        Ok(())
    }
}
