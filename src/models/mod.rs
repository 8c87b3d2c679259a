//! Data models
//!
//! This module contains the data structures used throughout the blog platform:
//! - The `Post` database entity
//! - API request types for creating and updating posts

mod post;

pub use post::{CreatePostInput, Post, UpdatePostInput};
