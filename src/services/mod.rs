//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They are
//! responsible for:
//! - Implementing business rules
//! - Validating caller input
//! - Classifying failures for the API layer

pub mod post;

pub use post::{validate_required, PostService, PostServiceError};
