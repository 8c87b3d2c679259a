//! Posts API endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::api::common::{ApiError, AppState};
use crate::models::{CreatePostInput, UpdatePostInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/{id}", get(get_post).put(update_post).delete(delete_post))
}

async fn create_post(
    State(state): State<AppState>,
    body: Result<Json<CreatePostInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = body?;
    let post = state.post_service.create_post(input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn list_posts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let posts = state.post_service.get_all_posts().await?;
    Ok(Json(posts))
}

async fn get_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let post = state.post_service.get_post_by_id(id).await?;
    Ok(Json(post))
}

async fn update_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdatePostInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let Json(input) = body?;
    state.post_service.update_post(id, input).await?;
    Ok((StatusCode::OK, "Post updated successfully"))
}

async fn delete_post(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    state.post_service.delete_post(id).await?;
    Ok((StatusCode::OK, "Post deleted successfully"))
}

#[cfg(test)]
mod tests {
    use crate::api::{build_router, AppState};
    use crate::db::repositories::{PostRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::Post;
    use crate::services::PostService;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use std::sync::Arc;

    async fn setup_server() -> TestServer {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let service = PostService::new(SqlxPostRepository::boxed(pool));
        let app = build_router(AppState::new(Arc::new(service)), "http://localhost:3000")
            .expect("Failed to build router");
        TestServer::new(app).expect("Failed to start test server")
    }

    /// Repository standing in for an unreachable database.
    struct UnavailableRepository;

    #[async_trait]
    impl PostRepository for UnavailableRepository {
        async fn create(&self, _post: &Post) -> anyhow::Result<Post> {
            anyhow::bail!("database is locked")
        }

        async fn get_by_id(&self, _id: i64) -> anyhow::Result<Option<Post>> {
            anyhow::bail!("database is locked")
        }

        async fn get_all(&self) -> anyhow::Result<Vec<Post>> {
            anyhow::bail!("database is locked")
        }

        async fn update(&self, _post: &Post) -> anyhow::Result<()> {
            anyhow::bail!("database is locked")
        }

        async fn delete(&self, _id: i64) -> anyhow::Result<()> {
            anyhow::bail!("database is locked")
        }
    }

    fn setup_unavailable_server() -> TestServer {
        let service = PostService::new(Arc::new(UnavailableRepository));
        let app = build_router(AppState::new(Arc::new(service)), "http://localhost:3000")
            .expect("Failed to build router");
        TestServer::new(app).expect("Failed to start test server")
    }

    async fn create(server: &TestServer, body: Value) -> Post {
        let response = server.post("/posts").json(&body).await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Post>()
    }

    #[tokio::test]
    async fn test_welcome_route() {
        let server = setup_server().await;

        let response = server.get("/").await;

        response.assert_status_ok();
        response.assert_text("Welcome to the blogging platform!");
    }

    #[tokio::test]
    async fn test_create_returns_created_post() {
        let server = setup_server().await;

        let post = create(
            &server,
            json!({"title": "Hello", "content": "World", "category": "intro", "tags": ["go", "web"]}),
        )
        .await;

        assert!(post.id > 0);
        assert_eq!(post.title, "Hello");
        assert_eq!(post.tags, vec!["go", "web"]);
    }

    #[tokio::test]
    async fn test_create_missing_field_is_bad_request() {
        let server = setup_server().await;

        let response = server
            .post("/posts")
            .json(&json!({"title": "Hello", "content": "", "category": "intro"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_create_malformed_body_is_bad_request() {
        let server = setup_server().await;

        let response = server
            .post("/posts")
            .content_type("application/json")
            .bytes("{not json".into())
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["message"], "Invalid request format");
    }

    #[tokio::test]
    async fn test_list_empty_then_populated() {
        let server = setup_server().await;

        let empty = server.get("/posts").await;
        empty.assert_status_ok();
        empty.assert_json(&json!([]));

        create(&server, json!({"title": "a", "content": "b", "category": "c"})).await;
        let posts: Vec<Post> = server.get("/posts").await.json();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].tags.is_empty());
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let server = setup_server().await;
        let created = create(&server, json!({"title": "a", "content": "b", "category": "c"})).await;

        let response = server.get(&format!("/posts/{}", created.id)).await;

        response.assert_status_ok();
        assert_eq!(response.json::<Post>(), created);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let server = setup_server().await;

        let response = server.get("/posts/9999").await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["error"]["message"], "Post not found");
    }

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let server = setup_server().await;

        for response in [
            server.get("/posts/abc").await,
            server.delete("/posts/abc").await,
            server
                .put("/posts/abc")
                .json(&json!({"title": "a", "content": "b", "category": "c"}))
                .await,
        ] {
            response.assert_status(StatusCode::BAD_REQUEST);
            let body: Value = response.json();
            assert_eq!(body["error"]["message"], "Invalid ID format");
        }
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let server = setup_server().await;
        let created = create(
            &server,
            json!({"title": "a", "content": "b", "category": "c", "tags": ["x"]}),
        )
        .await;

        let response = server
            .put(&format!("/posts/{}", created.id))
            .json(&json!({"title": "A", "content": "B", "category": "C", "tags": ["y", "z"]}))
            .await;
        response.assert_status_ok();
        response.assert_text("Post updated successfully");

        let fetched: Post = server.get(&format!("/posts/{}", created.id)).await.json();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.created_at, created.created_at);
        assert_eq!(fetched.title, "A");
        assert_eq!(fetched.tags, vec!["y", "z"]);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let server = setup_server().await;

        let response = server
            .put("/posts/9999")
            .json(&json!({"title": "a", "content": "b", "category": "c"}))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        server.get("/posts").await.assert_json(&json!([]));
    }

    #[tokio::test]
    async fn test_update_invalid_is_bad_request() {
        let server = setup_server().await;
        let created = create(&server, json!({"title": "a", "content": "b", "category": "c"})).await;

        let response = server
            .put(&format!("/posts/{}", created.id))
            .json(&json!({"title": "", "content": "b", "category": "c"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_whitespace_title_is_created() {
        let server = setup_server().await;

        let post = create(&server, json!({"title": " ", "content": "b", "category": "c"})).await;

        assert_eq!(post.title, " ");
    }

    #[tokio::test]
    async fn test_null_tags_are_empty() {
        let server = setup_server().await;

        let post = create(
            &server,
            json!({"title": "a", "content": "b", "category": "c", "tags": null}),
        )
        .await;
        assert!(post.tags.is_empty());

        server
            .put(&format!("/posts/{}", post.id))
            .json(&json!({"title": "a", "content": "b", "category": "c", "tags": null}))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_storage_fault_is_internal_error() {
        let server = setup_unavailable_server();
        let body = json!({"title": "a", "content": "b", "category": "c"});

        for response in [
            server.get("/posts").await,
            server.get("/posts/1").await,
            server.post("/posts").json(&body).await,
            server.put("/posts/1").json(&body).await,
            server.delete("/posts/1").await,
        ] {
            response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
            let error: Value = response.json();
            assert_eq!(error["error"]["message"], "Internal server error");
            assert!(!response.text().contains("database is locked"));
        }
    }

    #[tokio::test]
    async fn test_delete_then_delete_again() {
        let server = setup_server().await;
        let created = create(&server, json!({"title": "a", "content": "b", "category": "c"})).await;
        let path = format!("/posts/{}", created.id);

        let first = server.delete(&path).await;
        first.assert_status_ok();
        first.assert_text("Post deleted successfully");

        server.delete(&path).await.assert_status(StatusCode::NOT_FOUND);
        server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
    }
}
