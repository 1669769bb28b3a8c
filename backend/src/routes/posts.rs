use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use post_storage::post::{CreatedPost, Post, PostInput, PostRepository};
use tracing::instrument;

use crate::types::{AppError, JsonBody};

/// Lists every post
///
/// Returns the whole collection in storage order. An empty collection
/// yields an empty array.
///
/// # Errors
///
/// - `500 INTERNAL_SERVER_ERROR` - The document store failed
/// - `504 GATEWAY_TIMEOUT` - The document store did not answer in time
#[instrument(skip(posts))]
pub async fn list_posts(
    Extension(posts): Extension<Arc<dyn PostRepository>>,
) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(posts.list_all().await?))
}

/// Fetches a single post by id
///
/// # Errors
///
/// - `400 BAD_REQUEST` - The id is not a 24-character hex string
/// - `404 NOT_FOUND` - No post has this id
/// - `500 INTERNAL_SERVER_ERROR` - The document store failed
#[instrument(skip(posts))]
pub async fn get_post(
    Extension(posts): Extension<Arc<dyn PostRepository>>,
    Path(id): Path<String>,
) -> Result<Json<Post>, AppError> {
    posts
        .find(&id)
        .await?
        .map(Json)
        .ok_or_else(AppError::post_not_found)
}

/// Creates a post from an arbitrary JSON object
///
/// The body is stored as-is apart from `_id`/`id`, which the store assigns.
///
/// # Returns
///
/// Returns `201 CREATED` with the new post id
///
/// # Errors
///
/// - `400 BAD_REQUEST` - The body is not a JSON object, or a field name or
///   value cannot be stored (`$`-prefixed or dotted names, integers above `i64::MAX`)
/// - `500 INTERNAL_SERVER_ERROR` - The document store failed
#[instrument(skip(posts, input))]
pub async fn create_post(
    Extension(posts): Extension<Arc<dyn PostRepository>>,
    JsonBody(input): JsonBody<PostInput>,
) -> Result<(StatusCode, Json<CreatedPost>), AppError> {
    let created = posts.create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
