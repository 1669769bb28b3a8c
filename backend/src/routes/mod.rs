mod docs;

/// Liveness endpoint
pub mod health;

/// Post listing, lookup and creation
pub mod posts;

/// Image uploads bound to posts
pub mod uploads;
use aide::axum::{
    routing::{get, post, put},
    ApiRouter,
};

/// Creates the router with all handler routes
#[must_use]
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .merge(docs::handler())
        .api_route("/health", get(health::handler))
        .api_route(
            "/posts",
            get(posts::list_posts).post(posts::create_post),
        )
        .api_route("/posts/{id}", get(posts::get_post))
        .api_route("/upload", post(uploads::upload_image))
        .api_route("/upload/{id}", put(uploads::update_image))
}
