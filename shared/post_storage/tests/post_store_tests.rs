//! Tests against a live `MongoDB`
//!
//! Run with: `MONGODB_URI=mongodb://localhost:27017 cargo test -p post_storage -- --ignored`

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use post_storage::connection::ConnectionManager;
use post_storage::post::{
    PostFields, PostId, PostRepository, PostStorageError, PostStore, UpdateOutcome, UpdateSummary,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";

/// Test context that drops its throwaway database on drop
struct TestContext {
    store: PostStore,
    connection: Arc<ConnectionManager>,
}

impl Drop for TestContext {
    fn drop(&mut self) {
        let connection = self.connection.clone();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Ok(database) = connection.database().await {
                    let _ = database.drop().await;
                }
            });
        }
    }
}

/// Creates a store over a uniquely named database to avoid races among tests
async fn setup_test() -> TestContext {
    let uri = std::env::var("MONGODB_URI").unwrap_or_else(|_| DEFAULT_MONGODB_URI.to_string());
    let database_name = format!("test-instabytes-{}", PostId::generate());

    let connection = Arc::new(
        ConnectionManager::new(Some(uri), database_name)
            .expect("connection string is set")
            .with_server_selection_timeout(Duration::from_secs(2)),
    );
    let store = PostStore::new(&connection)
        .await
        .expect("Failed to connect to MongoDB")
        .with_operation_timeout(Duration::from_secs(5));

    TestContext { store, connection }
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn test_list_all_on_empty_collection() {
    let ctx = setup_test().await;

    let posts = ctx.store.list_all().await.unwrap();

    assert!(posts.is_empty());
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn test_create_then_list_returns_superset_of_input() {
    let ctx = setup_test().await;
    let input = PostFields::new()
        .with("description", "hi")
        .with("imagePath", "uploads/1-a.png")
        .with("tags", json!(["sunset", "beach"]));

    let created = ctx.store.create(input.clone()).await.unwrap();
    let posts = ctx.store.list_all().await.unwrap();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, created.id);
    for (key, value) in input.iter() {
        assert_eq!(posts[0].fields.get(key), Some(value), "field {key}");
    }
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn test_update_merges_only_supplied_fields() {
    let ctx = setup_test().await;
    let created = ctx
        .store
        .create(
            PostFields::new()
                .with("description", "hi")
                .with("imagePath", "uploads/1-a.png"),
        )
        .await
        .unwrap();
    let id = created.id.to_hex();

    let summary = ctx
        .store
        .update(&id, PostFields::new().with("description", "bye"))
        .await
        .unwrap();

    assert_eq!(summary.outcome(), UpdateOutcome::Modified);
    let post = ctx.store.find(&id).await.unwrap().expect("post exists");
    assert_eq!(post.id, created.id);
    assert_eq!(post.fields.get("description"), Some(&json!("bye")));
    assert_eq!(post.fields.get("imagePath"), Some(&json!("uploads/1-a.png")));
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn test_update_identical_patch_is_unchanged() {
    let ctx = setup_test().await;
    let created = ctx
        .store
        .create(PostFields::new().with("description", "hi"))
        .await
        .unwrap();

    let summary = ctx
        .store
        .update(
            &created.id.to_hex(),
            PostFields::new().with("description", "hi"),
        )
        .await
        .unwrap();

    assert_eq!(summary.outcome(), UpdateOutcome::Unchanged);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn test_update_empty_patch_reports_match_without_writing() {
    let ctx = setup_test().await;
    let created = ctx
        .store
        .create(PostFields::new().with("description", "hi"))
        .await
        .unwrap();

    let summary = ctx
        .store
        .update(&created.id.to_hex(), PostFields::new())
        .await
        .unwrap();
    assert_eq!(summary.outcome(), UpdateOutcome::Unchanged);

    let summary = ctx
        .store
        .update(&PostId::generate().to_hex(), PostFields::new())
        .await
        .unwrap();
    assert_eq!(summary, UpdateSummary::NOT_MATCHED);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn test_update_malformed_identifier_fails_without_mutation() {
    let ctx = setup_test().await;
    ctx.store
        .create(PostFields::new().with("description", "hi"))
        .await
        .unwrap();
    let before = ctx.store.list_all().await.unwrap();

    let result = ctx
        .store
        .update(
            "not-a-valid-hex-id",
            PostFields::new().with("description", "bye"),
        )
        .await;

    assert!(matches!(result, Err(PostStorageError::InvalidIdentifier(_))));
    assert_eq!(ctx.store.list_all().await.unwrap(), before);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn test_update_unknown_identifier_does_not_upsert() {
    let ctx = setup_test().await;

    let summary = ctx
        .store
        .update(
            "507f1f77bcf86cd799439011",
            PostFields::new().with("description", "bye"),
        )
        .await
        .unwrap();

    assert_eq!(summary.outcome(), UpdateOutcome::NotMatched);
    assert!(ctx.store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn test_update_cannot_rewrite_identifier() {
    let ctx = setup_test().await;
    let created = ctx
        .store
        .create(PostFields::new().with("description", "hi"))
        .await
        .unwrap();

    ctx.store
        .update(
            &created.id.to_hex(),
            PostFields::new()
                .with("_id", "507f1f77bcf86cd799439011")
                .with("description", "bye"),
        )
        .await
        .unwrap();

    let posts = ctx.store.list_all().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, created.id);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn test_concurrent_creates_receive_distinct_ids() {
    let ctx = setup_test().await;

    let creates = (0..16).map(|i| {
        ctx.store
            .create(PostFields::new().with("description", format!("post {i}")))
    });
    let results = join_all(creates).await;

    let mut ids: Vec<String> = results
        .into_iter()
        .map(|result| result.unwrap().id.to_hex())
        .collect();
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 16);
    assert_eq!(ctx.store.list_all().await.unwrap().len(), 16);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn test_connect_is_idempotent() {
    let ctx = setup_test().await;

    let first = ctx.connection.connect().await.unwrap() as *const _;
    let second = ctx.connection.connect().await.unwrap() as *const _;

    assert_eq!(first, second);
}
