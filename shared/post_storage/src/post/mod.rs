//! Posts collection storage
//!
//! Every operation is a fresh round trip to the store; nothing is cached here.

mod error;
mod types;

use std::future::IntoFuture;
use std::time::Duration;

use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    Collection,
};
use tracing::instrument;

use crate::connection::ConnectionManager;

pub use error::{PostStorageError, PostStorageResult};
pub use types::{
    CreatedPost, Post, PostAttribute, PostFields, PostId, PostInput, PostPatch, UpdateOutcome,
    UpdateSummary,
};

/// Collection holding every post
pub const POSTS_COLLECTION: &str = "posts";

/// Default upper bound on a single store round trip
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Read/write contract over the posts collection
#[async_trait::async_trait]
pub trait PostRepository: Send + Sync {
    /// Returns every post in storage-defined order
    ///
    /// An empty collection yields an empty vector.
    async fn list_all(&self) -> PostStorageResult<Vec<Post>>;

    /// Looks up a single post by its hex identifier
    async fn find(&self, id: &str) -> PostStorageResult<Option<Post>>;

    /// Inserts a new post; the store assigns its identifier
    async fn create(&self, input: PostInput) -> PostStorageResult<CreatedPost>;

    /// Merges `patch` into the post with the given hex identifier
    ///
    /// The identifier is parsed before any store access. Only keys present in
    /// `patch` are written. An unknown identifier matches nothing and creates
    /// nothing. An empty patch writes nothing and only reports whether the
    /// post exists.
    async fn update(&self, id: &str, patch: PostPatch) -> PostStorageResult<UpdateSummary>;
}

/// `MongoDB` implementation of [`PostRepository`]
pub struct PostStore {
    collection: Collection<Document>,
    operation_timeout: Duration,
}

impl PostStore {
    /// Creates a store over the `posts` collection of the managed database
    ///
    /// # Errors
    ///
    /// Returns `PostStorageError::Connection` if the connection cannot be
    /// established
    pub async fn new(connection: &ConnectionManager) -> PostStorageResult<Self> {
        let collection = connection.collection::<Document>(POSTS_COLLECTION).await?;

        Ok(Self {
            collection,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        })
    }

    /// Overrides the per-operation timeout
    #[must_use]
    pub const fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    async fn bounded<F, T>(&self, operation: F) -> PostStorageResult<T>
    where
        F: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        bounded(self.operation_timeout, operation).await
    }
}

/// Runs a single store round trip, failing with `Timeout` past `limit`
async fn bounded<F, T>(limit: Duration, operation: F) -> PostStorageResult<T>
where
    F: IntoFuture<Output = mongodb::error::Result<T>>,
{
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| PostStorageError::Timeout(limit))?
        .map_err(PostStorageError::from)
}

/// Converts listed documents, skipping any that are not posts
///
/// Documents written outside the service may carry a non-`ObjectId` `_id`;
/// one such document must not hide the rest of the collection.
fn posts_from_documents(documents: Vec<Document>) -> Vec<Post> {
    documents
        .into_iter()
        .filter_map(|document| {
            let raw_id = document.get(PostAttribute::Id.to_string()).cloned();
            match Post::try_from(document) {
                Ok(post) => Some(post),
                Err(err) => {
                    tracing::warn!(?raw_id, "Skipping unreadable post document: {err}");
                    None
                }
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl PostRepository for PostStore {
    async fn list_all(&self) -> PostStorageResult<Vec<Post>> {
        let documents = self
            .bounded(async {
                let cursor = self.collection.find(doc! {}).await?;
                cursor.try_collect::<Vec<Document>>().await
            })
            .await?;

        tracing::debug!(count = documents.len(), "Listed posts");

        Ok(posts_from_documents(documents))
    }

    #[instrument(skip(self))]
    async fn find(&self, id: &str) -> PostStorageResult<Option<Post>> {
        let id = PostId::parse(id)?;

        self.bounded(self.collection.find_one(doc! { "_id": id.as_object_id() }))
            .await?
            .map(Post::try_from)
            .transpose()
    }

    #[instrument(skip_all)]
    async fn create(&self, input: PostInput) -> PostStorageResult<CreatedPost> {
        let document = input.without_reserved_keys().to_document()?;

        let result = self.bounded(self.collection.insert_one(document)).await?;

        let id = result
            .inserted_id
            .as_object_id()
            .map(PostId::from)
            .ok_or_else(|| {
                PostStorageError::Serialization(format!(
                    "store assigned a non-ObjectId identifier: {}",
                    result.inserted_id
                ))
            })?;

        tracing::info!(%id, "Created post");
        Ok(CreatedPost { id })
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &str, patch: PostPatch) -> PostStorageResult<UpdateSummary> {
        let id = PostId::parse(id)?;
        let patch = patch.without_reserved_keys();
        let filter = doc! { "_id": id.as_object_id() };

        if patch.is_empty() {
            let matched_count = self.bounded(self.collection.count_documents(filter)).await?;
            return Ok(UpdateSummary {
                matched_count,
                modified_count: 0,
            });
        }

        let update = doc! { "$set": patch.to_document()? };
        let summary =
            UpdateSummary::from(self.bounded(self.collection.update_one(filter, update)).await?);

        tracing::info!(
            matched = summary.matched_count,
            modified = summary.modified_count,
            "Updated post"
        );
        Ok(summary)
    }
}
