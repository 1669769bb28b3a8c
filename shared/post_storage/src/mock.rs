//! In-memory [`PostRepository`] implementations for tests

use std::time::Duration;

use tokio::sync::RwLock;

use crate::post::{
    CreatedPost, Post, PostId, PostInput, PostPatch, PostRepository, PostStorageError,
    PostStorageResult, UpdateSummary,
};

/// Keeps posts in insertion order behind a lock, with the same merge and
/// identifier rules as the `MongoDB` store
#[derive(Debug, Default)]
pub struct InMemoryPostStore {
    posts: RwLock<Vec<Post>>,
}

impl InMemoryPostStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored posts
    pub async fn len(&self) -> usize {
        self.posts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.posts.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl PostRepository for InMemoryPostStore {
    async fn list_all(&self) -> PostStorageResult<Vec<Post>> {
        Ok(self.posts.read().await.clone())
    }

    async fn find(&self, id: &str) -> PostStorageResult<Option<Post>> {
        let id = PostId::parse(id)?;
        Ok(self
            .posts
            .read()
            .await
            .iter()
            .find(|post| post.id == id)
            .cloned())
    }

    async fn create(&self, input: PostInput) -> PostStorageResult<CreatedPost> {
        let fields = input.without_reserved_keys();
        fields.to_document()?;

        let id = PostId::generate();
        self.posts.write().await.push(Post { id, fields });
        Ok(CreatedPost { id })
    }

    async fn update(&self, id: &str, patch: PostPatch) -> PostStorageResult<UpdateSummary> {
        let id = PostId::parse(id)?;
        let patch = patch.without_reserved_keys();
        patch.to_document()?;
        let mut posts = self.posts.write().await;

        let Some(post) = posts.iter_mut().find(|post| post.id == id) else {
            return Ok(UpdateSummary::NOT_MATCHED);
        };

        let mut modified = false;
        for (key, value) in patch.into_inner() {
            if post.fields.get(&key) != Some(&value) {
                post.fields.insert(key, value);
                modified = true;
            }
        }

        Ok(UpdateSummary {
            matched_count: 1,
            modified_count: u64::from(modified),
        })
    }
}

/// Repository whose every operation fails as if the store stopped answering
#[derive(Debug, Clone, Copy)]
pub struct UnavailablePostStore {
    timeout: Duration,
}

impl UnavailablePostStore {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait::async_trait]
impl PostRepository for UnavailablePostStore {
    async fn list_all(&self) -> PostStorageResult<Vec<Post>> {
        Err(PostStorageError::Timeout(self.timeout))
    }

    async fn find(&self, id: &str) -> PostStorageResult<Option<Post>> {
        PostId::parse(id)?;
        Err(PostStorageError::Timeout(self.timeout))
    }

    async fn create(&self, _input: PostInput) -> PostStorageResult<CreatedPost> {
        Err(PostStorageError::Timeout(self.timeout))
    }

    async fn update(&self, id: &str, _patch: PostPatch) -> PostStorageResult<UpdateSummary> {
        PostId::parse(id)?;
        Err(PostStorageError::Timeout(self.timeout))
    }
}
