//! Links uploaded image files to post records
//!
//! An upload is first spooled to a hidden temporary file in the upload
//! directory, then moved to a collision-resistant name and recorded on a post.
//! The file move and the store write are not transactional: once the file is
//! in place it stays there even if the store operation fails.
mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::{Stream, TryStreamExt};
use post_storage::post::{
    PostAttribute, PostFields, PostId, PostRepository, UpdateOutcome, UpdateSummary,
};
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

pub use error::{UploadError, UploadResult};

/// Longest file extension carried over from the original name
const MAX_EXTENSION_LEN: usize = 10;

/// An upload spooled to disk but not yet bound to a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    /// Temporary location of the received bytes
    pub temp_path: PathBuf,
    /// File name declared by the client
    pub original_name: String,
}

/// Final location of a bound image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Path relative to the working directory, as stored on the post
    pub image_path: String,
    /// Public URL stored on the post
    pub image_url: String,
}

/// Result of binding an upload to a post
#[derive(Debug, Clone, PartialEq)]
pub enum BoundPost {
    /// A new post was created for the image
    Created {
        /// Identifier of the new post
        id: PostId,
        /// Where the image was stored
        image: StoredImage,
        /// Description recorded with the image, if any
        description: Option<String>,
    },
    /// An existing post was targeted
    Updated {
        /// Identifier of the targeted post
        id: PostId,
        /// Where the image was stored
        image: StoredImage,
        /// Description merged into the post, if any
        description: Option<String>,
        /// Matched/modified counts of the merge
        summary: UpdateSummary,
    },
}

/// Binds uploaded files to post records
pub struct UploadBinder {
    posts: Arc<dyn PostRepository>,
    upload_dir: PathBuf,
    public_base_url: String,
}

impl UploadBinder {
    /// Creates a binder writing into `upload_dir`
    ///
    /// # Arguments
    ///
    /// * `posts` - Repository the image metadata is recorded in
    /// * `upload_dir` - Directory holding both spooled and final files
    /// * `public_base_url` - Prefix for the stored `imageUrl`, without trailing slash
    #[must_use]
    pub fn new(
        posts: Arc<dyn PostRepository>,
        upload_dir: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            posts,
            upload_dir: upload_dir.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Directory holding spooled and bound files
    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Creates the upload directory if it does not exist yet
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Io` if the directory cannot be created
    pub async fn ensure_upload_dir(&self) -> UploadResult<()> {
        fs::create_dir_all(&self.upload_dir).await?;
        Ok(())
    }

    /// Spools a stream of file chunks to a temporary file
    ///
    /// Returns `None` if the stream carried no bytes; nothing is left on disk
    /// in that case or on error.
    ///
    /// # Errors
    ///
    /// Propagates stream errors and returns `UploadError::Io` if writing fails
    pub async fn receive<S, B>(
        &self,
        original_name: &str,
        chunks: S,
    ) -> UploadResult<Option<ReceivedFile>>
    where
        S: Stream<Item = UploadResult<B>> + Send,
        B: AsRef<[u8]> + Send,
    {
        let temp_path = self
            .upload_dir
            .join(format!(".{}.part", Uuid::new_v4().simple()));

        match write_chunks(&temp_path, chunks).await {
            Ok(0) => {
                remove_quietly(&temp_path).await;
                Ok(None)
            }
            Ok(written) => {
                tracing::debug!(bytes = written, path = %temp_path.display(), "Spooled upload");
                Ok(Some(ReceivedFile {
                    temp_path,
                    original_name: original_name.to_string(),
                }))
            }
            Err(err) => {
                remove_quietly(&temp_path).await;
                Err(err)
            }
        }
    }

    /// Removes a spooled file that will not be bound
    pub async fn discard(&self, file: &ReceivedFile) {
        remove_quietly(&file.temp_path).await;
    }

    /// Moves a received file into place and records it on a post
    ///
    /// With `target_id` the post is updated with `imagePath`, `imageUrl` and
    /// (if given) `description`; otherwise a new post is created with them.
    /// The identifier is validated before the file is moved.
    ///
    /// # Errors
    ///
    /// - `UploadError::MissingFile` if `file` is `None`
    /// - `UploadError::Storage` with `InvalidIdentifier` for a malformed `target_id`
    /// - `UploadError::Io` if the file cannot be moved into place
    /// - `UploadError::Storage` if the store operation fails; the moved file is kept
    pub async fn bind_upload(
        &self,
        file: Option<ReceivedFile>,
        description: Option<String>,
        target_id: Option<&str>,
    ) -> UploadResult<BoundPost> {
        let file = file.ok_or(UploadError::MissingFile)?;

        let target = match target_id.map(PostId::parse).transpose() {
            Ok(target) => target,
            Err(err) => {
                self.discard(&file).await;
                return Err(err.into());
            }
        };

        let file_name = storage_file_name(&file.original_name);
        let destination = self.upload_dir.join(&file_name);
        if let Err(err) = fs::rename(&file.temp_path, &destination).await {
            self.discard(&file).await;
            return Err(err.into());
        }

        let image = StoredImage {
            image_path: destination.to_string_lossy().into_owned(),
            image_url: format!("{}/{file_name}", self.public_base_url),
        };

        let mut fields = PostFields::new()
            .with(PostAttribute::ImagePath.to_string(), image.image_path.clone())
            .with(PostAttribute::ImageUrl.to_string(), image.image_url.clone());
        if let Some(description) = &description {
            fields.insert(PostAttribute::Description.to_string(), description.clone());
        }

        let result = match target {
            Some(id) => self
                .posts
                .update(&id.to_hex(), fields)
                .await
                .map(|summary| (id, Some(summary))),
            None => self
                .posts
                .create(fields)
                .await
                .map(|created| (created.id, None)),
        };

        match result {
            Ok((id, None)) => {
                tracing::info!(%id, path = %image.image_path, "Created post for upload");
                Ok(BoundPost::Created {
                    id,
                    image,
                    description,
                })
            }
            Ok((id, Some(summary))) => {
                if summary.outcome() == UpdateOutcome::NotMatched {
                    tracing::warn!(%id, path = %image.image_path, "Upload targeted an unknown post; file left in place");
                }
                Ok(BoundPost::Updated {
                    id,
                    image,
                    description,
                    summary,
                })
            }
            Err(err) => {
                tracing::warn!(path = %image.image_path, "Upload stored but post write failed; file needs manual cleanup: {err}");
                Err(err.into())
            }
        }
    }
}

async fn write_chunks<S, B>(path: &Path, chunks: S) -> UploadResult<usize>
where
    S: Stream<Item = UploadResult<B>> + Send,
    B: AsRef<[u8]> + Send,
{
    futures::pin_mut!(chunks);

    let mut file = fs::File::create(path).await?;
    let mut written = 0;
    while let Some(chunk) = chunks.try_next().await? {
        let bytes = chunk.as_ref();
        file.write_all(bytes).await?;
        written += bytes.len();
    }
    file.sync_all().await?;

    Ok(written)
}

async fn remove_quietly(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), "Failed to remove spooled upload: {err}");
        }
    }
}

/// `{unix_millis}-{uuid}.{ext}`, unique per call regardless of the original name
fn storage_file_name(original_name: &str) -> String {
    let stem = format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    );

    match sanitized_extension(original_name) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

fn sanitized_extension(original_name: &str) -> Option<String> {
    let ext = Path::new(original_name).extension()?.to_str()?;

    (!ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    .then(|| ext.to_ascii_lowercase())
}
