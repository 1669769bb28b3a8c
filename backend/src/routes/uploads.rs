use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path},
    http::StatusCode,
    Extension, Json,
};
use futures::TryStreamExt;
use post_storage::post::{PostId, UpdateOutcome};
use schemars::JsonSchema;
use serde::Serialize;
use tracing::instrument;

use crate::{
    types::{AppError, MultipartForm},
    upload_binder::{BoundPost, ReceivedFile, UploadBinder, UploadError, UploadResult},
};

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Field name older clients send the image under
pub const LEGACY_IMAGE_FIELD: &str = "imagem";

/// Multipart field carrying the optional description
pub const DESCRIPTION_FIELD: &str = "description";

/// Response for a bound upload
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Post the image was bound to
    #[schemars(with = "String")]
    pub id: PostId,
    /// Path the image was stored at
    pub image_path: String,
    /// Public URL recorded for the image
    pub image_url: String,
    /// Description recorded with the image, if one was sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Posts matched by an update (absent on create)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_count: Option<u64>,
    /// Posts modified by an update (absent on create)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_count: Option<u64>,
}

impl UploadResponse {
    fn from_bound(bound: BoundPost) -> (StatusCode, Self) {
        match bound {
            BoundPost::Created {
                id,
                image,
                description,
            } => (
                StatusCode::CREATED,
                Self {
                    id,
                    image_path: image.image_path,
                    image_url: image.image_url,
                    description,
                    matched_count: None,
                    modified_count: None,
                },
            ),
            BoundPost::Updated {
                id,
                image,
                description,
                summary,
            } => {
                let status = if summary.outcome() == UpdateOutcome::NotMatched {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::OK
                };
                (
                    status,
                    Self {
                        id,
                        image_path: image.image_path,
                        image_url: image.image_url,
                        description,
                        matched_count: Some(summary.matched_count),
                        modified_count: Some(summary.modified_count),
                    },
                )
            }
        }
    }
}

/// Fields read from an upload request
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<ReceivedFile>,
    description: Option<String>,
}

fn multipart_error(err: MultipartError) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge
    } else {
        UploadError::InvalidUpload(err.body_text())
    }
}

/// Reads the multipart body, spooling the first non-empty image part
///
/// Unknown fields are skipped. A file part without a file name counts as no
/// file. Any spooled file is removed again if a later part fails.
async fn read_upload_form(
    binder: &UploadBinder,
    mut multipart: Multipart,
) -> UploadResult<UploadForm> {
    let mut form = UploadForm::default();

    let result: UploadResult<()> = async {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().map(ToString::to_string);
            match name.as_deref() {
                Some(IMAGE_FIELD | LEGACY_IMAGE_FIELD) if form.file.is_none() => {
                    let original_name = field.file_name().unwrap_or_default().to_string();
                    if original_name.is_empty() {
                        continue;
                    }
                    form.file = binder
                        .receive(&original_name, field.map_err(multipart_error))
                        .await?;
                }
                Some(DESCRIPTION_FIELD) => {
                    form.description = Some(field.text().await.map_err(multipart_error)?);
                }
                _ => {}
            }
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => Ok(form),
        Err(err) => {
            if let Some(file) = form.file.take() {
                binder.discard(&file).await;
            }
            Err(err)
        }
    }
}

/// Uploads an image and creates a new post for it
///
/// Expects `multipart/form-data` with an `image` file part (`imagem` is also
/// accepted) and an optional `description` text part. The file is stored
/// under a unique name in the upload directory.
///
/// # Returns
///
/// Returns `201 CREATED` with the new post id and the stored image location
///
/// # Errors
///
/// - `400 BAD_REQUEST` - No file was attached or the body is not multipart
/// - `413 PAYLOAD_TOO_LARGE` - The body exceeds the upload limit
/// - `500 INTERNAL_SERVER_ERROR` - Writing the file or the post failed
#[instrument(skip_all)]
pub async fn upload_image(
    Extension(binder): Extension<Arc<UploadBinder>>,
    MultipartForm(multipart): MultipartForm,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let form = read_upload_form(&binder, multipart).await?;

    let bound = binder
        .bind_upload(form.file, form.description, None)
        .await?;

    let (status, response) = UploadResponse::from_bound(bound);
    Ok((status, Json(response)))
}

/// Uploads an image and merges it into an existing post
///
/// Sets `imagePath`, `imageUrl` and, if sent, `description` on the post;
/// every other field is kept. The id is validated before anything is
/// written to disk.
///
/// # Returns
///
/// Returns `200 OK` with matched/modified counts, or `404 NOT_FOUND` with
/// zero counts if no post has this id (no post is created)
///
/// # Errors
///
/// - `400 BAD_REQUEST` - Malformed id, no file attached, or not multipart
/// - `413 PAYLOAD_TOO_LARGE` - The body exceeds the upload limit
/// - `500 INTERNAL_SERVER_ERROR` - Writing the file or the post failed
#[instrument(skip(binder, multipart))]
pub async fn update_image(
    Extension(binder): Extension<Arc<UploadBinder>>,
    Path(id): Path<String>,
    MultipartForm(multipart): MultipartForm,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    PostId::parse(&id)?;

    let form = read_upload_form(&binder, multipart).await?;

    let bound = binder
        .bind_upload(form.file, form.description, Some(&id))
        .await?;

    let (status, response) = UploadResponse::from_bound(bound);
    Ok((status, Json(response)))
}
