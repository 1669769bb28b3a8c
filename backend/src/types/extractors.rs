//! Custom extractors that reject with [`AppError`]

use aide::operation::OperationInput;
use aide::OperationOutput;
use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, FromRequest, Multipart, Request,
    },
    http::StatusCode,
    Json,
};
use schemars::JsonSchema;

use crate::types::error::AppError;

/// JSON body extractor with the API error envelope on rejection
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: serde::de::DeserializeOwned + JsonSchema,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| match err {
                JsonRejection::MissingJsonContentType(_) => AppError::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_content_type",
                    "Missing Content-Type: application/json header",
                    false,
                ),
                JsonRejection::JsonDataError(_) => AppError::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_json",
                    "Request body must be a JSON object",
                    false,
                ),
                err if err.status() == StatusCode::PAYLOAD_TOO_LARGE => AppError::new(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "payload_too_large",
                    "Request body exceeds the size limit",
                    false,
                ),
                _ => AppError::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_json",
                    "Invalid JSON payload",
                    false,
                ),
            })?;

        Ok(Self(payload))
    }
}

impl<T> OperationInput for JsonBody<T>
where
    T: JsonSchema,
{
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        Json::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        AppError::inferred_responses(ctx, operation)
    }
}

/// Multipart extractor with the API error envelope on rejection
pub struct MultipartForm(pub Multipart);

impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Multipart::from_request(req, state)
            .await
            .map(Self)
            .map_err(|err: MultipartRejection| {
                tracing::debug!("Multipart rejection: {err}");
                AppError::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_content_type",
                    "Expected a multipart/form-data body",
                    false,
                )
            })
    }
}

impl OperationInput for MultipartForm {
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        Multipart::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        AppError::inferred_responses(ctx, operation)
    }
}
