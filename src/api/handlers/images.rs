use crate::api::error::{AppError, ErrorResponse};
use crate::api::handlers::SuccessResponse;
use crate::models::{MediaItem, sort_newest_first};
use crate::services::storage::StorageError;
use crate::utils::encoding::encode_uri_component;
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ListImagesResponse {
    pub images: Vec<MediaItem>,
}

#[utoipa::path(
    get,
    path = "/images",
    responses(
        (status = 200, description = "Gallery contents, newest first", body = ListImagesResponse),
        (status = 500, description = "Storage not configured or unreachable", body = ErrorResponse)
    ),
    tag = "images"
)]
pub async fn list_images(
    State(state): State<crate::AppState>,
) -> Result<Json<ListImagesResponse>, AppError> {
    let storage = state.storage()?;

    let objects = storage
        .list_objects(&state.config.list_prefix)
        .await
        .map_err(|e| {
            AppError::storage(e, "Failed to list images. Check server logs for details.")
        })?;

    let mut images: Vec<MediaItem> = objects.into_iter().map(MediaItem::from).collect();
    sort_newest_first(&mut images);

    Ok(Json(ListImagesResponse { images }))
}

#[utoipa::path(
    get,
    path = "/image/{key}",
    params(
        ("key" = String, Path, description = "Full object key, slashes included")
    ),
    responses(
        (status = 200, description = "Object body", content_type = "application/octet-stream"),
        (status = 404, description = "Object not found", body = ErrorResponse),
        (status = 500, description = "Storage not configured or unreachable", body = ErrorResponse)
    ),
    tag = "images"
)]
pub async fn get_image(
    State(state): State<crate::AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let storage = state.storage()?;

    let object = match storage.get_object(&key).await {
        Ok(object) => object,
        Err(StorageError::NotFound) => {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Err(e) => return Err(AppError::storage(e, "Failed to fetch image")),
    };

    let file_name = key
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("file");
    let content_disposition = format!("inline; filename=\"{}\"", encode_uri_component(file_name));
    let content_type = object
        .content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition);

    if let Some(length) = object.content_length.filter(|len| *len > 0) {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    let stream = ReaderStream::new(object.body.into_async_read());
    builder
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

#[utoipa::path(
    delete,
    path = "/image/{key}",
    params(
        ("key" = String, Path, description = "Full object key, slashes included")
    ),
    responses(
        (status = 200, description = "Deleted (also when the key did not exist)", body = SuccessResponse),
        (status = 500, description = "Storage not configured or unreachable", body = ErrorResponse)
    ),
    tag = "images"
)]
pub async fn delete_image(
    State(state): State<crate::AppState>,
    Path(key): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let storage = state.storage()?;

    storage
        .delete_object(&key)
        .await
        .map_err(|e| AppError::storage(e, "Failed to delete image"))?;

    tracing::info!(key = %key, "Deleted media object");
    Ok(Json(SuccessResponse { success: true }))
}
