use crate::api::error::{AppError, ErrorResponse};
use crate::api::handlers::SuccessResponse;
use crate::models::{MediaKind, UploadedPart};
use crate::utils::validation::{
    MAX_PART_NUMBER, generate_key, required, sanitize_file_name, validate_part_number,
};
use axum::{
    Json,
    extract::{Multipart, State, rejection::JsonRejection},
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub keys: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartUploadRequest {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartUploadResponse {
    pub upload_id: String,
    pub key: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartUrlRequest {
    pub key: Option<String>,
    pub upload_id: Option<String>,
    /// Anything other than a JSON integer counts as missing.
    #[schema(value_type = Option<i64>)]
    pub part_number: Option<Value>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PartUrlResponse {
    pub url: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadRequest {
    pub key: Option<String>,
    pub upload_id: Option<String>,
    pub parts: Option<Vec<UploadedPart>>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AbortUploadRequest {
    pub key: Option<String>,
    pub upload_id: Option<String>,
}

struct IncomingFile {
    file_name: String,
    content_type: String,
    data: Bytes,
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = String, description = "Multipart form with one or more `file` parts", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "All files stored", body = UploadResponse),
        (status = 400, description = "No file, or a file that is not an image or video", body = ErrorResponse),
        (status = 413, description = "Request body too large", body = ErrorResponse),
        (status = 500, description = "Storage not configured or unreachable", body = ErrorResponse)
    ),
    tag = "upload"
)]
pub async fn upload_files(
    State(state): State<crate::AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let storage = state.storage()?;

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        // Plain text fields named "file" are not files.
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        files.push(IncomingFile {
            file_name,
            content_type,
            data,
        });
    }

    if files.is_empty() {
        return Err(AppError::BadRequest(
            "No file found in the request.".to_string(),
        ));
    }

    // The whole request is refused before anything is written.
    let kinds = files
        .iter()
        .map(|f| MediaKind::from_content_type(&f.content_type))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            AppError::BadRequest("Only image or video uploads are allowed.".to_string())
        })?;

    let mut keys = Vec::with_capacity(files.len());
    for (file, kind) in files.into_iter().zip(kinds) {
        let key = generate_key(kind, Utc::now().timestamp_millis(), &file.file_name);
        let size = file.data.len();

        storage
            .put_object(&key, file.data, &file.content_type)
            .await
            .map_err(|e| AppError::storage(e, "Upload failed. Check server logs for details."))?;

        info!(key = %key, size, "Stored direct upload");
        keys.push(key);
    }

    Ok(Json(UploadResponse {
        success: true,
        keys,
    }))
}

#[utoipa::path(
    post,
    path = "/upload/start",
    request_body = StartUploadRequest,
    responses(
        (status = 200, description = "Multipart upload created", body = StartUploadResponse),
        (status = 400, description = "Missing fileName or contentType", body = ErrorResponse),
        (status = 500, description = "Storage not configured or unreachable", body = ErrorResponse)
    ),
    tag = "upload"
)]
pub async fn start_upload(
    State(state): State<crate::AppState>,
    payload: Result<Json<StartUploadRequest>, JsonRejection>,
) -> Result<Json<StartUploadResponse>, AppError> {
    let storage = state.storage()?;
    let Json(req) = payload?;

    let (Some(file_name), Some(content_type)) =
        (required(req.file_name), required(req.content_type))
    else {
        return Err(AppError::BadRequest(
            "fileName and contentType are required.".to_string(),
        ));
    };

    let kind = if content_type.starts_with("video/") {
        MediaKind::Video
    } else {
        MediaKind::Image
    };
    let key = generate_key(kind, Utc::now().timestamp_millis(), &file_name);
    let safe_name = sanitize_file_name(&file_name);

    let upload_id = storage
        .create_multipart_upload(&key, &content_type, &safe_name)
        .await
        .map_err(|e| AppError::storage_passthrough(e, "Failed to start multipart upload."))?;

    info!(key = %key, upload_id = %upload_id, "Started multipart upload");
    Ok(Json(StartUploadResponse { upload_id, key }))
}

#[utoipa::path(
    post,
    path = "/upload/url",
    request_body = PartUrlRequest,
    responses(
        (status = 200, description = "Presigned URL for one part", body = PartUrlResponse),
        (status = 400, description = "Missing key, uploadId or partNumber", body = ErrorResponse),
        (status = 500, description = "Storage not configured or unreachable", body = ErrorResponse)
    ),
    tag = "upload"
)]
pub async fn part_url(
    State(state): State<crate::AppState>,
    payload: Result<Json<PartUrlRequest>, JsonRejection>,
) -> Result<Json<PartUrlResponse>, AppError> {
    let storage = state.storage()?;
    let Json(req) = payload?;

    let (Some(key), Some(upload_id), Some(part_number)) =
        (
            required(req.key),
            required(req.upload_id),
            req.part_number.as_ref().and_then(Value::as_i64),
        )
    else {
        return Err(AppError::BadRequest(
            "key, uploadId and partNumber are required.".to_string(),
        ));
    };

    if !validate_part_number(part_number) {
        return Err(AppError::BadRequest(format!(
            "partNumber must be between 1 and {}.",
            MAX_PART_NUMBER
        )));
    }

    let url = storage
        .presign_upload_part(
            &key,
            &upload_id,
            part_number as i32,
            state.config.part_url_expiry,
        )
        .await
        .map_err(|e| AppError::storage_passthrough(e, "Failed to create part URL."))?;

    Ok(Json(PartUrlResponse { url }))
}

#[utoipa::path(
    post,
    path = "/upload/complete",
    request_body = CompleteUploadRequest,
    responses(
        (status = 200, description = "Upload assembled", body = SuccessResponse),
        (status = 400, description = "Missing key, uploadId or parts", body = ErrorResponse),
        (status = 500, description = "Storage not configured or unreachable", body = ErrorResponse)
    ),
    tag = "upload"
)]
pub async fn complete_upload(
    State(state): State<crate::AppState>,
    payload: Result<Json<CompleteUploadRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let storage = state.storage()?;
    let Json(req) = payload?;

    let (Some(key), Some(upload_id), Some(mut parts)) = (
        required(req.key),
        required(req.upload_id),
        req.parts.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "key, uploadId and parts are required.".to_string(),
        ));
    };

    // The store rejects part lists that are not in ascending order.
    parts.sort_by_key(|p| p.part_number);

    storage
        .complete_multipart_upload(&key, &upload_id, &parts)
        .await
        .map_err(|e| AppError::storage_passthrough(e, "Failed to complete multipart upload."))?;

    info!(key = %key, upload_id = %upload_id, parts = parts.len(), "Completed multipart upload");
    Ok(Json(SuccessResponse { success: true }))
}

#[utoipa::path(
    post,
    path = "/upload/abort",
    request_body = AbortUploadRequest,
    responses(
        (status = 200, description = "Upload aborted", body = SuccessResponse),
        (status = 400, description = "Missing key or uploadId", body = ErrorResponse),
        (status = 500, description = "Storage not configured or unreachable", body = ErrorResponse)
    ),
    tag = "upload"
)]
pub async fn abort_upload(
    State(state): State<crate::AppState>,
    payload: Result<Json<AbortUploadRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let storage = state.storage()?;
    let Json(req) = payload?;

    let (Some(key), Some(upload_id)) = (required(req.key), required(req.upload_id)) else {
        return Err(AppError::BadRequest(
            "key and uploadId are required.".to_string(),
        ));
    };

    storage
        .abort_multipart_upload(&key, &upload_id)
        .await
        .map_err(|e| AppError::storage_passthrough(e, "Failed to abort multipart upload."))?;

    info!(key = %key, upload_id = %upload_id, "Aborted multipart upload");
    Ok(Json(SuccessResponse { success: true }))
}
