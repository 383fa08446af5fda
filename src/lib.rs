pub mod api;
pub mod client;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::api::error::AppError;
use crate::config::ServerConfig;
use crate::services::storage::StorageService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::images::list_images,
        api::handlers::images::get_image,
        api::handlers::images::delete_image,
        api::handlers::upload::upload_files,
        api::handlers::upload::start_upload,
        api::handlers::upload::part_url,
        api::handlers::upload::complete_upload,
        api::handlers::upload::abort_upload,
    ),
    components(
        schemas(
            api::error::ErrorResponse,
            api::handlers::SuccessResponse,
            api::handlers::health::HealthResponse,
            api::handlers::images::ListImagesResponse,
            api::handlers::upload::UploadResponse,
            api::handlers::upload::StartUploadRequest,
            api::handlers::upload::StartUploadResponse,
            api::handlers::upload::PartUrlRequest,
            api::handlers::upload::PartUrlResponse,
            api::handlers::upload::CompleteUploadRequest,
            api::handlers::upload::AbortUploadRequest,
            models::MediaItem,
            models::MediaKind,
            models::UploadedPart,
        )
    ),
    tags(
        (name = "images", description = "Browse, download and delete shared media"),
        (name = "upload", description = "Direct and multipart uploads"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    /// `None` when the bucket credentials are not configured.
    pub storage: Option<Arc<dyn StorageService>>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(storage: Option<Arc<dyn StorageService>>, config: ServerConfig) -> Self {
        Self { storage, config }
    }

    /// The configured store, or the error every storage endpoint answers with.
    pub fn storage(&self) -> Result<Arc<dyn StorageService>, AppError> {
        self.storage.clone().ok_or(AppError::ConfigurationMissing)
    }
}

pub fn create_app(state: AppState) -> Router {
    let max_upload_size = state.config.max_upload_size;

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/images", get(api::handlers::images::list_images))
        .route(
            "/image/*key",
            get(api::handlers::images::get_image).delete(api::handlers::images::delete_image),
        )
        .route(
            "/upload",
            post(api::handlers::upload::upload_files)
                .layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/upload/start", post(api::handlers::upload::start_upload))
        .route("/upload/url", post(api::handlers::upload::part_url))
        .route(
            "/upload/complete",
            post(api::handlers::upload::complete_upload),
        )
        .route("/upload/abort", post(api::handlers::upload::abort_upload))
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .with_state(state)
}
