//! Client for the gallery HTTP API.
//!
//! [`GalleryClient`] speaks to a running server, [`MultipartOrchestrator`]
//! drives a chunked upload through it, and [`PendingUploads`] stages files
//! before they are submitted.

pub mod http;
pub mod multipart;
pub mod pending;

pub use http::{DownloadSummary, DownloadedImage, GalleryClient, local_file_name};
pub use multipart::{
    DEFAULT_PART_SIZE, MultipartApi, MultipartOrchestrator, PartUploadResponse, PartUploader,
    StartedUpload,
};
pub use pending::{PendingUpload, PendingUploads};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Non-2xx answer from the gallery server, carrying its `error` field.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Unexpected empty response from server.")]
    EmptyResponse,

    #[error("Unexpected response from server: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to upload part {part_number} ({status}).")]
    PartUpload { part_number: i32, status: u16 },

    #[error("Upload failed: missing ETag header.")]
    MissingEtag,

    #[error("{path} is not an image or video ({content_type})")]
    Rejected { path: String, content_type: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
