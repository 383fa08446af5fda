use super::ClientError;
use crate::models::{MultipartSession, UploadedPart};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{info, warn};

/// 8 MiB parts stay well above the store's 5 MiB minimum.
pub const DEFAULT_PART_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedUpload {
    pub upload_id: String,
    pub key: String,
}

/// The four server-side multipart session calls.
#[async_trait]
pub trait MultipartApi: Send + Sync {
    async fn start(&self, file_name: &str, content_type: &str)
    -> Result<StartedUpload, ClientError>;
    async fn part_url(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
    ) -> Result<String, ClientError>;
    async fn complete(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), ClientError>;
    async fn abort(&self, key: &str, upload_id: &str) -> Result<(), ClientError>;
}

/// What the store answered to a presigned part PUT.
#[derive(Debug, Clone)]
pub struct PartUploadResponse {
    pub status: u16,
    pub etag: Option<String>,
}

/// Sends one chunk straight to the store through a presigned URL.
#[async_trait]
pub trait PartUploader: Send + Sync {
    async fn put_part(
        &self,
        url: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<PartUploadResponse, ClientError>;
}

/// Drives one file through start → (url → put → etag)* → complete, aborting
/// the session on the first failure.
pub struct MultipartOrchestrator<'a> {
    api: &'a dyn MultipartApi,
    uploader: &'a dyn PartUploader,
    part_size: usize,
}

impl<'a> MultipartOrchestrator<'a> {
    pub fn new(api: &'a dyn MultipartApi, uploader: &'a dyn PartUploader) -> Self {
        Self {
            api,
            uploader,
            part_size: DEFAULT_PART_SIZE,
        }
    }

    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(1);
        self
    }

    pub fn part_size(&self) -> usize {
        self.part_size
    }

    pub async fn upload<R>(
        &self,
        file_name: &str,
        content_type: &str,
        reader: R,
    ) -> Result<MultipartSession, ClientError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let started = self.api.start(file_name, content_type).await?;
        info!(key = %started.key, upload_id = %started.upload_id, "Multipart upload started");

        let result = async {
            let parts = self.upload_parts(&started, content_type, reader).await?;
            self.api
                .complete(&started.key, &started.upload_id, &parts)
                .await?;
            Ok::<_, ClientError>(parts)
        }
        .await;

        match result {
            Ok(parts) => {
                info!(key = %started.key, parts = parts.len(), "Multipart upload completed");
                Ok(MultipartSession {
                    key: started.key,
                    upload_id: started.upload_id,
                    parts,
                })
            }
            Err(err) => {
                if let Err(abort_err) = self.api.abort(&started.key, &started.upload_id).await {
                    warn!(
                        key = %started.key,
                        upload_id = %started.upload_id,
                        error = %abort_err,
                        "Failed to abort multipart upload"
                    );
                }
                Err(err)
            }
        }
    }

    async fn upload_parts<R>(
        &self,
        started: &StartedUpload,
        content_type: &str,
        mut reader: R,
    ) -> Result<Vec<UploadedPart>, ClientError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut parts = Vec::new();
        let mut part_number = 1;
        let mut buffer = vec![0u8; self.part_size];

        loop {
            let mut n = 0;
            while n < self.part_size {
                let read = reader.read(&mut buffer[n..]).await?;
                if read == 0 {
                    break;
                }
                n += read;
            }

            if n == 0 {
                break;
            }

            let url = self
                .api
                .part_url(&started.key, &started.upload_id, part_number)
                .await?;

            let response = self
                .uploader
                .put_part(&url, Bytes::copy_from_slice(&buffer[..n]), content_type)
                .await?;

            if !(200..300).contains(&response.status) {
                return Err(ClientError::PartUpload {
                    part_number,
                    status: response.status,
                });
            }

            let etag = response.etag.ok_or(ClientError::MissingEtag)?;
            parts.push(UploadedPart {
                part_number,
                e_tag: etag.replace('"', ""),
            });

            if n < self.part_size {
                break;
            }
            part_number += 1;
        }

        Ok(parts)
    }
}
