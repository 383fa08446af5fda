use crate::models::{ObjectSummary, UploadedPart};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    /// The store answered with a structured error carrying a message.
    #[error("{message}")]
    Service { message: String },

    #[error("Object not found")]
    NotFound,

    /// Transport, presigning or malformed-reply failures.
    #[error("Storage request failed: {0}")]
    Request(String),
}

impl StorageError {
    fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        match err.as_service_error().and_then(|e| e.message()) {
            Some(message) => StorageError::Service {
                message: message.to_string(),
            },
            None => StorageError::Request(DisplayErrorContext(&err).to_string()),
        }
    }

    /// The store's own message, if it sent one.
    pub fn service_message(&self) -> Option<&str> {
        match self {
            StorageError::Service { message } => Some(message),
            _ => None,
        }
    }
}

/// An object body and the headers needed to serve it.
pub struct StoredObject {
    pub body: ByteStream,
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
}

#[async_trait]
pub trait StorageService: Send + Sync {
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str)
    -> Result<(), StorageError>;
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError>;
    async fn get_object(&self, key: &str) -> Result<StoredObject, StorageError>;
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
        original_name: &str,
    ) -> Result<String, StorageError>;
    async fn presign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> Result<String, StorageError>;
    /// `parts` must already be in ascending part-number order.
    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), StorageError>;
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str)
    -> Result<(), StorageError>;
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(StorageError::from_sdk)?;
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .map_err(StorageError::from_sdk)?;

            for object in res.contents.unwrap_or_default() {
                let Some(key) = object.key else {
                    continue;
                };
                let last_modified = object
                    .last_modified
                    .and_then(|d| chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos()));
                objects.push(ObjectSummary {
                    key,
                    size: object.size.unwrap_or(0),
                    last_modified,
                });
            }

            if res.is_truncated.unwrap_or(false) && res.next_continuation_token.is_some() {
                continuation_token = res.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(objects)
    }

    async fn get_object(&self, key: &str) -> Result<StoredObject, StorageError> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(output) => Ok(StoredObject {
                content_type: output.content_type,
                content_length: output.content_length,
                body: output.body,
            }),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    Err(StorageError::NotFound)
                } else {
                    Err(StorageError::from_sdk(e))
                }
            }
        }
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(StorageError::from_sdk)?;
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
        original_name: &str,
    ) -> Result<String, StorageError> {
        let res = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .metadata("originalname", original_name)
            .send()
            .await
            .map_err(StorageError::from_sdk)?;

        res.upload_id
            .ok_or_else(|| StorageError::Request("No upload ID in response".to_string()))
    }

    async fn presign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning_config = PresigningConfig::expires_in(expires_in).map_err(|e| {
            StorageError::Request(format!("Failed to create presigning config: {}", e))
        })?;

        let presigned = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .presigned(presigning_config)
            .await
            .map_err(StorageError::from_sdk)?;

        Ok(presigned.uri().to_string())
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), StorageError> {
        let completed_parts = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(&p.e_tag)
                    .build()
            })
            .collect();

        let completed_multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_multipart_upload)
            .send()
            .await
            .map_err(StorageError::from_sdk)?;
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
    ) -> Result<(), StorageError> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(StorageError::from_sdk)?;
        Ok(())
    }
}
