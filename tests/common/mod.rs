#![allow(dead_code)]

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use b2_media_gallery::client::{
    ClientError, MultipartApi, PartUploadResponse, PartUploader, StartedUpload,
};
use b2_media_gallery::config::ServerConfig;
use b2_media_gallery::models::{ObjectSummary, UploadedPart};
use b2_media_gallery::services::storage::{StorageError, StorageService, StoredObject};
use b2_media_gallery::{AppState, create_app};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const BOUNDARY: &str = "gallery-test-boundary";

#[derive(Clone)]
pub struct MockObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
}

struct MockUpload {
    key: String,
    content_type: String,
    parts: BTreeMap<i32, (String, Vec<u8>)>,
}

/// In-memory stand-in for the bucket, including multipart sessions.
#[derive(Default)]
pub struct MockStorageService {
    objects: Mutex<HashMap<String, MockObject>>,
    uploads: Mutex<HashMap<String, MockUpload>>,
    aborted: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    failing_calls: Mutex<HashMap<&'static str, usize>>,
    call_counts: Mutex<HashMap<&'static str, usize>>,
    next_upload: AtomicUsize,
}

impl MockStorageService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, key: &str, data: &[u8], content_type: &str, last_modified: Option<i64>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            MockObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
                last_modified: last_modified.and_then(|s| DateTime::from_timestamp(s, 0)),
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<MockObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn aborted(&self) -> Vec<String> {
        self.aborted.lock().unwrap().clone()
    }

    pub fn open_uploads(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    /// Names of every storage operation invoked so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Make one operation fail with a structured service error.
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    /// Make only the `nth` call (1-based) of one operation fail.
    pub fn fail_call(&self, operation: &'static str, nth: usize) {
        self.failing_calls.lock().unwrap().insert(operation, nth);
    }

    /// Stand-in for the store receiving a presigned part PUT.
    pub fn receive_part(&self, upload_id: &str, part_number: i32, data: &[u8]) -> Option<String> {
        let mut uploads = self.uploads.lock().unwrap();
        let upload = uploads.get_mut(upload_id)?;
        let etag = format!("\"etag-{}-{}\"", upload_id, part_number);
        upload
            .parts
            .insert(part_number, (etag.replace('"', ""), data.to_vec()));
        Some(etag)
    }

    fn record(&self, operation: &'static str) -> Result<(), StorageError> {
        self.calls.lock().unwrap().push(operation.to_string());

        let count = {
            let mut counts = self.call_counts.lock().unwrap();
            let count = counts.entry(operation).or_insert(0);
            *count += 1;
            *count
        };
        let nth_fails = self.failing_calls.lock().unwrap().get(operation) == Some(&count);

        if nth_fails || self.failing.lock().unwrap().contains(operation) {
            return Err(StorageError::Service {
                message: format!("{} rejected by mock store", operation),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.record("put_object")?;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            MockObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
                last_modified: Some(Utc::now()),
            },
        );
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        self.record("list_objects")?;
        let objects = self.objects.lock().unwrap();
        let mut keys: Vec<&String> = objects.keys().filter(|k| k.starts_with(prefix)).collect();
        keys.sort();
        Ok(keys
            .into_iter()
            .map(|k| ObjectSummary {
                key: k.clone(),
                size: objects[k].data.len() as i64,
                last_modified: objects[k].last_modified,
            })
            .collect())
    }

    async fn get_object(&self, key: &str) -> Result<StoredObject, StorageError> {
        self.record("get_object")?;
        let object = self.object(key).ok_or(StorageError::NotFound)?;
        Ok(StoredObject {
            content_length: Some(object.data.len() as i64),
            content_type: Some(object.content_type),
            body: ByteStream::from(object.data),
        })
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.record("delete_object")?;
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
        _original_name: &str,
    ) -> Result<String, StorageError> {
        self.record("create_multipart_upload")?;
        let upload_id = format!("upload-{}", self.next_upload.fetch_add(1, Ordering::SeqCst) + 1);
        self.uploads.lock().unwrap().insert(
            upload_id.clone(),
            MockUpload {
                key: key.to_string(),
                content_type: content_type.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn presign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        self.record("presign_upload_part")?;
        Ok(format!(
            "mock://parts/{}/{}?key={}&expires={}",
            upload_id,
            part_number,
            key,
            expires_in.as_secs()
        ))
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), StorageError> {
        self.record("complete_multipart_upload")?;

        if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
            return Err(StorageError::Service {
                message: "The list of parts was not in ascending order.".to_string(),
            });
        }

        let mut uploads = self.uploads.lock().unwrap();
        let upload = uploads
            .get(upload_id)
            .filter(|u| u.key == key)
            .ok_or_else(|| StorageError::Service {
                message: "The specified upload does not exist.".to_string(),
            })?;

        let mut data = Vec::new();
        for part in parts {
            match upload.parts.get(&part.part_number) {
                Some((etag, bytes)) if *etag == part.e_tag => data.extend_from_slice(bytes),
                _ => {
                    return Err(StorageError::Service {
                        message: format!("Invalid part {}", part.part_number),
                    });
                }
            }
        }

        let content_type = upload.content_type.clone();
        uploads.remove(upload_id);
        drop(uploads);

        self.objects.lock().unwrap().insert(
            key.to_string(),
            MockObject {
                data,
                content_type,
                last_modified: Some(Utc::now()),
            },
        );
        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        _key: &str,
        upload_id: &str,
    ) -> Result<(), StorageError> {
        self.record("abort_multipart_upload")?;
        self.uploads.lock().unwrap().remove(upload_id);
        self.aborted.lock().unwrap().push(upload_id.to_string());
        Ok(())
    }
}

pub fn app_with(storage: Arc<MockStorageService>) -> Router {
    let storage: Arc<dyn StorageService> = storage;
    create_app(AppState::new(Some(storage), ServerConfig::default()))
}

pub fn unconfigured_app() -> Router {
    create_app(AppState::new(None, ServerConfig::default()))
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

/// Build a `multipart/form-data` request with one `file` part per entry of
/// `(file name, content type, bytes)`.
pub fn upload_request(files: &[(&str, &str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, content_type, data) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Drives the session endpoints through the router in-process.
pub struct RouterApi {
    pub app: Router,
}

impl RouterApi {
    async fn call(&self, uri: &str, payload: Value) -> Result<Value, ClientError> {
        let response = send(&self.app, post_json(uri, payload)).await;
        let status = response.status();
        let body = body_json(response).await;
        if status != StatusCode::OK {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: body["error"].as_str().unwrap_or("Request failed.").to_string(),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl MultipartApi for RouterApi {
    async fn start(
        &self,
        file_name: &str,
        content_type: &str,
    ) -> Result<StartedUpload, ClientError> {
        let body = self
            .call(
                "/upload/start",
                json!({ "fileName": file_name, "contentType": content_type }),
            )
            .await?;
        Ok(StartedUpload {
            upload_id: body["uploadId"].as_str().unwrap().to_string(),
            key: body["key"].as_str().unwrap().to_string(),
        })
    }

    async fn part_url(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
    ) -> Result<String, ClientError> {
        let body = self
            .call(
                "/upload/url",
                json!({ "key": key, "uploadId": upload_id, "partNumber": part_number }),
            )
            .await?;
        Ok(body["url"].as_str().unwrap().to_string())
    }

    async fn complete(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), ClientError> {
        self.call(
            "/upload/complete",
            json!({ "key": key, "uploadId": upload_id, "parts": parts }),
        )
        .await?;
        Ok(())
    }

    async fn abort(&self, key: &str, upload_id: &str) -> Result<(), ClientError> {
        self.call("/upload/abort", json!({ "key": key, "uploadId": upload_id }))
            .await?;
        Ok(())
    }
}

/// Plays the store's side of a presigned PUT against the mock.
pub struct MockPartUploader {
    pub storage: Arc<MockStorageService>,
    /// Answer this part number with the given HTTP status instead of storing it.
    pub fail_part: Option<(i32, u16)>,
}

#[async_trait]
impl PartUploader for MockPartUploader {
    async fn put_part(
        &self,
        url: &str,
        body: Bytes,
        _content_type: &str,
    ) -> Result<PartUploadResponse, ClientError> {
        let path = url
            .strip_prefix("mock://parts/")
            .and_then(|rest| rest.split('?').next())
            .unwrap();
        let (upload_id, part) = path.split_once('/').unwrap();
        let part_number: i32 = part.parse().unwrap();

        if let Some((failing, status)) = self.fail_part {
            if failing == part_number {
                return Ok(PartUploadResponse { status, etag: None });
            }
        }

        let etag = self.storage.receive_part(upload_id, part_number, &body);
        Ok(PartUploadResponse {
            status: if etag.is_some() { 200 } else { 404 },
            etag,
        })
    }
}
