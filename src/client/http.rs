use super::ClientError;
use super::multipart::{MultipartApi, PartUploadResponse, PartUploader, StartedUpload};
use crate::models::{MediaItem, UploadedPart};
use crate::utils::encoding::encode_key;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, ETAG};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::info;
use url::Url;

/// A downloaded object with the media type the server reported.
#[derive(Debug, Clone)]
pub struct DownloadedImage {
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// What [`GalleryClient::download_to`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    pub content_type: Option<String>,
    pub bytes: u64,
}

/// Local file name for a downloaded key: its last path segment, or `image`
/// when that segment is empty or would escape the target directory.
pub fn local_file_name(key: &str) -> &str {
    match key.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => name,
        _ => "image",
    }
}

fn api_error(status: u16, body: &[u8]) -> ClientError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(Value::as_str)
        .unwrap_or("Request failed.")
        .to_string();
    ClientError::Api { status, message }
}

#[derive(Clone)]
pub struct GalleryClient {
    http: reqwest::Client,
    base_url: Url,
}

impl GalleryClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, ClientError> {
        // `Url::join` drops the last path segment unless it ends with '/'.
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            http,
            base_url: Url::parse(&base)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    fn image_url(&self, key: &str) -> Result<Url, ClientError> {
        self.endpoint(&format!("image/{}", encode_key(key)))
    }

    /// Turn a response into `T`, surfacing the server's `error` field on failure.
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ClientError::EmptyResponse);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// Send a GET for one object, failing on a non-2xx answer.
    async fn fetch_image(&self, key: &str) -> Result<reqwest::Response, ClientError> {
        let response = self.http.get(self.image_url(key)?).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await?;
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(response)
    }

    fn content_type(response: &reqwest::Response) -> Option<String> {
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    async fn post_json<T, P>(&self, path: &str, payload: &P) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let response = self
            .http
            .post(self.endpoint(path)?)
            .json(payload)
            .send()
            .await?;
        Self::read_json(response).await
    }

    pub async fn list_images(&self) -> Result<Vec<MediaItem>, ClientError> {
        #[derive(serde::Deserialize)]
        struct ListImages {
            #[serde(default)]
            images: Vec<MediaItem>,
        }

        let response = self.http.get(self.endpoint("images")?).send().await?;
        let list: ListImages = Self::read_json(response).await?;
        Ok(list.images)
    }

    /// Fetch a whole object into memory. Prefer [`Self::download_to`] for
    /// large videos.
    pub async fn download_image(&self, key: &str) -> Result<DownloadedImage, ClientError> {
        let response = self.fetch_image(key).await?;
        let content_type = Self::content_type(&response);
        let data = response.bytes().await?;

        Ok(DownloadedImage { content_type, data })
    }

    /// Stream one object into `writer` chunk by chunk.
    pub async fn download_to<W>(&self, key: &str, writer: &mut W) -> Result<DownloadSummary, ClientError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut response = self.fetch_image(key).await?;
        let content_type = Self::content_type(&response);

        let mut bytes = 0u64;
        while let Some(chunk) = response.chunk().await? {
            writer.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        writer.flush().await?;

        Ok(DownloadSummary {
            content_type,
            bytes,
        })
    }

    /// Download every listed object into `dir`, one at a time, stopping at
    /// the first failure. Returns the written paths in listing order.
    pub async fn download_all(&self, dir: &Path) -> Result<Vec<PathBuf>, ClientError> {
        let images = self.list_images().await?;
        if images.is_empty() {
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(dir).await?;

        let mut saved = Vec::with_capacity(images.len());
        for image in images {
            let path = dir.join(local_file_name(&image.key));
            let mut file = tokio::fs::File::create(&path).await?;
            let summary = self.download_to(&image.key, &mut file).await?;
            info!(key = %image.key, bytes = summary.bytes, path = %path.display(), "Downloaded");
            saved.push(path);
        }

        Ok(saved)
    }

    pub async fn delete_image(&self, key: &str) -> Result<(), ClientError> {
        let response = self.http.delete(self.image_url(key)?).send().await?;
        let _: Value = Self::read_json(response).await?;
        Ok(())
    }

    /// Send small files in one request through the direct upload endpoint.
    /// Each entry is `(file name, content type, bytes)`.
    pub async fn upload_direct(
        &self,
        files: Vec<(String, String, Vec<u8>)>,
    ) -> Result<Vec<String>, ClientError> {
        #[derive(serde::Deserialize)]
        struct Uploaded {
            keys: Vec<String>,
        }

        let mut form = Form::new();
        for (file_name, content_type, data) in files {
            let part = Part::bytes(data)
                .file_name(file_name)
                .mime_str(&content_type)?;
            form = form.part("file", part);
        }

        let response = self
            .http
            .post(self.endpoint("upload")?)
            .multipart(form)
            .send()
            .await?;
        let uploaded: Uploaded = Self::read_json(response).await?;
        Ok(uploaded.keys)
    }
}

#[async_trait]
impl MultipartApi for GalleryClient {
    async fn start(
        &self,
        file_name: &str,
        content_type: &str,
    ) -> Result<StartedUpload, ClientError> {
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Started {
            upload_id: String,
            key: String,
        }

        let started: Started = self
            .post_json(
                "upload/start",
                &json!({ "fileName": file_name, "contentType": content_type }),
            )
            .await?;
        Ok(StartedUpload {
            upload_id: started.upload_id,
            key: started.key,
        })
    }

    async fn part_url(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
    ) -> Result<String, ClientError> {
        #[derive(serde::Deserialize)]
        struct PartUrl {
            url: String,
        }

        let part: PartUrl = self
            .post_json(
                "upload/url",
                &json!({ "key": key, "uploadId": upload_id, "partNumber": part_number }),
            )
            .await?;
        Ok(part.url)
    }

    async fn complete(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<(), ClientError> {
        let _: Value = self
            .post_json(
                "upload/complete",
                &json!({ "key": key, "uploadId": upload_id, "parts": parts }),
            )
            .await?;
        Ok(())
    }

    async fn abort(&self, key: &str, upload_id: &str) -> Result<(), ClientError> {
        let _: Value = self
            .post_json(
                "upload/abort",
                &json!({ "key": key, "uploadId": upload_id }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PartUploader for GalleryClient {
    async fn put_part(
        &self,
        url: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<PartUploadResponse, ClientError> {
        let response = self
            .http
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(PartUploadResponse {
            status: response.status().as_u16(),
            etag,
        })
    }
}
