use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-west-004";

/// Message returned by every storage-backed endpoint while the bucket
/// credentials are absent.
pub const NOT_CONFIGURED_MESSAGE: &str = "Backblaze B2 storage is not configured on the server. Please set B2_BUCKET_NAME, B2_REGION, B2_KEY_ID and B2_APPLICATION_KEY.";

/// Connection settings for the S3-compatible bucket (Backblaze B2).
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub key_id: String,
    pub application_key: String,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
    pub force_path_style: bool,
}

impl StorageConfig {
    /// Load storage settings from the environment.
    ///
    /// Returns `None` when the bucket name, key id or application key is
    /// missing or empty; region and endpoint have defaults.
    pub fn from_env() -> Option<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bucket = non_empty("B2_BUCKET_NAME")?;
        let key_id = non_empty("B2_KEY_ID")?;
        let application_key = non_empty("B2_APPLICATION_KEY")?;

        let region = non_empty("B2_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
        let endpoint = non_empty("B2_ENDPOINT")
            .unwrap_or_else(|| format!("https://s3.{}.backblazeb2.com", region));

        let force_path_style = lookup("B2_FORCE_PATH_STYLE")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Some(Self {
            bucket,
            region,
            endpoint,
            key_id,
            application_key,
            force_path_style,
        })
    }
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (default: 127.0.0.1:3000)
    pub bind_addr: SocketAddr,

    /// Body limit for the direct upload endpoint in bytes (default: 100 MB)
    pub max_upload_size: usize,

    /// Lifetime of presigned multipart part URLs (default: 1 hour)
    pub part_url_expiry: Duration,

    /// Key prefix enumerated by the gallery listing (default: "images/")
    pub list_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_upload_size: 100 * 1024 * 1024, // 100 MB
            part_url_expiry: Duration::from_secs(3600),
            list_prefix: crate::models::MEDIA_PREFIX.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        Self {
            bind_addr: lookup("BIND_ADDR")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.bind_addr),

            max_upload_size: lookup("MAX_UPLOAD_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            part_url_expiry: lookup("PART_URL_EXPIRY_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(default.part_url_expiry),

            list_prefix: default.list_prefix,
        }
    }
}
