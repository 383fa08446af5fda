use crate::config::StorageConfig;
use crate::services::storage::{S3StorageService, StorageService};
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the object store client, or `None` when credentials are missing.
///
/// The server keeps running without storage; every storage-backed endpoint
/// then answers with a configuration error.
pub async fn setup_storage(config: Option<&StorageConfig>) -> Option<Arc<dyn StorageService>> {
    let Some(config) = config else {
        warn!(
            "⚠️  Backblaze B2 is not fully configured. Set B2_BUCKET_NAME, B2_REGION, B2_KEY_ID and B2_APPLICATION_KEY in your environment."
        );
        return None;
    };

    info!(
        "☁️  B2 Storage: {} (Bucket: {}, Region: {})",
        config.endpoint, config.bucket, config.region
    );

    let aws_config = aws_config::from_env()
        .endpoint_url(&config.endpoint)
        .region(Region::new(config.region.clone()))
        .credentials_provider(Credentials::new(
            config.key_id.clone(),
            config.application_key.clone(),
            None,
            None,
            "static",
        ))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(config.force_path_style)
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    Some(Arc::new(S3StorageService::new(
        s3_client,
        config.bucket.clone(),
    )))
}
