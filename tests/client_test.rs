mod common;

use b2_media_gallery::client::{ClientError, GalleryClient, MultipartOrchestrator};
use common::{MockPartUploader, MockStorageService, app_with};
use std::sync::Arc;

/// Serve the router on an ephemeral port and point a client at it.
async fn spawn_server(storage: Arc<MockStorageService>) -> GalleryClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app_with(storage);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    GalleryClient::new(&format!("http://{}", addr)).unwrap()
}

#[tokio::test]
async fn test_download_all_writes_every_listed_object() {
    let storage = MockStorageService::new();
    storage.insert("images/image-1-old.png", b"old pixels", "image/png", Some(100));
    storage.insert("images/video-2-my clip.mp4", &[7u8; 4096], "video/mp4", Some(200));
    let client = spawn_server(storage).await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("gallery");
    let saved = client.download_all(&target).await.unwrap();

    assert_eq!(
        saved,
        vec![
            target.join("video-2-my clip.mp4"),
            target.join("image-1-old.png"),
        ]
    );
    assert_eq!(std::fs::read(&saved[0]).unwrap(), vec![7u8; 4096]);
    assert_eq!(std::fs::read(&saved[1]).unwrap(), b"old pixels");
}

#[tokio::test]
async fn test_download_all_on_empty_gallery() {
    let client = spawn_server(MockStorageService::new()).await;
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("never-created");

    assert!(client.download_all(&target).await.unwrap().is_empty());
    assert!(!target.exists());
}

#[tokio::test]
async fn test_download_to_streams_and_reports_type() {
    let storage = MockStorageService::new();
    storage.insert("images/image-1-a#b.jpg", b"jpeg bytes", "image/jpeg", None);
    let client = spawn_server(storage).await;

    let mut sink = Vec::new();
    let summary = client
        .download_to("images/image-1-a#b.jpg", &mut sink)
        .await
        .unwrap();

    assert_eq!(summary.bytes, 10);
    assert_eq!(summary.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(sink, b"jpeg bytes");
}

#[tokio::test]
async fn test_missing_object_surfaces_server_message() {
    let client = spawn_server(MockStorageService::new()).await;

    let mut sink = Vec::new();
    let err = client
        .download_to("images/gone.png", &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "File not found");
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_direct_upload_list_and_delete() {
    let storage = MockStorageService::new();
    let client = spawn_server(storage.clone()).await;

    let keys = client
        .upload_direct(vec![(
            "cat.png".to_string(),
            "image/png".to_string(),
            b"meow".to_vec(),
        )])
        .await
        .unwrap();
    assert_eq!(keys.len(), 1);

    let images = client.list_images().await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].key, keys[0]);
    assert_eq!(images[0].size, 4);

    client.delete_image(&keys[0]).await.unwrap();
    assert!(client.list_images().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_multipart_through_http_client() {
    let storage = MockStorageService::new();
    let client = spawn_server(storage.clone()).await;
    let uploader = MockPartUploader {
        storage: storage.clone(),
        fail_part: None,
    };
    let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();

    let session = MultipartOrchestrator::new(&client, &uploader)
        .with_part_size(300)
        .upload("long clip.mp4", "video/mp4", data.as_slice())
        .await
        .unwrap();

    assert_eq!(session.parts.len(), 4);
    let downloaded = client.download_image(&session.key).await.unwrap();
    assert_eq!(downloaded.content_type.as_deref(), Some("video/mp4"));
    assert_eq!(downloaded.data.to_vec(), data);
}
