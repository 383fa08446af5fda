use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Every gallery object lives under this prefix.
pub const MEDIA_PREFIX: &str = "images/";

/// Media types for the file extensions the gallery recognises.
const EXTENSION_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("bmp", "image/bmp"),
    ("avif", "image/avif"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("ico", "image/x-icon"),
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
    ("ogv", "video/ogg"),
    ("mpeg", "video/mpeg"),
    ("mpg", "video/mpeg"),
    ("3gp", "video/3gpp"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
];

/// Media type implied by a file name's extension, if it is a known image or
/// video extension. Only the extension is consulted.
pub fn content_type_from_extension(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    EXTENSION_TYPES
        .iter()
        .find(|(known, _)| ext.eq_ignore_ascii_case(known))
        .map(|(_, content_type)| *content_type)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Classify a declared media type. Anything other than `image/*` or
    /// `video/*` is not gallery media.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        if content_type.starts_with("video/") {
            Some(MediaKind::Video)
        } else if content_type.starts_with("image/") {
            Some(MediaKind::Image)
        } else {
            None
        }
    }

    /// Infer the kind of a stored object from its key alone.
    ///
    /// Keys written by this service carry an `image-` or `video-` tag at the
    /// start of the file name. Foreign keys fall back to the extension, and
    /// anything unrecognised is shown as an image.
    pub fn from_key(key: &str) -> Self {
        let file_name = key.rsplit('/').next().unwrap_or(key);

        if file_name.starts_with("video-") {
            return MediaKind::Video;
        }
        if file_name.starts_with("image-") {
            return MediaKind::Image;
        }

        match content_type_from_extension(file_name).and_then(Self::from_content_type) {
            Some(MediaKind::Video) => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One object as reported by the store's list call.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub kind: MediaKind,
}

impl From<ObjectSummary> for MediaItem {
    fn from(object: ObjectSummary) -> Self {
        Self {
            kind: MediaKind::from_key(&object.key),
            size: object.size.max(0) as u64,
            last_modified: object.last_modified,
            key: object.key,
        }
    }
}

/// Order items newest first.
///
/// Only items carrying a timestamp are reordered, among the slots they
/// already occupy; undated items keep their listing position. Equal
/// timestamps keep their relative order.
pub fn sort_newest_first(items: &mut [MediaItem]) {
    let slots: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.last_modified.is_some())
        .map(|(i, _)| i)
        .collect();

    let mut dated: Vec<MediaItem> = slots.iter().map(|&i| items[i].clone()).collect();
    dated.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

    for (slot, item) in slots.into_iter().zip(dated) {
        items[slot] = item;
    }
}

/// A finished part of a multipart upload, in the casing the store's
/// completion call uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadedPart {
    #[serde(rename = "PartNumber")]
    pub part_number: i32,
    #[serde(rename = "ETag")]
    pub e_tag: String,
}

/// Client-side record of one multipart upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartSession {
    pub key: String,
    pub upload_id: String,
    pub parts: Vec<UploadedPart>,
}
