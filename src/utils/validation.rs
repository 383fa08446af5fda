use crate::models::{MEDIA_PREFIX, MediaKind};

/// Used when a file name sanitizes to nothing.
pub const FALLBACK_FILE_NAME: &str = "image-upload";

/// Highest part number the multipart protocol accepts.
pub const MAX_PART_NUMBER: i64 = 10_000;

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        sanitized
    }
}

/// Build the storage key for a new upload:
/// `images/{kind}-{timestamp_ms}-{sanitized name}`.
pub fn generate_key(kind: MediaKind, timestamp_ms: i64, original_name: &str) -> String {
    format!(
        "{}{}-{}-{}",
        MEDIA_PREFIX,
        kind,
        timestamp_ms,
        sanitize_file_name(original_name)
    )
}

/// Treat empty strings like missing fields.
pub fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub fn validate_part_number(part_number: i64) -> bool {
    (1..=MAX_PART_NUMBER).contains(&part_number)
}
