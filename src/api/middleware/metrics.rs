use axum::{
    extract::Request,
    http::{Method, header},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::info;

/// Coarse route label, so object keys never end up as metric dimensions.
pub fn route_group(method: &Method, path: &str) -> &'static str {
    match path {
        "/images" => "list",
        "/upload" => "upload_direct",
        "/upload/start" | "/upload/url" | "/upload/complete" | "/upload/abort" => {
            "upload_multipart"
        }
        "/health" => "health",
        p if p.starts_with("/image/") => {
            if method == Method::DELETE {
                "object_delete"
            } else {
                "object_get"
            }
        }
        p if p.starts_with("/swagger-ui") || p.starts_with("/api-docs") => "docs",
        _ => "other",
    }
}

/// Emit one `request_completed` event per request, tagged with its route
/// group and, for object routes, the key's top-level prefix.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let route = route_group(&method, req.uri().path());
    let key_prefix = req
        .uri()
        .path()
        .strip_prefix("/image/")
        .and_then(|key| key.split_once('/'))
        .map(|(prefix, _)| prefix.to_string())
        .unwrap_or_default();
    let request_bytes = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let response = next.run(req).await;

    info!(
        target: "metrics",
        method = %method,
        route,
        key_prefix = %key_prefix,
        request_bytes,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request_completed"
    );

    response
}
