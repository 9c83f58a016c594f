use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::ScanImage;
use crate::history::dto::HistoryEntry;
use crate::images::services::{store_scan_image, with_fresh_image_url};
use crate::state::AppState;

const FILE_FIELDS: [&str; 3] = ["image", "media", "file"];

pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route("/scans", post(create_scan))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// POST /scans (multipart, field `image`)
#[instrument(skip(state, mp))]
pub async fn create_scan(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<HistoryEntry>), (StatusCode, String)> {
    let mut image: Option<ScanImage> = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if !field.name().is_some_and(|n| FILE_FIELDS.contains(&n)) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        if !body.is_empty() {
            image = Some(ScanImage {
                body,
                file_name,
                content_type,
            });
            break;
        }
    }

    let Some(image) = image else {
        warn!("scan request without an image");
        return Err((StatusCode::BAD_REQUEST, "image file is required".into()));
    };

    let result = state.recognizer.recognize(&image).await;
    let image_url = store_scan_image(&state, &image).await;
    let entry = state.history.record(image_url, result).await;
    info!(id = %entry.id, food = %entry.result.name, "scan recorded");

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/history/{}", entry.id).parse() {
        headers.insert(header::LOCATION, location);
    }

    let entry = with_fresh_image_url(&state, entry).await;
    Ok((StatusCode::CREATED, headers, Json(entry)))
}
