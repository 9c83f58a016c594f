use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::HistoryEntry;
use crate::images::services::with_fresh_image_url;
use crate::state::AppState;

pub fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/history", get(list_history).delete(clear_history))
        .route("/history/:id", get(get_history_entry))
}

#[instrument(skip(state))]
pub async fn list_history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    let mut entries = Vec::new();
    for entry in state.history.list().await {
        entries.push(with_fresh_image_url(&state, entry).await);
    }
    Json(entries)
}

#[instrument(skip(state))]
pub async fn get_history_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryEntry>, (StatusCode, String)> {
    let entry = state
        .history
        .get(id)
        .await
        .ok_or((StatusCode::NOT_FOUND, "History entry not found".to_string()))?;
    Ok(Json(with_fresh_image_url(&state, entry).await))
}

#[instrument(skip(state))]
pub async fn clear_history(State(state): State<AppState>) -> StatusCode {
    state.history.clear().await;
    info!("history cleared");
    StatusCode::NO_CONTENT
}
