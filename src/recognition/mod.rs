pub mod dto;
pub mod handlers;
pub mod mapper;
pub mod mock;
pub mod provider;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::scan_routes()
}
