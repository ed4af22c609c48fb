use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod services;

pub use extractors::TOKEN_HEADER;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
