use crate::state::AppState;
use axum::Router;

mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod oauth;
mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use extractors::{require_session, Session};

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
