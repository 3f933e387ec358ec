pub mod flash;
pub mod pages;

use axum::{
    extract::{FromRef, State},
    response::Html,
    routing::get,
    Router,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::{extractors::current_session, jwt::SessionKeys};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/health", get(|| async { "ok" }))
}

fn signed_in(state: &AppState, jar: &CookieJar) -> bool {
    current_session(&SessionKeys::from_ref(state), jar).is_some()
}

pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Html<String> {
    pages::index(signed_in(&state, &jar))
}

pub async fn about(State(state): State<AppState>, jar: CookieJar) -> Html<String> {
    pages::about(signed_in(&state, &jar))
}
