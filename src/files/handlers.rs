use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, instrument, warn};

use super::dto::{PreviewQuery, PreviewResponse};
use super::repo_types::ArtifactKind;
use super::services::{self, UploadItem};
use super::gate;
use crate::{
    auth::Session,
    dashboard::dto::Tab,
    error::AppResult,
    state::AppState,
    web::flash::{self, Level},
};

// --- routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/preview", get(preview))
        .route("/download/:name", get(download))
        .route("/visualizations/:name", get(visualization))
}

pub fn write_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

// --- handlers ---

/// POST /upload (multipart, repeated `files` parts)
#[instrument(skip(state, session, jar, mp), fields(user_id = session.user_id))]
pub async fn upload(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    mut mp: Multipart,
) -> Response {
    let back = Redirect::to(&Tab::Upload.location());
    let mut items = Vec::new();
    let mut saw_files = false;

    loop {
        let field = match mp.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "multipart read failed");
                return (
                    flash::push(jar, Level::Error, "Upload failed. The request could not be read."),
                    back,
                )
                    .into_response();
            }
        };
        if !matches!(field.name(), Some("files") | Some("files[]")) {
            continue;
        }
        saw_files = true;
        let original_name = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(body) => items.push(UploadItem {
                original_name,
                body,
            }),
            Err(e) => {
                warn!(error = %e, file = %original_name, "multipart body failed");
                return (
                    flash::push(jar, Level::Error, "Upload failed. The request could not be read."),
                    back,
                )
                    .into_response();
            }
        }
    }

    if !saw_files {
        return (flash::push(jar, Level::Error, "No file part found."), back).into_response();
    }

    let mut jar = jar;
    match services::ingest(&state, session.user_id, items).await {
        Ok(outcome) => {
            if outcome.saved > 0 {
                jar = flash::push(
                    jar,
                    Level::Success,
                    format!("Uploaded {} file(s).", outcome.saved),
                );
            }
            if outcome.rejected > 0 {
                jar = flash::push(
                    jar,
                    Level::Error,
                    format!(
                        "Rejected {} file(s). Only CSV/XLSX/XLS allowed.",
                        outcome.rejected
                    ),
                );
            }
        }
        Err(e) => {
            error!(error = %e, "upload failed");
            jar = flash::push(jar, Level::Error, e.public_message());
        }
    }
    (jar, back).into_response()
}

/// GET /preview?file=<stored name>
#[instrument(skip(state, session), fields(user_id = session.user_id))]
pub async fn preview(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(q): Query<PreviewQuery>,
) -> AppResult<Json<PreviewResponse>> {
    let file = q.file.unwrap_or_default();
    Ok(Json(services::preview(&state, session.user_id, &file).await?))
}

/// GET /download/:name — a cleaned CSV as an attachment.
#[instrument(skip(state, session), fields(user_id = session.user_id))]
pub async fn download(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> AppResult<Response> {
    let area = gate::authorize_artifact(&state, session.user_id, ArtifactKind::Cleaned, &name).await?;
    let body = state
        .storage
        .get_object(area, &name)
        .await
        .with_context(|| format!("read {}", name))?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        body,
    )
        .into_response())
}

/// GET /visualizations/:name — a rendered chart.
#[instrument(skip(state, session), fields(user_id = session.user_id))]
pub async fn visualization(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(name): Path<String>,
) -> AppResult<Response> {
    let area =
        gate::authorize_artifact(&state, session.user_id, ArtifactKind::Visualization, &name).await?;
    let body = state
        .storage
        .get_object(area, &name)
        .await
        .with_context(|| format!("read {}", name))?;
    Ok(([(header::CONTENT_TYPE, "image/png")], body).into_response())
}
