use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use axum_extra::extract::{cookie::CookieJar, Form as MultiForm};
use tracing::{info, instrument};

use super::dto::{CleanForm, DashboardQuery, SummaryForm, Tab, VisualizeForm};
use super::services;
use crate::{
    auth::Session,
    error::{AppError, AppResult},
    files::naming,
    state::AppState,
    table::clean::CleanOptions,
    web::{
        flash::{self, Level},
        pages,
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/clean", post(clean))
        .route("/summary", post(summary))
        .route("/visualize", post(visualize))
}

/// Per-file notes after a clean batch; the rest are folded into one line so
/// the flash cookie stays well under browser limits.
const MAX_SKIP_NOTES: usize = 5;
const MAX_NOTE_NAME: usize = 60;

/// Flash text for a failed form action.
fn form_message(e: &AppError) -> String {
    match e {
        AppError::NotFound => "Selected file not found.".into(),
        AppError::Unauthorized => "Unauthorized file.".into(),
        e if e.is_visualization_failure() => format!("Visualization failed: {}", e),
        e => e.public_message(),
    }
}

fn back_to(jar: CookieJar, tab: Tab, message: impl Into<String>) -> Response {
    (
        flash::push(jar, Level::Error, message),
        Redirect::to(&tab.location()),
    )
        .into_response()
}

#[instrument(skip(state, session, jar), fields(user_id = session.user_id))]
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    Query(q): Query<DashboardQuery>,
) -> AppResult<Response> {
    let tab = Tab::parse(q.tab.as_deref());
    let view = services::load_view(&state, &session, tab).await?;
    let (jar, flashes) = flash::take(jar);
    Ok((jar, pages::dashboard(&view, &flashes)).into_response())
}

#[instrument(skip(state, session, jar, form), fields(user_id = session.user_id))]
pub async fn clean(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    MultiForm(form): MultiForm<CleanForm>,
) -> Response {
    if form.selected_files.iter().all(|f| f.trim().is_empty()) {
        return back_to(jar, Tab::Clean, "Please select at least one file to clean.");
    }
    let opts = CleanOptions {
        drop_duplicates: form.opt_duplicates.is_some(),
        fill_missing: form.opt_missing.is_some(),
        sort_by: form
            .opt_sort
            .is_some()
            .then(|| form.sort_col.clone())
            .flatten(),
    };

    let report = services::clean_batch(&state, session.user_id, &form.selected_files, &opts).await;
    info!(
        cleaned = report.written.len(),
        skipped = report.skipped.len(),
        "clean batch finished"
    );

    let mut jar = if report.written.is_empty() {
        flash::push(jar, Level::Error, "No files cleaned. Check selected files.")
    } else {
        flash::push(
            jar,
            Level::Success,
            format!("Cleaned {} file(s).", report.written.len()),
        )
    };
    for note in skip_notes(&report.skipped) {
        jar = flash::push(jar, Level::Error, note);
    }
    (jar, Redirect::to(&Tab::Clean.location())).into_response()
}

fn skip_notes(skipped: &[(String, AppError)]) -> Vec<String> {
    let mut notes: Vec<String> = skipped
        .iter()
        .take(MAX_SKIP_NOTES)
        .map(|(stored, e)| {
            let name = naming::display_name(stored);
            let name = match name.char_indices().nth(MAX_NOTE_NAME) {
                Some((cut, _)) => format!("{}...", &name[..cut]),
                None => name.to_string(),
            };
            format!("{}: {}", name, form_message(e))
        })
        .collect();
    if skipped.len() > MAX_SKIP_NOTES {
        notes.push(format!(
            "...and {} more file(s) skipped.",
            skipped.len() - MAX_SKIP_NOTES
        ));
    }
    notes
}

#[instrument(skip(state, session, jar, form), fields(user_id = session.user_id))]
pub async fn summary(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    Form(form): Form<SummaryForm>,
) -> Response {
    let result = match services::summarize_file(&state, session.user_id, &form.summary_file).await {
        Ok(summary) => services::load_view(&state, &session, Tab::Summary)
            .await
            .map(|view| (view, summary)),
        Err(e) => Err(e),
    };
    match result {
        Ok((mut view, summary)) => {
            view.summary = Some(summary);
            let (jar, flashes) = flash::take(jar);
            (jar, pages::dashboard(&view, &flashes)).into_response()
        }
        Err(e @ (AppError::Parse(_) | AppError::UnsupportedFormat(_))) => {
            tracing::warn!(error = %e, "summary load failed");
            back_to(jar, Tab::Summary, "Unable to read the selected file.")
        }
        Err(e) => back_to(jar, Tab::Summary, form_message(&e)),
    }
}

#[instrument(skip(state, session, jar, form), fields(user_id = session.user_id, chart = ?form.chart_type))]
pub async fn visualize(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    jar: CookieJar,
    Form(form): Form<VisualizeForm>,
) -> Response {
    let rendered = services::visualize_file(
        &state,
        session.user_id,
        &form.viz_file,
        form.chart_type.as_deref(),
    )
    .await;
    let result = match rendered {
        Ok(url) => services::load_view(&state, &session, Tab::Viz)
            .await
            .map(|view| (view, url)),
        Err(e) => Err(e),
    };
    match result {
        Ok((mut view, url)) => {
            view.chart_url = Some(url);
            let (jar, flashes) = flash::take(jar);
            (jar, pages::dashboard(&view, &flashes)).into_response()
        }
        Err(e) => back_to(jar, Tab::Viz, form_message(&e)),
    }
}
