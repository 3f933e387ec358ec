use anyhow::Context;
use bytes::Bytes;
use tracing::{debug, info};

use super::dto::PreviewResponse;
use super::{gate, naming, repo};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::Area;
use crate::table::{loader, Table, Value};

pub const PREVIEW_ROWS: usize = 25;

pub struct UploadItem {
    pub original_name: String,
    pub body: Bytes,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UploadOutcome {
    pub saved: usize,
    pub rejected: usize,
}

/// Runs CPU-heavy table work off the async workers.
pub async fn blocking<T, F>(work: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("table worker panicked")?
}

/// Stores each acceptable file under the user's prefix and records ownership.
/// Parts without a filename are skipped without counting.
pub async fn ingest(
    st: &AppState,
    user_id: i64,
    items: Vec<UploadItem>,
) -> AppResult<UploadOutcome> {
    let mut outcome = UploadOutcome::default();
    for item in items {
        if item.original_name.is_empty() {
            continue;
        }
        let Some(safe) = naming::sanitize(&item.original_name).filter(|n| naming::is_allowed_upload(n))
        else {
            debug!(user_id, file = %item.original_name, "upload rejected");
            outcome.rejected += 1;
            continue;
        };

        let stored = naming::stored_name(user_id, &safe);
        st.storage
            .put_object(Area::Uploads, &stored, item.body)
            .await
            .with_context(|| format!("store upload {}", stored))?;
        repo::record_upload(&st.db, user_id, &item.original_name, &stored).await?;
        info!(user_id, file = %stored, "upload saved");
        outcome.saved += 1;
    }
    Ok(outcome)
}

/// Loads a table the user owns, from uploads or their cleaned files.
pub async fn load_owned(st: &AppState, user_id: i64, stored: &str) -> AppResult<Table> {
    let area = gate::resolve_source(st, user_id, stored).await?;
    load_from(st, area, stored).await
}

pub async fn load_from(st: &AppState, area: Area, stored: &str) -> AppResult<Table> {
    let body = st
        .storage
        .get_object(area, stored)
        .await
        .with_context(|| format!("read {}", stored))?;
    let name = stored.to_string();
    blocking(move || loader::load(&name, &body)).await
}

pub async fn preview(st: &AppState, user_id: i64, stored: &str) -> AppResult<PreviewResponse> {
    let stored = stored.trim();
    if stored.is_empty() {
        return Err(AppError::Validation("file parameter is required".into()));
    }
    let table = load_owned(st, user_id, stored).await?;
    let head = table.head(PREVIEW_ROWS);
    Ok(PreviewResponse {
        columns: head.columns,
        rows: head
            .rows
            .iter()
            .map(|row| row.iter().map(Value::render).collect())
            .collect(),
    })
}
