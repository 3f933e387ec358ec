use anyhow::Context;
use bytes::Bytes;
use tracing::{error, info, warn};

use super::dto::{DashboardView, SummaryView, Tab};
use crate::auth::Session;
use crate::error::{AppError, AppResult};
use crate::files::repo_types::ArtifactKind;
use crate::files::{naming, repo, services as files};
use crate::state::AppState;
use crate::storage::Area;
use crate::table::chart::{self, ChartKind};
use crate::table::clean::{clean, CleanOptions};
use crate::table::summary::summarize;

/// Per-file result of a cleaning batch.
#[derive(Debug, Default)]
pub struct CleanReport {
    /// Stored names of the cleaned files written.
    pub written: Vec<String>,
    /// Source name and the reason it was skipped.
    pub skipped: Vec<(String, AppError)>,
}

pub async fn load_view(st: &AppState, session: &Session, tab: Tab) -> AppResult<DashboardView> {
    Ok(DashboardView {
        email: session.email.clone(),
        active_tab: tab,
        uploads: repo::list_uploads_for(&st.db, session.user_id).await?,
        processed: repo::list_artifacts_for(&st.db, session.user_id, ArtifactKind::Cleaned).await?,
        summary: None,
        chart_url: None,
    })
}

/// Cleans each selected upload independently; one bad file never stops the rest.
pub async fn clean_batch(
    st: &AppState,
    user_id: i64,
    selected: &[String],
    opts: &CleanOptions,
) -> CleanReport {
    let mut report = CleanReport::default();
    for stored in selected.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        match clean_one(st, user_id, stored, opts).await {
            Ok(out) => report.written.push(out),
            Err(e) => {
                if e.status_code().is_server_error() {
                    error!(user_id, file = %stored, error = %e, "clean failed");
                } else {
                    warn!(user_id, file = %stored, error = %e, "clean skipped file");
                }
                report.skipped.push((stored.to_string(), e));
            }
        }
    }
    report
}

async fn clean_one(
    st: &AppState,
    user_id: i64,
    stored: &str,
    opts: &CleanOptions,
) -> AppResult<String> {
    if !naming::is_plain_name(stored) {
        return Err(AppError::NotFound);
    }
    if !repo::is_owner(&st.db, user_id, stored).await? {
        return Err(AppError::Unauthorized);
    }
    if !st.storage.exists(Area::Uploads, stored).await? {
        return Err(AppError::NotFound);
    }

    let table = files::load_from(st, Area::Uploads, stored).await?;
    let opts = opts.clone();
    let csv = files::blocking(move || Ok(clean(table, &opts).to_csv_bytes()?)).await?;

    let out = naming::cleaned_name(user_id, stored);
    st.storage
        .put_object(Area::Processed, &out, Bytes::from(csv))
        .await
        .with_context(|| format!("store {}", out))?;
    repo::record_artifact(&st.db, user_id, ArtifactKind::Cleaned, &out, stored).await?;
    info!(user_id, file = %stored, output = %out, "file cleaned");
    Ok(out)
}

pub async fn summarize_file(st: &AppState, user_id: i64, stored: &str) -> AppResult<SummaryView> {
    let stored = stored.trim();
    if stored.is_empty() {
        return Err(AppError::Validation("Please select a file for summary.".into()));
    }
    let table = files::load_owned(st, user_id, stored).await?;
    Ok(SummaryView {
        filename: naming::display_name(stored).to_string(),
        summary: summarize(&table),
    })
}

/// Renders a chart for an owned file and returns the URL it is served at.
pub async fn visualize_file(
    st: &AppState,
    user_id: i64,
    stored: &str,
    chart_type: Option<&str>,
) -> AppResult<String> {
    let stored = stored.trim();
    if stored.is_empty() {
        return Err(AppError::Validation("Please select a file to visualize.".into()));
    }
    let table = files::load_owned(st, user_id, stored).await?;
    let kind = ChartKind::parse(chart_type)?;
    let png = files::blocking(move || chart::visualize(&table, kind)).await?;

    let out = naming::visualization_name(user_id, stored, kind.as_str());
    st.storage
        .put_object(Area::Visualizations, &out, Bytes::from(png))
        .await
        .with_context(|| format!("store {}", out))?;
    repo::record_artifact(&st.db, user_id, ArtifactKind::Visualization, &out, stored).await?;
    info!(user_id, file = %stored, chart = kind.as_str(), output = %out, "chart rendered");
    Ok(format!("/visualizations/{}", urlencoding::encode(&out)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::files::services::{ingest, UploadItem};
    use crate::table::{loader, Value};

    async fn setup() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::for_tests(dir.path()).await;
        db::seed_user(&state.db, 7, "seven@example.com").await;
        db::seed_user(&state.db, 8, "eight@example.com").await;
        (dir, state)
    }

    async fn upload(st: &AppState, user_id: i64, name: &str, body: &'static [u8]) {
        ingest(
            st,
            user_id,
            vec![UploadItem {
                original_name: name.into(),
                body: Bytes::from_static(body),
            }],
        )
        .await
        .unwrap();
    }

    const PEOPLE: &[u8] = b"name,age\nann,30\nann,30\nbob,\ncy,40\n";

    #[tokio::test]
    async fn cleaning_drops_duplicates_and_fills_with_the_mean() {
        let (_dir, st) = setup().await;
        upload(&st, 7, "data.csv", b"name,age\nann,30\nann,30\nbob,\n").await;

        let opts = CleanOptions {
            drop_duplicates: true,
            fill_missing: true,
            sort_by: None,
        };
        let report = clean_batch(&st, 7, &["7__data.csv".to_string()], &opts).await;
        assert_eq!(report.written, vec!["7__cleaned_data.csv"]);
        assert!(report.skipped.is_empty());

        let body = st
            .storage
            .get_object(Area::Processed, "7__cleaned_data.csv")
            .await
            .unwrap();
        assert_eq!(&body[..], b"name,age\nann,30.0\nbob,30.0\n");
        let t = loader::load("7__cleaned_data.csv", &body).unwrap();
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.rows[1][1], Value::Float(30.0));
        assert!(repo::is_artifact_owner(&st.db, 7, ArtifactKind::Cleaned, "7__cleaned_data.csv")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn batch_reports_each_skipped_file() {
        let (_dir, st) = setup().await;
        upload(&st, 7, "good.csv", PEOPLE).await;
        upload(&st, 7, "bad.csv", b"a,b\n1,2,3\n").await;
        upload(&st, 8, "theirs.csv", PEOPLE).await;

        let selected = vec![
            "7__good.csv".to_string(),
            "7__bad.csv".to_string(),
            "8__theirs.csv".to_string(),
            "  ".to_string(),
        ];
        let report = clean_batch(&st, 7, &selected, &CleanOptions::default()).await;
        assert_eq!(report.written, vec!["7__cleaned_good.csv"]);
        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(report.skipped[0].1, AppError::Parse(_)));
        assert!(matches!(report.skipped[1].1, AppError::Unauthorized));
        assert!(!st
            .storage
            .exists(Area::Processed, "7__cleaned_theirs.csv")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn summary_reads_uploads_and_cleaned_files() {
        let (_dir, st) = setup().await;
        upload(&st, 7, "people.csv", PEOPLE).await;

        let view = summarize_file(&st, 7, "7__people.csv").await.unwrap();
        assert_eq!(view.filename, "people.csv");
        assert_eq!(view.summary.rows, 4);
        assert_eq!(view.summary.missing, 1);
        assert_eq!(view.summary.duplicates, 1);

        clean_batch(
            &st,
            7,
            &["7__people.csv".to_string()],
            &CleanOptions {
                drop_duplicates: true,
                ..Default::default()
            },
        )
        .await;
        let cleaned = summarize_file(&st, 7, "7__cleaned_people.csv").await.unwrap();
        assert_eq!(cleaned.summary.rows, 3);
        assert!(matches!(
            summarize_file(&st, 8, "7__cleaned_people.csv").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn failed_chart_writes_nothing() {
        let (_dir, st) = setup().await;
        upload(&st, 7, "single.csv", b"only\n1\n2\n").await;

        let err = visualize_file(&st, 7, "7__single.csv", Some("scatter"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientColumns { needed: 2 }));
        assert!(!st
            .storage
            .exists(Area::Visualizations, "7__viz_single_scatter.png")
            .await
            .unwrap());
        assert!(repo::list_artifacts_for(&st.db, 7, ArtifactKind::Visualization)
            .await
            .unwrap()
            .is_empty());

        assert!(matches!(
            visualize_file(&st, 7, "7__single.csv", Some("radar")).await,
            Err(AppError::InvalidChartType(_))
        ));
        assert!(matches!(
            visualize_file(&st, 7, " ", None).await,
            Err(AppError::Validation(_))
        ));
    }
}
