//! Ownership checks for every file a request names.
//!
//! Uploads are authorized by `user_files`, derived files by `artifacts`; the
//! `"<id>__"` prefix on a name is never trusted on its own.

use tracing::warn;

use super::naming;
use super::repo;
use super::repo_types::ArtifactKind;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::Area;

/// Finds which area holds `stored` (uploads first, then processed) and
/// checks the user owns it there.
pub async fn resolve_source(state: &AppState, user_id: i64, stored: &str) -> AppResult<Area> {
    if !naming::is_plain_name(stored) {
        warn!(user_id, file = %stored, "rejected path-like file name");
        return Err(AppError::NotFound);
    }

    if state.storage.exists(Area::Uploads, stored).await? {
        if repo::is_owner(&state.db, user_id, stored).await? {
            return Ok(Area::Uploads);
        }
        warn!(user_id, file = %stored, "upload ownership denied");
        return Err(AppError::Unauthorized);
    }

    if state.storage.exists(Area::Processed, stored).await? {
        if repo::is_artifact_owner(&state.db, user_id, ArtifactKind::Cleaned, stored).await? {
            return Ok(Area::Processed);
        }
        warn!(user_id, file = %stored, "processed file ownership denied");
        return Err(AppError::Unauthorized);
    }

    Err(AppError::NotFound)
}

/// Checks a derived file before it is served back to the user.
pub async fn authorize_artifact(
    state: &AppState,
    user_id: i64,
    kind: ArtifactKind,
    stored: &str,
) -> AppResult<Area> {
    let area = match kind {
        ArtifactKind::Cleaned => Area::Processed,
        ArtifactKind::Visualization => Area::Visualizations,
    };
    if !naming::is_plain_name(stored) || !state.storage.exists(area, stored).await? {
        return Err(AppError::NotFound);
    }
    if !repo::is_artifact_owner(&state.db, user_id, kind, stored).await? {
        warn!(user_id, file = %stored, kind = kind.as_str(), "artifact ownership denied");
        return Err(AppError::Unauthorized);
    }
    Ok(area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use bytes::Bytes;

    async fn setup() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::for_tests(dir.path()).await;
        db::seed_user(&state.db, 7, "seven@example.com").await;
        db::seed_user(&state.db, 8, "eight@example.com").await;
        (dir, state)
    }

    async fn put(state: &AppState, area: Area, name: &str) {
        state
            .storage
            .put_object(area, name, Bytes::from_static(b"a\n1\n"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn owned_upload_resolves_to_upload_area() {
        let (_dir, state) = setup().await;
        put(&state, Area::Uploads, "7__data.csv").await;
        repo::record_upload(&state.db, 7, "data.csv", "7__data.csv").await.unwrap();

        assert_eq!(resolve_source(&state, 7, "7__data.csv").await.unwrap(), Area::Uploads);
        assert!(matches!(
            resolve_source(&state, 8, "7__data.csv").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn prefix_alone_does_not_grant_access() {
        let (_dir, state) = setup().await;
        // On disk with user 8's prefix but never recorded for anyone.
        put(&state, Area::Uploads, "8__planted.csv").await;
        put(&state, Area::Processed, "8__cleaned_guess.csv").await;

        assert!(matches!(
            resolve_source(&state, 8, "8__planted.csv").await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            resolve_source(&state, 8, "8__cleaned_guess.csv").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn processed_area_is_the_fallback() {
        let (_dir, state) = setup().await;
        put(&state, Area::Processed, "7__cleaned_data.csv").await;
        repo::record_artifact(
            &state.db,
            7,
            ArtifactKind::Cleaned,
            "7__cleaned_data.csv",
            "7__data.csv",
        )
        .await
        .unwrap();

        assert_eq!(
            resolve_source(&state, 7, "7__cleaned_data.csv").await.unwrap(),
            Area::Processed
        );
    }

    #[tokio::test]
    async fn missing_and_path_like_names_are_not_found() {
        let (_dir, state) = setup().await;
        assert!(matches!(
            resolve_source(&state, 7, "7__nothing.csv").await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            resolve_source(&state, 7, "../7__data.csv").await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn artifacts_are_served_only_to_their_owner() {
        let (_dir, state) = setup().await;
        put(&state, Area::Visualizations, "7__viz_data_pie.png").await;
        repo::record_artifact(
            &state.db,
            7,
            ArtifactKind::Visualization,
            "7__viz_data_pie.png",
            "7__data.csv",
        )
        .await
        .unwrap();

        assert_eq!(
            authorize_artifact(&state, 7, ArtifactKind::Visualization, "7__viz_data_pie.png")
                .await
                .unwrap(),
            Area::Visualizations
        );
        assert!(matches!(
            authorize_artifact(&state, 8, ArtifactKind::Visualization, "7__viz_data_pie.png").await,
            Err(AppError::Unauthorized)
        ));
        // Same name, wrong kind: not in the processed area at all.
        assert!(matches!(
            authorize_artifact(&state, 7, ArtifactKind::Cleaned, "7__viz_data_pie.png").await,
            Err(AppError::NotFound)
        ));
    }
}
