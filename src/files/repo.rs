use sqlx::SqlitePool;
use time::OffsetDateTime;

use super::repo_types::{Artifact, ArtifactKind, UploadRecord};
use crate::error::AppResult;

/// Record ownership of an upload. A repeated upload of the same stored name
/// refreshes the single existing row instead of adding another.
pub async fn record_upload(
    db: &SqlitePool,
    user_id: i64,
    original_name: &str,
    stored_name: &str,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO user_files (user_id, filename, stored_filename, uploaded_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(stored_filename) DO UPDATE
           SET filename = excluded.filename,
               uploaded_at = excluded.uploaded_at
         WHERE user_files.user_id = excluded.user_id
        "#,
    )
    .bind(user_id)
    .bind(original_name)
    .bind(stored_name)
    .bind(OffsetDateTime::now_utc())
    .execute(db)
    .await?;
    Ok(())
}

/// Authoritative ownership check for the upload area.
pub async fn is_owner(db: &SqlitePool, user_id: i64, stored_name: &str) -> AppResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM user_files WHERE user_id = ? AND stored_filename = ?",
    )
    .bind(user_id)
    .bind(stored_name)
    .fetch_optional(db)
    .await?;
    Ok(found.is_some())
}

/// Most recent first.
pub async fn list_uploads_for(db: &SqlitePool, user_id: i64) -> AppResult<Vec<UploadRecord>> {
    let rows = sqlx::query_as::<_, UploadRecord>(
        r#"
        SELECT filename, stored_filename, uploaded_at
          FROM user_files
         WHERE user_id = ?
         ORDER BY uploaded_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Record (or re-record) a derived artifact. Last write wins.
pub async fn record_artifact(
    db: &SqlitePool,
    user_id: i64,
    kind: ArtifactKind,
    stored_name: &str,
    source_name: &str,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO artifacts (user_id, kind, stored_filename, source_filename, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(stored_filename) DO UPDATE
           SET source_filename = excluded.source_filename,
               created_at = excluded.created_at
         WHERE artifacts.user_id = excluded.user_id
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(stored_name)
    .bind(source_name)
    .bind(OffsetDateTime::now_utc())
    .execute(db)
    .await?;
    Ok(())
}

pub async fn is_artifact_owner(
    db: &SqlitePool,
    user_id: i64,
    kind: ArtifactKind,
    stored_name: &str,
) -> AppResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM artifacts WHERE user_id = ? AND kind = ? AND stored_filename = ?",
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(stored_name)
    .fetch_optional(db)
    .await?;
    Ok(found.is_some())
}

/// Name order, matching how the dashboard lists processed files.
pub async fn list_artifacts_for(
    db: &SqlitePool,
    user_id: i64,
    kind: ArtifactKind,
) -> AppResult<Vec<Artifact>> {
    let rows = sqlx::query_as::<_, Artifact>(
        r#"
        SELECT user_id, kind, stored_filename, source_filename, created_at
          FROM artifacts
         WHERE user_id = ? AND kind = ?
         ORDER BY stored_filename ASC
        "#,
    )
    .bind(user_id)
    .bind(kind.as_str())
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn ownership_is_per_user_and_per_name() {
        let pool = db::memory().await;
        db::seed_user(&pool, 7, "seven@example.com").await;
        db::seed_user(&pool, 8, "eight@example.com").await;

        record_upload(&pool, 7, "data.csv", "7__data.csv").await.unwrap();

        assert!(is_owner(&pool, 7, "7__data.csv").await.unwrap());
        assert!(!is_owner(&pool, 8, "7__data.csv").await.unwrap());
        // Matching the prefix convention is not the same as owning the name.
        assert!(!is_owner(&pool, 7, "7__other.csv").await.unwrap());
    }

    #[tokio::test]
    async fn repeated_upload_keeps_a_single_row() {
        let pool = db::memory().await;
        db::seed_user(&pool, 7, "seven@example.com").await;

        record_upload(&pool, 7, "data.csv", "7__data.csv").await.unwrap();
        record_upload(&pool, 7, "data.csv", "7__data.csv").await.unwrap();

        let uploads = list_uploads_for(&pool, 7).await.unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].original_name, "data.csv");
    }

    #[tokio::test]
    async fn uploads_are_listed_most_recent_first() {
        let pool = db::memory().await;
        db::seed_user(&pool, 7, "seven@example.com").await;
        db::seed_user(&pool, 8, "eight@example.com").await;

        record_upload(&pool, 7, "a.csv", "7__a.csv").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        record_upload(&pool, 7, "b.csv", "7__b.csv").await.unwrap();
        record_upload(&pool, 8, "c.csv", "8__c.csv").await.unwrap();

        let names: Vec<_> = list_uploads_for(&pool, 7)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.stored_name)
            .collect();
        assert_eq!(names, vec!["7__b.csv", "7__a.csv"]);
    }

    #[tokio::test]
    async fn artifacts_are_owned_by_kind() {
        let pool = db::memory().await;
        db::seed_user(&pool, 7, "seven@example.com").await;

        record_artifact(&pool, 7, ArtifactKind::Cleaned, "7__cleaned_data.csv", "7__data.csv")
            .await
            .unwrap();
        record_artifact(&pool, 7, ArtifactKind::Cleaned, "7__cleaned_data.csv", "7__data.csv")
            .await
            .unwrap();

        assert!(is_artifact_owner(&pool, 7, ArtifactKind::Cleaned, "7__cleaned_data.csv")
            .await
            .unwrap());
        assert!(!is_artifact_owner(&pool, 7, ArtifactKind::Visualization, "7__cleaned_data.csv")
            .await
            .unwrap());
        assert!(!is_artifact_owner(&pool, 8, ArtifactKind::Cleaned, "7__cleaned_data.csv")
            .await
            .unwrap());

        let listed = list_artifacts_for(&pool, 7, ArtifactKind::Cleaned).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].source_name, "7__data.csv");
    }
}
