use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// One uploaded file owned by a user.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UploadRecord {
    #[sqlx(rename = "filename")]
    pub original_name: String,
    #[sqlx(rename = "stored_filename")]
    pub stored_name: String,
    pub uploaded_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Cleaned,
    Visualization,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Cleaned => "cleaned",
            ArtifactKind::Visualization => "visualization",
        }
    }
}

/// A derived file (cleaned CSV or chart image) and who owns it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Artifact {
    pub user_id: i64,
    pub kind: String,
    #[sqlx(rename = "stored_filename")]
    pub stored_name: String,
    #[sqlx(rename = "source_filename")]
    pub source_name: String,
    pub created_at: OffsetDateTime,
}
