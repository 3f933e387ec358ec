use serde::{Deserialize, Serialize};

/// Query for `GET /preview`.
#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub file: Option<String>,
}

/// First rows of a table, every cell as text.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PreviewResponse {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
