use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized file")]
    Unauthorized,

    #[error("File not found")]
    NotFound,

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Cannot read: {0}")]
    Parse(String),

    #[error("This email is already registered. Please login.")]
    DuplicateEmail,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Invalid chart type: {0}")]
    InvalidChartType(String),

    #[error("No numeric columns to plot")]
    NoNumericColumns,

    #[error("Need at least {needed} column(s)")]
    InsufficientColumns { needed: usize },

    #[error("Column '{0}' has no values to plot")]
    EmptyColumn(String),

    #[error("Values in '{0}' span a range too wide to plot")]
    UnplottableRange(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::UnsupportedFormat(_) | Self::Parse(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidChartType(_)
            | Self::NoNumericColumns
            | Self::InsufficientColumns { .. }
            | Self::EmptyColumn(_)
            | Self::UnplottableRange(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Chart-construction failures, reported to users as "Visualization failed".
    pub fn is_visualization_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidChartType(_)
                | Self::NoNumericColumns
                | Self::InsufficientColumns { .. }
                | Self::EmptyColumn(_)
                | Self::UnplottableRange(_)
        )
    }

    /// Message safe to show to the requesting user.
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => {
                "Something went wrong. Please try again.".into()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
