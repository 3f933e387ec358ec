use serde::Deserialize;

use crate::files::repo_types::{Artifact, UploadRecord};
use crate::table::summary::Summary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Upload,
    Clean,
    Summary,
    Viz,
}

impl Tab {
    pub fn id(self) -> &'static str {
        match self {
            Tab::Upload => "tabUpload",
            Tab::Clean => "tabClean",
            Tab::Summary => "tabSummary",
            Tab::Viz => "tabViz",
        }
    }

    /// Unknown or absent ids fall back to the upload tab.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("tabClean") => Tab::Clean,
            Some("tabSummary") => Tab::Summary,
            Some("tabViz") => Tab::Viz,
            _ => Tab::Upload,
        }
    }

    pub fn location(self) -> String {
        format!("/dashboard?tab={}", self.id())
    }
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub tab: Option<String>,
}

/// `POST /clean`. Checkboxes arrive as `"on"` when ticked and not at all otherwise.
#[derive(Debug, Default, Deserialize)]
pub struct CleanForm {
    #[serde(default)]
    pub selected_files: Vec<String>,
    pub opt_duplicates: Option<String>,
    pub opt_missing: Option<String>,
    pub opt_sort: Option<String>,
    pub sort_col: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryForm {
    #[serde(default)]
    pub summary_file: String,
}

#[derive(Debug, Deserialize)]
pub struct VisualizeForm {
    #[serde(default)]
    pub viz_file: String,
    pub chart_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SummaryView {
    /// Stored name without the owner prefix.
    pub filename: String,
    pub summary: Summary,
}

/// Everything the dashboard page shows.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub email: String,
    pub active_tab: Tab,
    pub uploads: Vec<UploadRecord>,
    pub processed: Vec<Artifact>,
    pub summary: Option<SummaryView>,
    pub chart_url: Option<String>,
}
