use serde::Serialize;

use super::Table;

/// Read-only descriptive statistics for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub rows: usize,
    pub cols: usize,
    pub columns: Vec<String>,
    pub missing: usize,
    pub duplicates: usize,
}

pub fn summarize(table: &Table) -> Summary {
    Summary {
        rows: table.row_count(),
        cols: table.column_count(),
        columns: table.columns.clone(),
        missing: table.rows.iter().flatten().filter(|c| c.is_missing()).count(),
        duplicates: table.duplicate_mask().into_iter().filter(|d| *d).count(),
    }
}
