//! In-memory tables and the transforms run over them.

pub mod chart;
pub mod clean;
pub mod loader;
pub mod summary;

use std::cmp::Ordering;

use anyhow::Context;

/// Cell markers read as missing, in addition to the empty string.
const MISSING_MARKERS: [&str; 11] = [
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Cell text as written to CSV and previews; missing renders empty.
    pub fn render(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Text(s) => s.clone(),
        }
    }

    /// Key used for whole-row equality. Missing cells compare equal to each other.
    fn identity(&self) -> String {
        match self {
            Value::Missing => "\u{0}".into(),
            Value::Int(i) => format!("i{}", i),
            Value::Float(f) => format!("f{}", format_float(*f)),
            Value::Text(s) => format!("t{}", s),
        }
    }

    /// Ascending order: numbers, then text, then missing.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Int(_) | Value::Float(_) => 0,
                Value::Text(_) => 1,
                Value::Missing => 2,
            }
        }
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => rank(self).cmp(&rank(other)),
            },
        }
    }
}

/// Floats keep a decimal point even when integral: `30.0`, not `30`.
pub fn format_float(f: f64) -> String {
    let s = f.to_string();
    if f.is_finite() && !s.contains(['.', 'e', 'E']) {
        format!("{}.0", s)
    } else {
        s
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Builds a table from raw cell text, inferring one type per column.
    /// `None` and the missing markers become `Value::Missing`. A column whose
    /// cells are not all numeric keeps every cell as its original text.
    pub fn from_raw(headers: Vec<String>, raw_rows: Vec<Vec<Option<String>>>) -> Self {
        let columns = dedupe_headers(headers);
        let width = columns.len();
        let mut raw_rows = raw_rows;
        for raw in raw_rows.iter_mut() {
            raw.resize(width, None);
        }
        let mut rows: Vec<Vec<Value>> = raw_rows
            .iter()
            .map(|raw| raw.iter().map(|cell| parse_cell(cell.as_deref())).collect())
            .collect();

        for col in 0..width {
            match infer_kind(rows.iter().map(|r| &r[col])) {
                ColumnKind::Integer => {}
                ColumnKind::Float => {
                    for row in rows.iter_mut() {
                        if let Value::Int(i) = row[col] {
                            row[col] = Value::Float(i as f64);
                        }
                    }
                }
                ColumnKind::Text => {
                    for (row, raw) in rows.iter_mut().zip(raw_rows.iter_mut()) {
                        if !row[col].is_missing() {
                            row[col] = Value::Text(raw[col].take().unwrap_or_default());
                        }
                    }
                }
            }
        }
        Table { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |r| &r[idx])
    }

    pub fn column_kind(&self, idx: usize) -> ColumnKind {
        infer_kind(self.column(idx))
    }

    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.column_count())
            .filter(|&i| self.column_kind(i).is_numeric())
            .collect()
    }

    /// Per-row flag: true when the row equals some earlier row in every column.
    pub fn duplicate_mask(&self) -> Vec<bool> {
        let mut seen = std::collections::HashSet::with_capacity(self.rows.len());
        self.rows
            .iter()
            .map(|row| {
                let key: Vec<String> = row.iter().map(Value::identity).collect();
                !seen.insert(key)
            })
            .collect()
    }

    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub fn to_csv_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(&self.columns).context("write csv header")?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(Value::render))
                .context("write csv row")?;
        }
        wtr.into_inner().context("flush csv")
    }
}

fn parse_cell(raw: Option<&str>) -> Value {
    let Some(raw) = raw else {
        return Value::Missing;
    };
    if raw.is_empty() || MISSING_MARKERS.contains(&raw) {
        return Value::Missing;
    }
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() {
            return Value::Float(f);
        }
    }
    Value::Text(raw.to_string())
}

/// All non-missing integers: integer. All numeric: float. No values at all:
/// float, the type an all-missing numeric column would have. Otherwise text.
fn infer_kind<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;
    let mut any = false;
    for v in values {
        match v {
            Value::Missing => continue,
            Value::Int(_) => {}
            Value::Float(_) => kind = ColumnKind::Float,
            Value::Text(_) => return ColumnKind::Text,
        }
        any = true;
    }
    if any {
        kind
    } else {
        ColumnKind::Float
    }
}

/// Empty names become `Unnamed: <i>`; repeats get `.1`, `.2`, ... suffixes.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    for (i, name) in headers.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {}", i)
        } else {
            name
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{}.{}", base, n);
            n += 1;
        }
        out.push(candidate);
    }
    out
}

#[cfg(test)]
pub(crate) fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
    Table {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}
