use super::{Table, Value};

#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    pub drop_duplicates: bool,
    pub fill_missing: bool,
    pub sort_by: Option<String>,
}

/// Applies the enabled steps in a fixed order: dedupe, fill, sort.
pub fn clean(mut table: Table, opts: &CleanOptions) -> Table {
    if opts.drop_duplicates {
        drop_duplicates(&mut table);
    }
    if opts.fill_missing {
        fill_missing(&mut table);
    }
    if let Some(col) = opts
        .sort_by
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .and_then(|c| table.column_index(c))
    {
        table.rows.sort_by(|a, b| a[col].sort_cmp(&b[col]));
    }
    table
}

/// Keeps the first occurrence of each distinct row, preserving order.
fn drop_duplicates(table: &mut Table) {
    let mask = table.duplicate_mask();
    let mut dup = mask.into_iter();
    table.rows.retain(|_| !dup.next().unwrap_or(false));
}

/// Numeric columns get their mean (over the values present now); whatever is
/// still missing afterwards becomes an empty string.
fn fill_missing(table: &mut Table) {
    for col in table.numeric_columns() {
        let (sum, count) = table
            .column(col)
            .filter_map(Value::as_f64)
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        if count == 0 || !table.column(col).any(Value::is_missing) {
            continue;
        }
        let mean = sum / count as f64;
        for row in table.rows.iter_mut() {
            match row[col] {
                Value::Missing => row[col] = Value::Float(mean),
                Value::Int(i) => row[col] = Value::Float(i as f64),
                _ => {}
            }
        }
    }
    for row in table.rows.iter_mut() {
        for cell in row.iter_mut().filter(|c| c.is_missing()) {
            *cell = Value::Text(String::new());
        }
    }
}
