use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use super::{format_float, Table};
use crate::error::{AppError, AppResult};
use crate::files::naming;

/// Parses a whole file into memory, dispatching on the extension of `name`:
/// `csv` as comma-delimited text, `xlsx`/`xls` as the first worksheet. The
/// first row supplies the column names in both cases.
pub fn load(name: &str, bytes: &[u8]) -> AppResult<Table> {
    match naming::extension(name).as_deref() {
        Some("csv") => load_csv(bytes),
        Some("xlsx") | Some("xls") => load_workbook(bytes),
        other => Err(AppError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn load_csv(bytes: &[u8]) -> AppResult<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| AppError::Parse(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(AppError::Parse("no columns to parse from file".into()));
    }

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| AppError::Parse(e.to_string()))?;
        if record.len() > headers.len() {
            return Err(AppError::Parse(format!(
                "expected {} fields in line {}, saw {}",
                headers.len(),
                i + 2,
                record.len()
            )));
        }
        rows.push(record.iter().map(|c| Some(c.to_string())).collect());
    }
    Ok(Table::from_raw(headers, rows))
}

fn load_workbook(bytes: &[u8]) -> AppResult<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| AppError::Parse(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Parse("workbook has no worksheets".into()))?
        .map_err(|e| AppError::Parse(e.to_string()))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header) => header.iter().map(|c| cell_text(c).unwrap_or_default()).collect(),
        None => return Err(AppError::Parse("no columns to parse from file".into())),
    };
    let rows = sheet_rows
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    Ok(Table::from_raw(headers, rows))
}

/// Spreadsheet cell as the text the type inference reads. Whole-number
/// floats drop their fraction so they infer as integers.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(format!("{}", *f as i64)),
        Data::Float(f) => Some(format_float(*f)),
        Data::Bool(b) => Some(if *b { "True".into() } else { "False".into() }),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnKind, Value};

    #[test]
    fn csv_reads_header_and_typed_cells() {
        let t = load("7__people.csv", b"name,age,city\nann,31,Oslo\nbob,,\"Rome, IT\"\n").unwrap();
        assert_eq!(t.columns, vec!["name", "age", "city"]);
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.rows[0][1], Value::Int(31));
        assert_eq!(t.rows[1][1], Value::Missing);
        assert_eq!(t.rows[1][2], Value::Text("Rome, IT".into()));
        assert_eq!(t.column_kind(1), ColumnKind::Integer);
    }

    #[test]
    fn extension_dispatch_is_case_insensitive() {
        assert!(load("DATA.CSV", b"a\n1\n").is_ok());
        let err = load("data.json", b"{}").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(ext) if ext == "json"));
        assert!(matches!(load("noext", b"a\n").unwrap_err(), AppError::UnsupportedFormat(_)));
    }

    #[test]
    fn malformed_csv_is_a_parse_error() {
        assert!(matches!(load("a.csv", b"").unwrap_err(), AppError::Parse(_)));
        assert!(matches!(
            load("a.csv", b"a,b\n1,2,3\n").unwrap_err(),
            AppError::Parse(_)
        ));
        assert!(matches!(
            load("a.csv", b"a,b\n\xff\xfe,1\n").unwrap_err(),
            AppError::Parse(_)
        ));
    }

    #[test]
    fn header_only_csv_is_an_empty_table() {
        let t = load("a.csv", b"x,y\n").unwrap();
        assert_eq!(t.column_count(), 2);
        assert_eq!(t.row_count(), 0);
    }

    #[test]
    fn csv_round_trip_preserves_shape_and_cells() {
        let src = b"id,price,label,note\n1,2.5,a,\n2,3.0,\"b,c\",x\n3,,NA,y\n";
        let first = load("a.csv", src).unwrap();
        let written = first.to_csv_bytes().unwrap();
        let second = load("a.csv", &written).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn xlsx_first_sheet_is_loaded() {
        let mut wb = rust_xlsxwriter::Workbook::new();
        let ws = wb.add_worksheet();
        ws.write_string(0, 0, "item").unwrap();
        ws.write_string(0, 1, "qty").unwrap();
        ws.write_string(0, 2, "ratio").unwrap();
        ws.write_string(1, 0, "bolt").unwrap();
        ws.write_number(1, 1, 4.0).unwrap();
        ws.write_number(1, 2, 0.5).unwrap();
        ws.write_string(2, 0, "nut").unwrap();
        ws.write_number(2, 1, 10.0).unwrap();
        let bytes = wb.save_to_buffer().unwrap();

        let t = load("7__stock.xlsx", &bytes).unwrap();
        assert_eq!(t.columns, vec!["item", "qty", "ratio"]);
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.rows[0][1], Value::Int(4));
        assert_eq!(t.rows[1][1], Value::Int(10));
        assert_eq!(t.rows[0][2], Value::Float(0.5));
        assert_eq!(t.rows[1][2], Value::Missing);

        let again = load("a.csv", &t.to_csv_bytes().unwrap()).unwrap();
        assert_eq!(t, again);
    }

    #[test]
    fn garbage_workbook_is_a_parse_error() {
        assert!(matches!(
            load("a.xlsx", b"definitely not a zip").unwrap_err(),
            AppError::Parse(_)
        ));
    }
}
