//! Chart rendering. Every chart is planned first (validation and the numbers
//! to draw), and only a valid plan reaches the bitmap backend, so a failed
//! request never produces an image.

use std::{collections::HashMap, f64::consts::PI, io::Cursor, str::FromStr};

use anyhow::Context;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::{Table, Value};
use crate::error::{AppError, AppResult};

pub const WIDTH: u32 = 900;
pub const HEIGHT: u32 = 500;
const HISTOGRAM_BINS: usize = 10;
const AXIS_PAD: f64 = 0.05;
/// Widest axis accepted; leaves headroom for tick arithmetic near `f64::MAX`.
const MAX_SPAN: f64 = 1e300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Histogram,
    Line,
    Bar,
    Pie,
    Scatter,
}

impl ChartKind {
    /// Absent or blank selects the histogram.
    pub fn parse(raw: Option<&str>) -> AppResult<Self> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(ChartKind::Histogram),
            Some(s) => s.parse(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Histogram => "histogram",
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
        }
    }
}

impl FromStr for ChartKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "histogram" => Ok(ChartKind::Histogram),
            "line" => Ok(ChartKind::Line),
            "bar" => Ok(ChartKind::Bar),
            "pie" => Ok(ChartKind::Pie),
            "scatter" => Ok(ChartKind::Scatter),
            _ => Err(AppError::InvalidChartType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramPanel {
    pub column: String,
    pub start: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineData {
    pub column: String,
    /// Runs of consecutive present values; a missing cell breaks the line.
    pub segments: Vec<Vec<(f64, f64)>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frequencies {
    pub column: String,
    /// Distinct values by count descending, ties in order of first appearance.
    pub entries: Vec<(String, usize)>,
}

impl Frequencies {
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    /// Wedge annotations, e.g. `"red (37.5%)"`.
    pub fn share_labels(&self) -> Vec<String> {
        let total = self.total().max(1) as f64;
        self.entries
            .iter()
            .map(|(label, count)| format!("{} ({:.1}%)", label, *count as f64 * 100.0 / total))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub name: String,
    /// Set when the column is not numeric; point coordinates are indices into it.
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterData {
    pub x: Axis,
    pub y: Axis,
    pub points: Vec<(f64, f64)>,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartPlan {
    Histogram(Vec<HistogramPanel>),
    Line {
        series: Vec<LineData>,
        y_range: (f64, f64),
    },
    Bar(Frequencies),
    Pie(Frequencies),
    Scatter(ScatterData),
}

pub fn plan(table: &Table, kind: ChartKind) -> AppResult<ChartPlan> {
    match kind {
        ChartKind::Histogram => {
            let mut panels = Vec::new();
            for col in table.numeric_columns() {
                if let Some(panel) = histogram_panel(table, col)? {
                    panels.push(panel);
                }
            }
            if panels.is_empty() {
                return Err(AppError::NoNumericColumns);
            }
            Ok(ChartPlan::Histogram(panels))
        }
        ChartKind::Line => {
            let series: Vec<_> = table
                .numeric_columns()
                .into_iter()
                .map(|col| line_data(table, col))
                .filter(|s| !s.segments.is_empty())
                .collect();
            if series.is_empty() {
                return Err(AppError::NoNumericColumns);
            }
            let ys: Vec<f64> = series
                .iter()
                .flat_map(|s| s.segments.iter().flatten())
                .map(|(_, y)| *y)
                .collect();
            let names: Vec<&str> = series.iter().map(|s| s.column.as_str()).collect();
            let y_range = padded_range(&names.join(", "), &ys, AXIS_PAD)?;
            Ok(ChartPlan::Line { series, y_range })
        }
        ChartKind::Bar => Ok(ChartPlan::Bar(first_column_frequencies(table)?)),
        ChartKind::Pie => Ok(ChartPlan::Pie(first_column_frequencies(table)?)),
        ChartKind::Scatter => {
            if table.column_count() < 2 {
                return Err(AppError::InsufficientColumns { needed: 2 });
            }
            let (x, xs) = axis(table, 0);
            let (y, ys) = axis(table, 1);
            let points: Vec<_> = xs
                .into_iter()
                .zip(ys)
                .filter_map(|(x, y)| Some((x?, y?)))
                .collect();
            if points.is_empty() {
                return Err(AppError::EmptyColumn(x.name));
            }
            let xs: Vec<f64> = points.iter().map(|(x, _)| *x).collect();
            let ys: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
            let x_range = padded_range(&x.name, &xs, AXIS_PAD)?;
            let y_range = padded_range(&y.name, &ys, AXIS_PAD)?;
            Ok(ChartPlan::Scatter(ScatterData {
                x,
                y,
                points,
                x_range,
                y_range,
            }))
        }
    }
}

/// Plans and renders in one step, returning PNG bytes.
pub fn visualize(table: &Table, kind: ChartKind) -> AppResult<Vec<u8>> {
    let plan = plan(table, kind)?;
    Ok(render(&plan)?)
}

fn histogram_panel(table: &Table, col: usize) -> AppResult<Option<HistogramPanel>> {
    let values: Vec<f64> = table.column(col).filter_map(Value::as_f64).collect();
    if values.is_empty() {
        return Ok(None);
    }
    let column = &table.columns[col];
    let (start, end) = padded_range(column, &values, 0.0)?;
    let bin_width = (end - start) / HISTOGRAM_BINS as f64;
    if bin_width <= 0.0 {
        return Err(AppError::UnplottableRange(column.clone()));
    }
    let mut counts = vec![0usize; HISTOGRAM_BINS];
    for v in values {
        let idx = (((v - start) / bin_width).floor() as usize).min(HISTOGRAM_BINS - 1);
        counts[idx] += 1;
    }
    Ok(Some(HistogramPanel {
        column: column.clone(),
        start,
        bin_width,
        counts,
    }))
}

fn line_data(table: &Table, col: usize) -> LineData {
    let mut segments = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    for (i, v) in table.column(col).enumerate() {
        match v.as_f64() {
            Some(y) => current.push((i as f64, y)),
            None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    LineData {
        column: table.columns[col].clone(),
        segments,
    }
}

fn first_column_frequencies(table: &Table) -> AppResult<Frequencies> {
    if table.column_count() < 1 {
        return Err(AppError::InsufficientColumns { needed: 1 });
    }
    let mut entries: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for v in table.column(0).filter(|v| !v.is_missing()) {
        let label = v.render();
        match index.get(&label) {
            Some(&i) => entries[i].1 += 1,
            None => {
                index.insert(label.clone(), entries.len());
                entries.push((label, 1));
            }
        }
    }
    if entries.is_empty() {
        return Err(AppError::EmptyColumn(table.columns[0].clone()));
    }
    // Stable: equal counts keep first-appearance order.
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(Frequencies {
        column: table.columns[0].clone(),
        entries,
    })
}

fn axis(table: &Table, col: usize) -> (Axis, Vec<Option<f64>>) {
    let name = table.columns[col].clone();
    if table.column_kind(col).is_numeric() {
        let coords = table.column(col).map(Value::as_f64).collect();
        return (
            Axis {
                name,
                categories: None,
            },
            coords,
        );
    }
    let mut categories: Vec<String> = Vec::new();
    let coords = table
        .column(col)
        .map(|v| {
            if v.is_missing() {
                return None;
            }
            let label = v.render();
            let pos = match categories.iter().position(|c| *c == label) {
                Some(pos) => pos,
                None => {
                    categories.push(label);
                    categories.len() - 1
                }
            };
            Some(pos as f64)
        })
        .collect();
    (
        Axis {
            name,
            categories: Some(categories),
        },
        coords,
    )
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Axis range over `values`, widened by `pad` of the span on each side. A
/// constant column is widened around its value. Fails when the width is not
/// positive or exceeds [`MAX_SPAN`]; plotters cannot lay out such an axis.
fn padded_range(column: &str, values: &[f64], pad: f64) -> AppResult<(f64, f64)> {
    let Some((lo, hi)) = min_max(values) else {
        return Ok((0.0, 1.0));
    };
    let air = if lo == hi {
        (lo.abs() * 0.05).max(0.5)
    } else {
        (hi - lo) * pad
    };
    let (lo, hi) = (lo - air, hi + air);
    let width = hi - lo;
    if !width.is_finite() || width <= 0.0 || width > MAX_SPAN {
        return Err(AppError::UnplottableRange(column.to_string()));
    }
    Ok((lo, hi))
}

// ---- rendering ----

type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

fn draw_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow::anyhow!("chart rendering failed: {}", e)
}

pub fn render(plan: &ChartPlan) -> anyhow::Result<Vec<u8>> {
    let mut buf = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        match plan {
            ChartPlan::Histogram(panels) => draw_histograms(&root, panels)?,
            ChartPlan::Line { series, y_range } => draw_lines(&root, series, *y_range)?,
            ChartPlan::Bar(freq) => draw_bar(&root, freq)?,
            ChartPlan::Pie(freq) => draw_pie(&root, freq)?,
            ChartPlan::Scatter(data) => draw_scatter(&root, data)?,
        }
        root.present().map_err(draw_err)?;
    }
    encode_png(buf)
}

fn encode_png(buf: Vec<u8>) -> anyhow::Result<Vec<u8>> {
    let img = image::RgbImage::from_raw(WIDTH, HEIGHT, buf).context("bitmap size mismatch")?;
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .context("encode png")?;
    Ok(out.into_inner())
}

fn draw_histograms(root: &Canvas<'_>, panels: &[HistogramPanel]) -> anyhow::Result<()> {
    let cols = (panels.len() as f64).sqrt().ceil() as usize;
    let rows = (panels.len() + cols - 1) / cols;
    let areas = root.split_evenly((rows, cols));

    for (area, panel) in areas.iter().zip(panels) {
        let end = panel.start + panel.bin_width * panel.counts.len() as f64;
        let top = panel.counts.iter().copied().max().unwrap_or(0) as u32 + 1;
        let mut chart = ChartBuilder::on(area)
            .caption(&panel.column, ("sans-serif", 16).into_font())
            .margin(8)
            .x_label_area_size(24)
            .y_label_area_size(32)
            .build_cartesian_2d(panel.start..end, 0u32..top)
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .draw()
            .map_err(draw_err)?;
        chart
            .draw_series(panel.counts.iter().enumerate().map(|(i, &count)| {
                let x0 = panel.start + panel.bin_width * i as f64;
                Rectangle::new(
                    [(x0, 0u32), (x0 + panel.bin_width, count as u32)],
                    BLUE.mix(0.7).filled(),
                )
            }))
            .map_err(draw_err)?;
    }
    Ok(())
}

fn draw_lines(
    root: &Canvas<'_>,
    series: &[LineData],
    (y_lo, y_hi): (f64, f64),
) -> anyhow::Result<()> {
    let x_hi = series
        .iter()
        .flat_map(|s| s.segments.iter().flatten())
        .map(|(x, _)| *x)
        .fold(1.0_f64, f64::max);

    let mut chart = ChartBuilder::on(root)
        .caption("Numeric columns", ("sans-serif", 22).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..x_hi, y_lo..y_hi)
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .x_desc("row")
        .draw()
        .map_err(draw_err)?;

    for (i, s) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        for (n, segment) in s.segments.iter().enumerate() {
            let drawn = chart
                .draw_series(LineSeries::new(segment.iter().copied(), color.stroke_width(2)))
                .map_err(draw_err)?;
            if n == 0 {
                drawn
                    .label(s.column.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
            }
        }
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(draw_err)?;
    Ok(())
}

fn draw_bar(root: &Canvas<'_>, freq: &Frequencies) -> anyhow::Result<()> {
    let n = freq.entries.len() as u32;
    let top = freq.entries.iter().map(|(_, c)| *c).max().unwrap_or(0) as u32 + 1;
    let labels: Vec<&str> = freq.entries.iter().map(|(l, _)| l.as_str()).collect();

    let mut chart = ChartBuilder::on(root)
        .caption(&freq.column, ("sans-serif", 22).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0u32..n).into_segmented(), 0u32..top)
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("count")
        .x_labels(labels.len())
        .x_label_formatter(&|v: &SegmentValue<u32>| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                labels.get(*i as usize).map(|s| s.to_string()).unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        })
        .draw()
        .map_err(draw_err)?;
    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.7).filled())
                .margin(6)
                .data(
                    freq.entries
                        .iter()
                        .enumerate()
                        .map(|(i, (_, c))| (i as u32, *c as u32)),
                ),
        )
        .map_err(draw_err)?;
    Ok(())
}

fn draw_pie(root: &Canvas<'_>, freq: &Frequencies) -> anyhow::Result<()> {
    let area = root
        .titled(&freq.column, ("sans-serif", 22).into_font())
        .map_err(draw_err)?;
    let (w, h) = area.dim_in_pixel();
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let radius = w.min(h) as f64 * 0.36;
    let total = freq.total().max(1) as f64;
    let label_style = TextStyle::from(("sans-serif", 14).into_font())
        .pos(Pos::new(HPos::Center, VPos::Center));

    let mut angle = -PI / 2.0;
    for (i, ((_, count), label)) in freq.entries.iter().zip(freq.share_labels()).enumerate() {
        let sweep = 2.0 * PI * *count as f64 / total;
        let steps = ((sweep / (2.0 * PI)) * 180.0).ceil().max(2.0) as usize;
        let mut points = vec![(cx as i32, cy as i32)];
        for k in 0..=steps {
            let a = angle + sweep * k as f64 / steps as f64;
            points.push(((cx + radius * a.cos()) as i32, (cy + radius * a.sin()) as i32));
        }
        area.draw(&Polygon::new(points, Palette99::pick(i).filled()))
            .map_err(draw_err)?;

        let mid = angle + sweep / 2.0;
        let at = (
            (cx + radius * 1.2 * mid.cos()) as i32,
            (cy + radius * 1.2 * mid.sin()) as i32,
        );
        area.draw(&Text::new(label, at, label_style.clone()))
            .map_err(draw_err)?;
        angle += sweep;
    }
    Ok(())
}

fn category_label(axis: &Axis, v: f64) -> String {
    match &axis.categories {
        Some(cats) if (v - v.round()).abs() < 1e-6 && v >= 0.0 => {
            cats.get(v.round() as usize).cloned().unwrap_or_default()
        }
        Some(_) => String::new(),
        None => format!("{:.2}", v),
    }
}

fn draw_scatter(root: &Canvas<'_>, data: &ScatterData) -> anyhow::Result<()> {
    let (x_lo, x_hi) = data.x_range;
    let (y_lo, y_hi) = data.y_range;

    let mut chart = ChartBuilder::on(root)
        .caption(
            format!("{} vs {}", data.y.name, data.x.name),
            ("sans-serif", 22).into_font(),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(draw_err)?;

    let x_fmt = |v: &f64| category_label(&data.x, *v);
    let y_fmt = |v: &f64| category_label(&data.y, *v);
    let mut mesh = chart.configure_mesh();
    mesh.x_desc(data.x.name.as_str()).y_desc(data.y.name.as_str());
    if data.x.categories.is_some() {
        mesh.x_label_formatter(&x_fmt);
    }
    if data.y.categories.is_some() {
        mesh.y_label_formatter(&y_fmt);
    }
    mesh.draw().map_err(draw_err)?;

    chart
        .draw_series(
            data.points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
        )
        .map_err(draw_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::table;

    fn sales() -> Table {
        table(
            &["color", "units", "price"],
            vec![
                vec![Value::Text("red".into()), Value::Int(3), Value::Float(1.5)],
                vec![Value::Text("blue".into()), Value::Int(5), Value::Missing],
                vec![Value::Text("red".into()), Value::Int(2), Value::Float(2.5)],
                vec![Value::Text("green".into()), Value::Int(9), Value::Float(0.5)],
                vec![Value::Text("blue".into()), Value::Missing, Value::Float(4.0)],
                vec![Value::Text("red".into()), Value::Int(1), Value::Float(3.0)],
                vec![Value::Missing, Value::Int(4), Value::Float(2.0)],
                vec![Value::Text("teal".into()), Value::Int(6), Value::Float(1.0)],
            ],
        )
    }

    #[test]
    fn chart_kind_parsing() {
        assert_eq!(ChartKind::parse(None).unwrap(), ChartKind::Histogram);
        assert_eq!(ChartKind::parse(Some("  ")).unwrap(), ChartKind::Histogram);
        assert_eq!(ChartKind::parse(Some("PIE")).unwrap(), ChartKind::Pie);
        assert_eq!(" Scatter ".parse::<ChartKind>().unwrap(), ChartKind::Scatter);
        assert!(matches!(
            ChartKind::parse(Some("donut")),
            Err(AppError::InvalidChartType(_))
        ));
    }

    #[test]
    fn histogram_bins_cover_every_value() {
        let ChartPlan::Histogram(panels) = plan(&sales(), ChartKind::Histogram).unwrap() else {
            panic!("expected histogram");
        };
        assert_eq!(panels.len(), 2);
        assert_eq!(panels[0].column, "units");
        assert_eq!(panels[0].counts.len(), HISTOGRAM_BINS);
        assert_eq!(panels[0].counts.iter().sum::<usize>(), 7);
        // The maximum lands in the last bin rather than past it.
        assert_eq!(panels[0].counts[HISTOGRAM_BINS - 1], 1);
        assert_eq!(panels[1].counts.iter().sum::<usize>(), 7);
    }

    #[test]
    fn constant_column_still_gets_a_histogram() {
        let t = table(&["k"], vec![vec![Value::Int(5)], vec![Value::Int(5)]]);
        let ChartPlan::Histogram(panels) = plan(&t, ChartKind::Histogram).unwrap() else {
            panic!("expected histogram");
        };
        assert_eq!(panels[0].start, 4.5);
        assert_eq!(panels[0].counts.iter().sum::<usize>(), 2);
    }

    #[test]
    fn histogram_and_line_need_numeric_columns() {
        let t = table(&["name"], vec![vec![Value::Text("a".into())]]);
        assert!(matches!(plan(&t, ChartKind::Histogram), Err(AppError::NoNumericColumns)));
        assert!(matches!(plan(&t, ChartKind::Line), Err(AppError::NoNumericColumns)));
    }

    #[test]
    fn line_series_break_at_missing_cells() {
        let ChartPlan::Line { series, .. } = plan(&sales(), ChartKind::Line).unwrap() else {
            panic!("expected line");
        };
        let units = &series[0];
        assert_eq!(units.segments.len(), 2);
        assert_eq!(units.segments[0].len(), 4);
        assert_eq!(units.segments[1][0], (5.0, 1.0));
    }

    #[test]
    fn bar_counts_first_column_by_frequency() {
        let ChartPlan::Bar(freq) = plan(&sales(), ChartKind::Bar).unwrap() else {
            panic!("expected bar");
        };
        assert_eq!(
            freq.entries,
            vec![
                ("red".to_string(), 3),
                ("blue".to_string(), 2),
                ("green".to_string(), 1),
                ("teal".to_string(), 1),
            ]
        );
        assert_eq!(freq.total(), 7);
    }

    #[test]
    fn pie_labels_carry_one_decimal_percentages() {
        let ChartPlan::Pie(freq) = plan(&sales(), ChartKind::Pie).unwrap() else {
            panic!("expected pie");
        };
        assert_eq!(
            freq.share_labels(),
            vec!["red (42.9%)", "blue (28.6%)", "green (14.3%)", "teal (14.3%)"]
        );
    }

    #[test]
    fn scatter_needs_two_columns() {
        let t = table(&["only"], vec![vec![Value::Int(1)]]);
        assert!(matches!(
            plan(&t, ChartKind::Scatter),
            Err(AppError::InsufficientColumns { needed: 2 })
        ));
        assert!(matches!(
            visualize(&t, ChartKind::Scatter),
            Err(AppError::InsufficientColumns { .. })
        ));
    }

    #[test]
    fn scatter_maps_text_axis_to_categories_and_skips_gaps() {
        let ChartPlan::Scatter(data) = plan(&sales(), ChartKind::Scatter).unwrap() else {
            panic!("expected scatter");
        };
        assert_eq!(
            data.x.categories.as_deref(),
            Some(&["red".to_string(), "blue".to_string(), "green".to_string(), "teal".to_string()][..])
        );
        assert!(data.y.categories.is_none());
        assert_eq!(data.points.len(), 6);
        assert_eq!(data.points[0], (0.0, 3.0));
        assert_eq!(category_label(&data.x, 1.0), "blue");
        assert_eq!(category_label(&data.x, 0.5), "");
    }

    fn extremes() -> Table {
        table(
            &["a", "b"],
            vec![
                vec![Value::Float(-1e308), Value::Int(1)],
                vec![Value::Float(1e308), Value::Int(2)],
            ],
        )
    }

    #[test]
    fn ranges_beyond_f64_are_refused_before_rendering() {
        for kind in [ChartKind::Histogram, ChartKind::Line, ChartKind::Scatter] {
            assert!(
                matches!(plan(&extremes(), kind), Err(AppError::UnplottableRange(ref c)) if c.contains('a')),
                "{:?}",
                kind
            );
            let err = visualize(&extremes(), kind).unwrap_err();
            assert!(err.is_visualization_failure());
        }
        // Bar and pie count labels, so magnitudes do not matter there.
        assert!(visualize(&extremes(), ChartKind::Bar).is_ok());
    }

    #[test]
    fn loaded_extreme_values_fail_the_scatter_plan() {
        let t = crate::table::loader::load("7__x.csv", b"a,b\n-1e308,1\n1e308,2\n").unwrap();
        assert!(matches!(
            plan(&t, ChartKind::Scatter),
            Err(AppError::UnplottableRange(c)) if c == "a"
        ));
    }

    #[test]
    fn large_constant_column_widens_around_its_value() {
        let t = table(&["k"], vec![vec![Value::Float(1e20)], vec![Value::Float(1e20)]]);
        let ChartPlan::Histogram(panels) = plan(&t, ChartKind::Histogram).unwrap() else {
            panic!("expected histogram");
        };
        assert!(panels[0].bin_width > 0.0);
        assert_eq!(panels[0].counts.iter().sum::<usize>(), 2);
    }

    fn assert_png(bytes: &[u8]) {
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
        use image::GenericImageView;
        let img = image::load_from_memory(bytes).unwrap();
        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
    }

    #[test]
    fn every_kind_renders_a_png() {
        for kind in [
            ChartKind::Histogram,
            ChartKind::Line,
            ChartKind::Bar,
            ChartKind::Pie,
            ChartKind::Scatter,
        ] {
            let png = visualize(&sales(), kind).unwrap();
            assert_png(&png);
        }
    }

    #[test]
    fn numeric_scatter_and_single_panel_histogram_render() {
        let t = table(
            &["x", "y"],
            vec![
                vec![Value::Int(1), Value::Float(2.0)],
                vec![Value::Int(2), Value::Float(4.5)],
                vec![Value::Int(3), Value::Missing],
            ],
        );
        let ChartPlan::Scatter(data) = plan(&t, ChartKind::Scatter).unwrap() else {
            panic!("expected scatter");
        };
        assert!(data.x_range.0 < 1.0 && data.x_range.1 > 2.0);
        assert_png(&render(&ChartPlan::Scatter(data)).unwrap());

        let k = table(&["k"], vec![vec![Value::Int(5)]]);
        assert_png(&visualize(&k, ChartKind::Histogram).unwrap());
    }

    #[test]
    fn bar_on_empty_first_column_fails() {
        let t = table(&["a", "b"], vec![vec![Value::Missing, Value::Int(1)]]);
        assert!(matches!(plan(&t, ChartKind::Bar), Err(AppError::EmptyColumn(c)) if c == "a"));
        let none = table(&[], Vec::new());
        assert!(matches!(
            plan(&none, ChartKind::Pie),
            Err(AppError::InsufficientColumns { needed: 1 })
        ));
    }
}
