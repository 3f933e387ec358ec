//! Server-rendered pages. Templates are static HTML with `{{name}}` slots,
//! filled in a single pass so inserted text is never re-scanned.

use axum::response::Html;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::flash::Flash;
use crate::auth::services::MIN_PASSWORD_LEN;
use crate::dashboard::dto::{DashboardView, SummaryView};
use crate::files::naming;

const LAYOUT: &str = include_str!("./static/layout.html");
const INDEX: &str = include_str!("./static/index.html");
const ABOUT: &str = include_str!("./static/about.html");
const LOGIN: &str = include_str!("./static/login.html");
const SIGNUP: &str = include_str!("./static/signup.html");
const DASHBOARD: &str = include_str!("./static/dashboard.html");

const GOOGLE_BUTTON: &str = r#"<p><a href="/auth/google">Continue with Google</a></p>"#;

lazy_static! {
    static ref SLOT: Regex = Regex::new(r"\{\{(\w+)\}\}").unwrap();
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Unknown slots render empty.
fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    SLOT.replace_all(template, |caps: &Captures| {
        vars.iter()
            .find(|(k, _)| *k == &caps[1])
            .map(|(_, v)| v.to_string())
            .unwrap_or_default()
    })
    .into_owned()
}

fn layout(title: &str, signed_in: bool, flashes: &[Flash], content: &str) -> Html<String> {
    let nav = if signed_in {
        r#"<a href="/dashboard">Dashboard</a><a href="/about">About</a><a href="/logout">Log out</a>"#
    } else {
        r#"<a href="/about">About</a><a href="/login">Sign in</a><a href="/signup">Sign up</a>"#
    };
    let flashes: String = flashes
        .iter()
        .map(|f| {
            format!(
                r#"<div class="flash {}">{}</div>"#,
                f.level.as_str(),
                escape(&f.message)
            )
        })
        .collect();
    Html(fill(
        LAYOUT,
        &[
            ("title", escape(title).as_str()),
            ("nav", nav),
            ("flashes", flashes.as_str()),
            ("content", content),
        ],
    ))
}

pub fn index(signed_in: bool) -> Html<String> {
    layout("Home", signed_in, &[], INDEX)
}

pub fn about(signed_in: bool) -> Html<String> {
    layout("About", signed_in, &[], ABOUT)
}

pub fn login(flashes: &[Flash], google_enabled: bool) -> Html<String> {
    let google = if google_enabled { GOOGLE_BUTTON } else { "" };
    layout("Sign in", false, flashes, &fill(LOGIN, &[("google", google)]))
}

pub fn signup(flashes: &[Flash], google_enabled: bool) -> Html<String> {
    let google = if google_enabled { GOOGLE_BUTTON } else { "" };
    let min = MIN_PASSWORD_LEN.to_string();
    layout(
        "Sign up",
        false,
        flashes,
        &fill(SIGNUP, &[("google", google), ("min_password", min.as_str())]),
    )
}

fn summary_block(view: &SummaryView) -> String {
    let s = &view.summary;
    let columns: Vec<String> = s.columns.iter().map(|c| escape(c)).collect();
    format!(
        r#"<h3>Summary of {}</h3>
<table>
  <tr><th>Rows</th><td>{}</td></tr>
  <tr><th>Columns</th><td>{}</td></tr>
  <tr><th>Column names</th><td>{}</td></tr>
  <tr><th>Missing cells</th><td>{}</td></tr>
  <tr><th>Duplicate rows</th><td>{}</td></tr>
</table>"#,
        escape(&view.filename),
        s.rows,
        s.cols,
        columns.join(", "),
        s.missing,
        s.duplicates
    )
}

pub fn dashboard(view: &DashboardView, flashes: &[Flash]) -> Html<String> {
    let upload_rows: String = view
        .uploads
        .iter()
        .map(|u| {
            format!(
                r#"<tr><td>{}</td><td>{}</td><td><button type="button" data-preview="{}">Preview</button></td></tr>"#,
                escape(&u.original_name),
                u.uploaded_at.date(),
                escape(&u.stored_name)
            )
        })
        .collect();

    let file_checkboxes: String = view
        .uploads
        .iter()
        .map(|u| {
            format!(
                r#"<label><input type="checkbox" name="selected_files" value="{}"> {}</label>"#,
                escape(&u.stored_name),
                escape(naming::display_name(&u.stored_name))
            )
        })
        .collect();

    let processed_rows: String = view
        .processed
        .iter()
        .map(|a| {
            format!(
                r#"<li><a href="/download/{}">{}</a></li>"#,
                urlencoding::encode(&a.stored_name),
                escape(naming::display_name(&a.stored_name))
            )
        })
        .collect();

    let source_options: String = view
        .uploads
        .iter()
        .map(|u| u.stored_name.as_str())
        .chain(view.processed.iter().map(|a| a.stored_name.as_str()))
        .map(|name| {
            format!(
                r#"<option value="{}">{}</option>"#,
                escape(name),
                escape(naming::display_name(name))
            )
        })
        .collect();

    let summary = view.summary.as_ref().map(summary_block).unwrap_or_default();
    let chart = view
        .chart_url
        .as_deref()
        .map(|url| format!(r#"<img src="{}" alt="chart" width="900" height="500">"#, escape(url)))
        .unwrap_or_default();

    let content = fill(
        DASHBOARD,
        &[
            ("email", escape(&view.email).as_str()),
            ("active_tab", view.active_tab.id()),
            ("upload_rows", upload_rows.as_str()),
            ("file_checkboxes", file_checkboxes.as_str()),
            ("processed_rows", processed_rows.as_str()),
            ("source_options", source_options.as_str()),
            ("summary", summary.as_str()),
            ("chart", chart.as_str()),
        ],
    );
    layout("Dashboard", true, flashes, &content)
}
