//! HTML for the score table and the page around it.

use crate::cell::{CellValue, Row, cell};
use crate::error::{Result, ScoreError};
use crate::stats::Summary;
use crate::strings;
use handlebars::{Handlebars, html_escape};
use serde::Serialize;

const PAGE_TEMPLATE: &str = include_str!("./static/score_display.hbs");

/// Header row and body of the grade table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableMarkup {
    pub header: String,
    pub body: String,
}

/// Render the visible rows. Text is escaped, numbers are written as-is.
pub fn render_table(columns: &[String], rows: &[Row]) -> TableMarkup {
    let mut header = String::from("<tr>");
    for column in columns {
        header.push_str("<th>");
        header.push_str(&html_escape(column));
        header.push_str("</th>");
    }
    header.push_str("</tr>");

    let mut body = String::new();
    for row in rows {
        body.push_str("<tr>");
        for column in columns {
            body.push_str("<td>");
            match cell(row, column) {
                CellValue::Number(n) => body.push_str(&n.to_string()),
                CellValue::Text(s) => body.push_str(&html_escape(s)),
                CellValue::Empty => {}
            }
            body.push_str("</td>");
        }
        body.push_str("</tr>");
    }

    TableMarkup { header, body }
}

/// Which of the three panels is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    Loading,
    Ready,
    Error,
}

/// Everything the page template needs.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub title: String,
    pub description: String,
    pub panel: Panel,
    pub error_message: String,
    pub subjects: Vec<String>,
    pub table: TableMarkup,
    pub summary: Summary,
    pub viewer: String,
}

/// Render the full page skeleton with its hooks (`searchInput`,
/// `subjectFilter`, `exportBtn`, `loading`, `error`, `mainContent`, ...).
pub fn render_page(view: &PageView) -> Result<String> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(false);
    hb.register_template_string("page", PAGE_TEMPLATE)
        .map_err(|e| ScoreError::Template(e.to_string()))?;

    let data = serde_json::json!({
        "view": view,
        "is_loading": view.panel == Panel::Loading,
        "is_ready": view.panel == Panel::Ready,
        "is_error": view.panel == Panel::Error,
        "text": {
            "subtitle": strings::SUBTITLE,
            "loading": strings::LOADING,
            "search": strings::SEARCH_PLACEHOLDER,
            "all_subjects": strings::ALL_SUBJECTS,
            "export_csv": strings::EXPORT_CSV,
            "export_xlsx": strings::EXPORT_XLSX,
            "export_failed": strings::EXPORT_FAILED,
            "total": strings::TOTAL_STUDENTS,
            "average": strings::AVERAGE_SCORE,
            "highest": strings::HIGHEST_SCORE,
            "lowest": strings::LOWEST_SCORE,
            "no_rows": strings::NO_ROWS,
        },
    });

    hb.render("page", &data)
        .map_err(|e| ScoreError::Template(e.to_string()))
}
