use crate::cell::{CellValue, Row, cell};
use serde::Deserialize;

/// Headers that hold the student's account, checked in order.
pub const ACCOUNT_COLUMNS: &[&str] = &[
    "學生帳號",
    "帳號",
    "account",
    "Account",
    "email",
    "Email",
    "Email Address",
];

/// Minimum score for a row to pass the subject filter.
pub const PASS_THRESHOLD: f64 = 80.0;

/// What the viewer typed and picked.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterQuery {
    pub search: String,
    /// Subject column that must score at least [`PASS_THRESHOLD`].
    pub subject: String,
}

/// The account column of a sheet; the first column when none of the known
/// names is present.
pub fn account_column(columns: &[String]) -> Option<&str> {
    ACCOUNT_COLUMNS
        .iter()
        .find_map(|name| columns.iter().find(|c| c == name))
        .or_else(|| columns.first())
        .map(String::as_str)
}

/// Keep the rows whose account column matches the viewer's account prefix,
/// ignoring case. An empty prefix matches nothing.
pub fn filter_by_owner(rows: &[Row], columns: &[String], account_prefix: &str) -> Vec<Row> {
    let prefix = account_prefix.trim().to_lowercase();
    let Some(column) = account_column(columns) else {
        return Vec::new();
    };
    if prefix.is_empty() {
        return Vec::new();
    }
    rows.iter()
        .filter(|row| cell(row, column).to_string().trim().to_lowercase() == prefix)
        .cloned()
        .collect()
}

/// Keep the rows where any value contains the search term, ignoring case.
pub fn filter_by_text(rows: &[Row], term: &str) -> Vec<Row> {
    let term = term.to_lowercase();
    if term.is_empty() {
        return rows.to_vec();
    }
    rows.iter()
        .filter(|row| {
            row.values()
                .any(|value| value.to_string().to_lowercase().contains(&term))
        })
        .cloned()
        .collect()
}

/// Keep the rows that passed the given subject.
pub fn filter_by_subject(rows: &[Row], subject: &str) -> Vec<Row> {
    if subject.is_empty() {
        return rows.to_vec();
    }
    rows.iter()
        .filter(|row| matches!(cell(row, subject), CellValue::Number(n) if *n >= PASS_THRESHOLD))
        .cloned()
        .collect()
}

/// Apply the text and subject filters in sequence.
pub fn apply(rows: &[Row], query: &FilterQuery) -> Vec<Row> {
    let matched = filter_by_text(rows, &query.search);
    filter_by_subject(&matched, &query.subject)
}

/// Columns worth offering in the subject select: any column holding at least
/// one number, except the account column.
pub fn subject_columns(rows: &[Row], columns: &[String]) -> Vec<String> {
    let account = account_column(columns);
    columns
        .iter()
        .filter(|c| Some(c.as_str()) != account)
        .filter(|c| rows.iter().any(|row| cell(row, c).as_number().is_some()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, CellValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn owner_filter_matches_account_prefix() {
        let cols = columns(&["學號", "學生帳號"]);
        let rows = vec![
            row(&[("學號", text("S1")), ("學生帳號", text("foo"))]),
            row(&[("學號", text("S2")), ("學生帳號", text("bar"))]),
            row(&[("學號", text("S3")), ("學生帳號", text("FOO"))]),
        ];
        let mine = filter_by_owner(&rows, &cols, crate::identity::account_prefix("foo@bar.com"));
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|r| cell(r, "學生帳號").to_string().to_lowercase() == "foo"));
    }

    #[test]
    fn owner_filter_without_prefix_yields_nothing() {
        let cols = columns(&["學生帳號"]);
        let rows = vec![row(&[("學生帳號", text(""))])];
        assert!(filter_by_owner(&rows, &cols, "").is_empty());
    }

    #[test]
    fn account_column_falls_back_to_first() {
        assert_eq!(account_column(&columns(&["ID", "Email"])), Some("Email"));
        assert_eq!(account_column(&columns(&["Student", "Score"])), Some("Student"));
        assert_eq!(account_column(&[]), None);
    }

    #[test]
    fn numeric_accounts_compare_by_display() {
        let cols = columns(&["帳號"]);
        let rows = vec![row(&[("帳號", CellValue::Number(110123.0))])];
        assert_eq!(filter_by_owner(&rows, &cols, "110123").len(), 1);
    }

    #[test]
    fn text_filter_is_case_insensitive_substring() {
        let rows = vec![
            row(&[("姓名", text("Amy")), ("中文", CellValue::Number(85.0))]),
            row(&[("姓名", text("Bob")), ("中文", CellValue::Number(92.0))]),
        ];
        assert_eq!(filter_by_text(&rows, "aM").len(), 1);
        assert_eq!(filter_by_text(&rows, "92").len(), 1);
        assert_eq!(filter_by_text(&rows, "zzz").len(), 0);
        assert_eq!(filter_by_text(&rows, ""), rows);
    }

    #[test]
    fn subject_filter_keeps_passing_scores() {
        let rows = vec![
            row(&[("數學", CellValue::Number(79.5))]),
            row(&[("數學", CellValue::Number(80.0))]),
            row(&[("數學", text("缺考"))]),
        ];
        assert_eq!(filter_by_subject(&rows, "數學").len(), 1);
        assert_eq!(filter_by_subject(&rows, "").len(), 3);
    }

    #[test]
    fn subjects_are_numeric_columns() {
        let cols = columns(&["學號", "學生帳號", "中文", "備註"]);
        let rows = vec![row(&[
            ("學號", text("S1")),
            ("學生帳號", CellValue::Number(1.0)),
            ("中文", CellValue::Number(85.0)),
            ("備註", text("ok")),
        ])];
        assert_eq!(subject_columns(&rows, &cols), vec!["中文"]);
    }

    #[test]
    fn filtered_view_is_subset() {
        let rows = vec![
            row(&[("姓名", text("張小明")), ("數學", CellValue::Number(88.0))]),
            row(&[("姓名", text("李小華")), ("數學", CellValue::Number(72.0))]),
        ];
        let query = FilterQuery {
            search: "小".into(),
            subject: "數學".into(),
        };
        let view = apply(&rows, &query);
        assert_eq!(view.len(), 1);
        assert!(view.iter().all(|r| rows.contains(r)));
    }
}
