use crate::cell::{Row, cell};
use serde::Serialize;

/// Headers whose values feed the summary cards, checked in order.
pub const AVERAGE_COLUMNS: &[&str] = &["平均分", "average", "Average"];

/// Figures shown in the four stat cards, already formatted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub average: String,
    pub highest: String,
    pub lowest: String,
}

impl Default for Summary {
    fn default() -> Self {
        Summary {
            total: 0,
            average: "0.00".to_string(),
            highest: "0".to_string(),
            lowest: "0".to_string(),
        }
    }
}

pub fn average_column(columns: &[String]) -> Option<&str> {
    AVERAGE_COLUMNS
        .iter()
        .find_map(|name| columns.iter().find(|c| c == name))
        .map(String::as_str)
}

/// Count, mean (two decimals), max and min of `column` over `rows`.
/// Non-numeric cells are left out of the mean and extremes, not the count.
pub fn summarize(rows: &[Row], column: Option<&str>) -> Summary {
    let mut summary = Summary {
        total: rows.len(),
        ..Summary::default()
    };
    let Some(column) = column else {
        return summary;
    };

    let values: Vec<f64> = rows
        .iter()
        .filter_map(|row| cell(row, column).as_number())
        .collect();
    if values.is_empty() {
        return summary;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    summary.average = format!("{:.2}", mean);
    summary.highest = max.to_string();
    summary.lowest = min.to_string();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;

    fn roster() -> Vec<Row> {
        [88.75, 85.5, 89.75, 86.75, 87.75, 86.0, 89.0, 86.75, 91.25, 90.0]
            .iter()
            .enumerate()
            .map(|(i, avg)| {
                let mut row = Row::new();
                row.insert("學號".into(), CellValue::Text(format!("S{:03}", i + 1)));
                row.insert("平均分".into(), CellValue::Number(*avg));
                row
            })
            .collect()
    }

    #[test]
    fn ten_student_roster() {
        let rows = roster();
        let columns = vec!["學號".to_string(), "平均分".to_string()];
        let summary = summarize(&rows, average_column(&columns));
        assert_eq!(summary.total, 10);
        assert_eq!(summary.average, "88.15");
        assert_eq!(summary.highest, "91.25");
        assert_eq!(summary.lowest, "85.5");
    }

    #[test]
    fn empty_view_shows_zeroes() {
        assert_eq!(summarize(&[], Some("平均分")), Summary::default());
    }

    #[test]
    fn missing_average_column_only_counts() {
        let rows = roster();
        let summary = summarize(&rows, average_column(&["學號".to_string()]));
        assert_eq!(summary.total, 10);
        assert_eq!(summary.average, "0.00");
    }
}
