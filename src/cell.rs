use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single grade-sheet value.
///
/// Serialises untagged so a row turns into a plain JSON object
/// (`{"學號": "S001", "中文": 85}`), with `Empty` as `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

/// One spreadsheet row keyed by header name.
pub type Row = HashMap<String, CellValue>;

impl CellValue {
    /// Build a value from raw text, coercing anything that reads as a finite
    /// number.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return CellValue::Text(text.to_string());
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(text.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // f64's Display already drops the ".0" of integral values.
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Empty => Ok(()),
        }
    }
}

/// Look up a cell, treating a missing key as empty.
pub fn cell<'a>(row: &'a Row, column: &str) -> &'a CellValue {
    row.get(column).unwrap_or(&CellValue::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_text_is_coerced() {
        assert_eq!(CellValue::from_text("85"), CellValue::Number(85.0));
        assert_eq!(CellValue::from_text(" 88.75 "), CellValue::Number(88.75));
        assert_eq!(CellValue::from_text("S001"), CellValue::Text("S001".into()));
        assert_eq!(CellValue::from_text("NaN"), CellValue::Text("NaN".into()));
        assert_eq!(CellValue::from_text(""), CellValue::Text(String::new()));
    }

    #[test]
    fn numbers_display_without_trailing_zero() {
        assert_eq!(CellValue::Number(85.0).to_string(), "85");
        assert_eq!(CellValue::Number(88.75).to_string(), "88.75");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn serialises_as_plain_json() {
        let mut row = Row::new();
        row.insert("姓名".into(), CellValue::Text("Amy".into()));
        row.insert("中文".into(), CellValue::Number(85.0));
        row.insert("備註".into(), CellValue::Empty);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["姓名"], "Amy");
        assert_eq!(json["中文"], 85.0);
        assert!(json["備註"].is_null());
    }
}
