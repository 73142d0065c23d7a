use crate::cell::{CellValue, Row, cell};
use crate::error::{Result, ScoreError};

/// Stem of every exported file.
const EXPORT_STEM: &str = "student_grades";

/// Convert the visible rows to CSV.
///
/// The first line holds the column names, then one line per row in the same
/// column order. Fields containing a comma, quote or newline are quoted, with
/// inner quotes doubled. Lines end with `\n`. No columns means empty text.
///
/// # Arguments
/// * `columns` - Column names in display order
/// * `rows` - The filtered rows
///
/// # Returns
/// * `Result<String>` - CSV text or an export error
pub fn to_csv(columns: &[String], rows: &[Row]) -> Result<String> {
    if columns.is_empty() {
        return Ok(String::new());
    }
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| cell(row, c).to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ScoreError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ScoreError::Export(e.to_string()))
}

/// Convert the visible rows to an XLSX workbook.
///
/// Numbers stay numeric so the file can be re-sorted and summed in Excel.
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content as bytes or an export error
pub fn to_xlsx(columns: &[String], rows: &[Row]) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (c, name) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, name, &header_format)?;
    }

    for (r, row) in rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, name) in columns.iter().enumerate() {
            let c = c as u16;
            match cell(row, name) {
                CellValue::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                CellValue::Text(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                CellValue::Empty => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// File name offered for a download, e.g. `student_grades_Grades.csv`.
///
/// Anything but ASCII letters, digits, `-` and `_` in the page id becomes `_`.
pub fn export_filename(page_id: Option<&str>, extension: &str) -> String {
    let page: String = page_id
        .unwrap_or_default()
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();

    if page.is_empty() {
        format!("{}.{}", EXPORT_STEM, extension)
    } else {
        format!("{}_{}.{}", EXPORT_STEM, page, extension)
    }
}
