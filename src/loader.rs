use crate::cell::{CellValue, Row};
use crate::error::{Result, ScoreError};
use crate::locator::FileLocator;
use crate::platform::{SiteClient, SiteHttp};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

/// Headers pinned to the front of the table, in this order, when present.
pub const STUDENT_ID_COLUMNS: &[&str] = &["學號", "studentId", "StudentID", "Student ID"];
pub const NAME_COLUMNS: &[&str] = &["姓名", "name", "Name"];

/// Placeholder for a blank header cell; repeats get `_1`, `_2`, ...
const EMPTY_HEADER: &str = "__EMPTY";

/// Rows of the first worksheet, keyed by its header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Header names in sheet order.
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Display order of the columns.
    pub fn columns(&self) -> Vec<String> {
        derive_columns(&self.headers)
    }
}

/// Download the workbook a locator points to and decode its first sheet.
///
/// # Errors
/// * `ScoreError::Http` if the platform answers with a non-success status
/// * `ScoreError::EmptyWorkbook` if the file has no worksheets
/// * `ScoreError::Decode` if the bytes are not a readable workbook
pub async fn load<H: SiteHttp>(client: &SiteClient<H>, locator: &FileLocator) -> Result<Dataset> {
    let url = locator.download_url(client.site_url());
    info!("downloading grade workbook from {}", url);
    let bytes = client.get_bytes(&url).await?;
    let dataset = decode_workbook(bytes)?;
    info!(
        "decoded {} rows x {} columns",
        dataset.rows.len(),
        dataset.headers.len()
    );
    Ok(dataset)
}

/// Decode workbook bytes (xlsx, xlsb, xls or ods) into a dataset.
///
/// Row 0 of the first worksheet is the header row. An empty sheet, or one
/// whose first row is entirely blank, decodes to an empty dataset.
pub fn decode_workbook(bytes: Vec<u8>) -> Result<Dataset> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    if workbook.sheet_names().is_empty() {
        return Err(ScoreError::EmptyWorkbook);
    }
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ScoreError::EmptyWorkbook)??;

    if range.is_empty() {
        debug!("first worksheet is empty");
        return Ok(Dataset::default());
    }
    let mut rows = range.rows();
    let Some(header_cells) = rows.next() else {
        debug!("first worksheet is empty");
        return Ok(Dataset::default());
    };
    if header_cells.iter().all(|c| c.to_string().trim().is_empty()) {
        debug!("first worksheet has no header row");
        return Ok(Dataset::default());
    }

    let headers = header_names(header_cells);
    let records = rows
        .filter_map(|cells| {
            let row: Row = headers
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = cells.get(i).map_or(CellValue::Empty, to_cell_value);
                    (name.clone(), value)
                })
                .collect();
            if row.values().all(CellValue::is_empty) {
                None
            } else {
                Some(row)
            }
        })
        .collect();

    Ok(Dataset {
        headers,
        rows: records,
    })
}

/// Name every header cell uniquely. A repeat of `X` takes the first free
/// `X_1`, `X_2`, ..., skipping names already handed out.
fn header_names(cells: &[Data]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, usize> = HashMap::new();
    cells
        .iter()
        .map(|cell| {
            let raw = cell.to_string();
            let base = match raw.trim() {
                "" => EMPTY_HEADER.to_string(),
                name => name.to_string(),
            };
            let name = if used.contains(&base) {
                let suffix = next_suffix.entry(base.clone()).or_insert(1);
                loop {
                    let candidate = format!("{}_{}", base, suffix);
                    *suffix += 1;
                    if !used.contains(&candidate) {
                        break candidate;
                    }
                }
            } else {
                base
            };
            used.insert(name.clone());
            name
        })
        .collect()
}

fn to_cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        // Excel serial number, as the sheet stores it.
        Data::DateTime(d) => CellValue::Number(d.as_f64()),
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::from_text(s),
        other => CellValue::Text(other.to_string()),
    }
}

/// Order headers for display: student id, then name, then the rest as found.
pub fn derive_columns(headers: &[String]) -> Vec<String> {
    let pick = |candidates: &[&str]| {
        candidates
            .iter()
            .find(|c| headers.iter().any(|h| h == *c))
            .map(|c| c.to_string())
    };

    let mut columns = Vec::with_capacity(headers.len());
    if let Some(id) = pick(STUDENT_ID_COLUMNS) {
        columns.push(id);
    }
    if let Some(name) = pick(NAME_COLUMNS) {
        columns.push(name);
    }
    for header in headers {
        if !columns.contains(header) {
            columns.push(header.clone());
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HttpResponse;
    use crate::platform::testing::MockHttp;
    use rust_xlsxwriter::Workbook;

    fn workbook(rows: &[&[&str]]) -> Vec<u8> {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    ws.write_string(r as u32, c as u16, *value).unwrap();
                }
            }
        }
        wb.save_to_buffer().unwrap()
    }

    #[test]
    fn header_row_keys_the_records() {
        let ds = decode_workbook(workbook(&[&["學號", "姓名"], &["S1", "Amy"]])).unwrap();
        assert_eq!(ds.headers, vec!["學號", "姓名"]);
        assert_eq!(ds.columns(), vec!["學號", "姓名"]);
        assert_eq!(ds.rows.len(), 1);
        assert_eq!(ds.rows[0]["學號"], CellValue::Text("S1".into()));
        assert_eq!(ds.rows[0]["姓名"], CellValue::Text("Amy".into()));
    }

    #[test]
    fn empty_sheet_is_an_empty_dataset() {
        let mut wb = Workbook::new();
        wb.add_worksheet();
        let ds = decode_workbook(wb.save_to_buffer().unwrap()).unwrap();
        assert!(ds.is_empty());
        assert!(ds.headers.is_empty());
        assert!(ds.columns().is_empty());
    }

    #[test]
    fn numeric_text_and_numbers_become_numbers() {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.write_string(0, 0, "學號").unwrap();
        ws.write_string(0, 1, "中文").unwrap();
        ws.write_string(0, 2, "英文").unwrap();
        ws.write_string(1, 0, "S001").unwrap();
        ws.write_number(1, 1, 85).unwrap();
        ws.write_string(1, 2, "92.5").unwrap();
        let ds = decode_workbook(wb.save_to_buffer().unwrap()).unwrap();
        assert_eq!(ds.rows[0]["中文"], CellValue::Number(85.0));
        assert_eq!(ds.rows[0]["英文"], CellValue::Number(92.5));
        assert_eq!(ds.rows[0]["學號"], CellValue::Text("S001".into()));
    }

    #[test]
    fn blank_and_repeated_headers_get_synthesised_names() {
        let ds = decode_workbook(workbook(&[
            &["學號", "", "分數", "分數", ""],
            &["S1", "x", "1", "2", "y"],
        ]))
        .unwrap();
        assert_eq!(ds.headers, vec!["學號", "__EMPTY", "分數", "分數_1", "__EMPTY_1"]);
        assert_eq!(ds.rows[0]["分數_1"], CellValue::Number(2.0));
        assert_eq!(ds.rows[0]["__EMPTY_1"], CellValue::Text("y".into()));
    }

    #[test]
    fn synthesised_names_skip_literal_headers() {
        let ds = decode_workbook(workbook(&[
            &["分數", "分數", "分數_1"],
            &["1", "2", "3"],
        ]))
        .unwrap();
        assert_eq!(ds.headers, vec!["分數", "分數_1", "分數_1_1"]);
        assert_eq!(ds.rows[0].len(), 3);
        assert_eq!(ds.rows[0]["分數"], CellValue::Number(1.0));
        assert_eq!(ds.rows[0]["分數_1"], CellValue::Number(2.0));
        assert_eq!(ds.rows[0]["分數_1_1"], CellValue::Number(3.0));
        assert_eq!(ds.columns().len(), 3);

        let ds = decode_workbook(workbook(&[&["分數_1", "分數", "分數"], &["1", "2", "3"]])).unwrap();
        assert_eq!(ds.headers, vec!["分數_1", "分數", "分數_2"]);
    }

    #[test]
    fn literal_empty_placeholder_and_blank_header_stay_apart() {
        let ds = decode_workbook(workbook(&[&["__EMPTY", "", "學號"], &["a", "b", "S1"]])).unwrap();
        assert_eq!(ds.headers, vec!["__EMPTY", "__EMPTY_1", "學號"]);
        assert_eq!(ds.rows[0]["__EMPTY"], CellValue::Text("a".into()));
        assert_eq!(ds.rows[0]["__EMPTY_1"], CellValue::Text("b".into()));
    }

    #[test]
    fn dates_keep_their_serial_number() {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        let date = rust_xlsxwriter::Format::new().set_num_format("yyyy-mm-dd");
        ws.write_string(0, 0, "學號").unwrap();
        ws.write_string(0, 1, "考試日期").unwrap();
        ws.write_string(1, 0, "S1").unwrap();
        ws.write_number_with_format(1, 1, 45000.0, &date).unwrap();
        let ds = decode_workbook(wb.save_to_buffer().unwrap()).unwrap();
        assert_eq!(ds.rows[0]["考試日期"], CellValue::Number(45000.0));
    }

    #[test]
    fn blank_rows_are_skipped_and_short_rows_padded() {
        let ds = decode_workbook(workbook(&[
            &["學號", "姓名", "備註"],
            &["S1", "Amy", ""],
            &["", "", ""],
            &["S2", "", ""],
        ]))
        .unwrap();
        assert_eq!(ds.rows.len(), 2);
        assert_eq!(ds.rows[0]["備註"], CellValue::Empty);
        assert_eq!(ds.rows[1]["姓名"], CellValue::Empty);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode_workbook(b"not a workbook".to_vec()).unwrap_err();
        assert!(matches!(err, ScoreError::Decode(_)));
    }

    #[test]
    fn identity_columns_are_pinned_first() {
        let headers: Vec<String> = ["中文", "姓名", "英文", "學號", "平均分"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let first = derive_columns(&headers);
        assert_eq!(first, vec!["學號", "姓名", "中文", "英文", "平均分"]);
        assert_eq!(derive_columns(&headers), first);
    }

    #[tokio::test]
    async fn load_downloads_then_decodes() {
        let site = "https://contoso.sharepoint.com/sites/class";
        let locator = FileLocator::ServerRelativePath {
            path: "/sites/class/Shared Documents/grades.xlsx".into(),
        };
        let url = locator.download_url(site);
        let http = MockHttp::new().with(
            &url,
            HttpResponse::ok(workbook(&[&["學號", "姓名"], &["S1", "Amy"]])),
        );
        let client = SiteClient::new(http, site);
        let ds = load(&client, &locator).await.unwrap();
        assert_eq!(ds.rows.len(), 1);
    }

    #[tokio::test]
    async fn failed_download_is_reported() {
        let site = "https://contoso.sharepoint.com/sites/class";
        let locator = FileLocator::ServerRelativePath {
            path: "/sites/class/missing.xlsx".into(),
        };
        let client = SiteClient::new(MockHttp::new(), site);
        let err = load(&client, &locator).await.unwrap_err();
        assert!(matches!(err, ScoreError::Http { status: 404, .. }));
    }
}
