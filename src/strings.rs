//! User-facing text of the score display.

pub const DEFAULT_TITLE: &str = "學生成績管理系統";
pub const SUBTITLE: &str = "使用 SharePoint Framework 開發的學生成績顯示系統";
pub const LOADING: &str = "正在載入學生成績資料...";
pub const GENERIC_ERROR: &str = "載入失敗，請稍後再試";
pub const INIT_FAILED: &str = "初始化數據失敗";
pub const LOAD_FAILED: &str = "數據載入失敗";
pub const EXPORT_FAILED: &str = "匯出失敗，請稍後再試";
pub const SEARCH_PLACEHOLDER: &str = "搜尋學生姓名或學號...";
pub const ALL_SUBJECTS: &str = "所有科目";
pub const EXPORT_CSV: &str = "匯出 CSV";
pub const EXPORT_XLSX: &str = "匯出 Excel";
pub const TOTAL_STUDENTS: &str = "總學生數";
pub const AVERAGE_SCORE: &str = "平均分數";
pub const HIGHEST_SCORE: &str = "最高分數";
pub const LOWEST_SCORE: &str = "最低分數";
pub const NO_ROWS: &str = "沒有符合條件的成績資料";
