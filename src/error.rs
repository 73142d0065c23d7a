use thiserror::Error;

/// Errors raised while resolving, downloading, decoding or exporting grade data.
///
/// None of these ever escape the component: the shell logs them and moves to
/// its error state, and the identity resolver swallows them into a fallback.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// The platform answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The Excel path/link has none of the supported shapes.
    #[error("cannot resolve file locator: {0}")]
    Unresolvable(String),

    #[error("workbook contains no worksheets")]
    EmptyWorkbook,

    #[error("cannot decode workbook: {0}")]
    Decode(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("template error: {0}")]
    Template(String),
}

impl From<reqwest::Error> for ScoreError {
    fn from(err: reqwest::Error) -> Self {
        ScoreError::Network(err.to_string())
    }
}

impl From<calamine::Error> for ScoreError {
    fn from(err: calamine::Error) -> Self {
        ScoreError::Decode(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ScoreError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ScoreError::Export(err.to_string())
    }
}

impl From<csv::Error> for ScoreError {
    fn from(err: csv::Error) -> Self {
        ScoreError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScoreError>;
