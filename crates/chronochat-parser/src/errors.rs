use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file did not contain a header row")]
    MissingHeader,

    #[error("header column '{column}' appears more than once")]
    DuplicateColumn { column: String },

    #[error("record {row_index} invalid: {message}")]
    InvalidRecord { row_index: usize, message: String },
}
