// crates/chronochat-core/src/error.rs

use thiserror::Error;

use crate::export::ExportError;
use crate::selection::ChartType;

/// Everything that can stop a visualization request. Per-value parse failures
/// are not represented here; they degrade to missing cells and only surface
/// as [`VisualizeError::EmptyResult`] when nothing survives cleaning.
#[derive(Error, Debug)]
pub enum VisualizeError {
    #[error("the uploaded table is empty")]
    EmptyInput,

    #[error("column '{column}' does not exist in the uploaded data")]
    SchemaMismatch { column: String },

    #[error("column '{column}' does not contain any data")]
    EmptyColumn { column: String },

    #[error("the selected columns do not contain valid data for plotting")]
    EmptyResult,

    #[error("{chart} needs {expected} attribute(s), {found} selected")]
    SelectionArity {
        chart: ChartType,
        expected: &'static str,
        found: usize,
    },

    #[error("column '{column}' is selected more than once")]
    DuplicateSelection { column: String },

    #[error("export failed: {0}")]
    ExportIo(#[from] ExportError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("failed to read uploaded data: {0}")]
    Parser(#[from] chronochat_parser::ParserError),
}

pub type Result<T> = std::result::Result<T, VisualizeError>;
