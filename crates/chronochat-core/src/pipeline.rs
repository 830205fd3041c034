use tracing::info;

use crate::aggregation::{summarize, SummaryTable};
use crate::chart::{build_chart, ChartDescription};
use crate::cleaning::{build_frame, clean_rows, CleanedDataset};
use crate::coercion::coerce_column;
use crate::error::{Result, VisualizeError};
use crate::selection::SelectionSpec;
use crate::timestamp::{normalize_timestamps, TimestampSpec};
use crate::Dataset;

/// Everything one visualization request produces.
#[derive(Debug, Clone)]
pub struct VisualizationResult {
    pub timestamp_spec: TimestampSpec,
    pub cleaned: CleanedDataset,
    pub chart: ChartDescription,
    pub summary: SummaryTable,
    /// Rows removed by cleaning.
    pub dropped_rows: usize,
}

/// Runs one request end to end. Input contract checks happen before any
/// conversion, and the first error stops the request without partial output.
pub fn visualize(dataset: &Dataset, selection: &SelectionSpec) -> Result<VisualizationResult> {
    if dataset.is_empty() {
        return Err(VisualizeError::EmptyInput);
    }
    selection.check_arity()?;
    selection.check_against(dataset)?;

    let timestamps = normalize_timestamps(dataset, &selection.timestamp_column)?;
    let attributes = selection
        .attributes
        .iter()
        .map(|attribute| Ok((attribute.clone(), coerce_column(dataset, attribute)?)))
        .collect::<Result<Vec<_>>>()?;

    let frame = build_frame(dataset, &timestamps, &attributes)?;
    let cleaned = clean_rows(frame, selection)?;
    let dropped_rows = dataset.height() - cleaned.height();

    let chart = build_chart(&cleaned, selection)?;
    let summary = summarize(&cleaned, selection)?;

    info!(
        chart = selection.chart_type.as_str(),
        timestamp_column = %selection.timestamp_column,
        encoding = ?timestamps.spec.encoding,
        rows = dataset.height(),
        kept = cleaned.height(),
        dropped = dropped_rows,
        groups = summary.height(),
        "visualization request complete"
    );

    Ok(VisualizationResult {
        timestamp_spec: timestamps.spec,
        cleaned,
        chart,
        summary,
        dropped_rows,
    })
}
