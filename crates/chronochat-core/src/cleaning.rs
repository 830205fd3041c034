use polars::prelude::*;
use tracing::{debug, warn};

use crate::coercion::Coerced;
use crate::error::{Result, VisualizeError};
use crate::selection::SelectionSpec;
use crate::timestamp::NormalizedTimestamps;
use crate::{Dataset, RawValue};

pub fn utc_datetime_dtype() -> DataType {
    DataType::Datetime(
        TimeUnit::Microseconds,
        Some(polars::prelude::TimeZone::UTC),
    )
}

/// Rows that survived cleaning: the timestamp column is a UTC datetime, every
/// selected attribute is `f64`, and none of those columns holds a null.
#[derive(Debug, Clone)]
pub struct CleanedDataset {
    dataframe: DataFrame,
}

impl CleanedDataset {
    pub fn dataframe(&self) -> &DataFrame {
        &self.dataframe
    }

    pub fn into_dataframe(self) -> DataFrame {
        self.dataframe
    }

    pub fn height(&self) -> usize {
        self.dataframe.height()
    }
}

/// Assembles the typed frame that cleaning operates on. Columns keep the
/// upload's order; unselected columns are carried as nullable strings.
pub fn build_frame(
    dataset: &Dataset,
    timestamps: &NormalizedTimestamps,
    attributes: &[(String, Vec<Coerced>)],
) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(dataset.columns().len());

    for name in dataset.columns() {
        if *name == timestamps.spec.column {
            let micros: Vec<Option<i64>> = timestamps
                .values
                .iter()
                .map(|value| value.map(|dt| dt.timestamp_micros()))
                .collect();
            let series = Series::new(name.as_str().into(), micros).cast(&utc_datetime_dtype())?;
            columns.push(series.into());
        } else if let Some((_, values)) = attributes.iter().find(|(attr, _)| attr == name) {
            columns.push(Series::new(name.as_str().into(), values.clone()).into());
        } else {
            let raw = dataset.column(name).unwrap_or_default();
            let text: Vec<Option<String>> = raw
                .iter()
                .map(|value| match value {
                    RawValue::Missing => None,
                    other => Some(other.to_string()),
                })
                .collect();
            let text: Vec<Option<&str>> = text.iter().map(|value| value.as_deref()).collect();
            columns.push(Series::new(name.as_str().into(), text).into());
        }
    }

    Ok(DataFrame::new(columns)?)
}

/// Drops every row with a null in the timestamp or any selected attribute.
/// Other columns are left as they are. Applying this to an already cleaned
/// frame returns it unchanged.
pub fn clean_rows(frame: DataFrame, selection: &SelectionSpec) -> Result<CleanedDataset> {
    let before = frame.height();
    let predicate = selection
        .key_columns()
        .map(|name| col(name).is_not_null())
        .reduce(|acc, expr| acc.and(expr))
        .unwrap_or_else(|| lit(true));

    let dataframe = frame.lazy().filter(predicate).collect()?;
    let dropped = before - dataframe.height();

    if dataframe.height() == 0 {
        warn!(rows = before, "no rows survived cleaning");
        return Err(VisualizeError::EmptyResult);
    }
    if dropped > 0 {
        warn!(dropped, kept = dataframe.height(), "dropped incomplete rows");
    } else {
        debug!(rows = before, "all rows complete");
    }

    Ok(CleanedDataset { dataframe })
}
