use polars::prelude::*;
use tracing::debug;

use crate::cleaning::CleanedDataset;
use crate::error::Result;
use crate::selection::SelectionSpec;

pub const COUNT_COLUMN: &str = "count";

/// Occurrence counts per distinct (timestamp, attribute...) tuple.
#[derive(Debug, Clone)]
pub struct SummaryTable {
    dataframe: DataFrame,
}

impl SummaryTable {
    pub fn dataframe(&self) -> &DataFrame {
        &self.dataframe
    }

    pub fn into_dataframe(self) -> DataFrame {
        self.dataframe
    }

    pub fn height(&self) -> usize {
        self.dataframe.height()
    }

    /// Sum of all counts; equals the number of cleaned rows that were grouped.
    pub fn total_count(&self) -> Result<i64> {
        Ok(self
            .dataframe
            .column(COUNT_COLUMN)?
            .i64()?
            .sum()
            .unwrap_or(0))
    }
}

/// Groups the cleaned rows by exact value of the timestamp and every selected
/// attribute. Rows come out sorted by the key columns in selection order; the
/// stable group-by and order-preserving sort keep first-seen order for ties.
pub fn summarize(cleaned: &CleanedDataset, selection: &SelectionSpec) -> Result<SummaryTable> {
    let keys: Vec<Expr> = selection.key_columns().map(col).collect();

    let dataframe = cleaned
        .dataframe()
        .clone()
        .lazy()
        .select(keys.clone())
        .group_by_stable(keys.clone())
        .agg([len().cast(DataType::Int64).alias(COUNT_COLUMN)])
        .sort_by_exprs(
            keys,
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    debug!(
        groups = dataframe.height(),
        rows = cleaned.height(),
        "summarized cleaned rows"
    );
    Ok(SummaryTable { dataframe })
}
