use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VisualizeError};
use crate::Dataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Line,
    Scatter,
    Bar,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Line => "line",
            ChartType::Scatter => "scatter",
            ChartType::Bar => "bar",
        }
    }

    /// Sentence-case label used at the start of chart titles.
    pub fn label(&self) -> &'static str {
        match self {
            ChartType::Line => "Line chart",
            ChartType::Scatter => "Scatter plot",
            ChartType::Bar => "Bar chart",
        }
    }

    pub fn allows_multiple_attributes(&self) -> bool {
        matches!(self, ChartType::Scatter)
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "line" | "line chart" => Ok(ChartType::Line),
            "scatter" | "scatter plot" => Ok(ChartType::Scatter),
            "bar" | "bar chart" => Ok(ChartType::Bar),
            other => Err(format!("unknown chart type '{other}'")),
        }
    }
}

/// What the caller asked to plot: a chart shape, the time axis column and the
/// value attributes. Built once per request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSpec {
    pub chart_type: ChartType,
    pub timestamp_column: String,
    pub attributes: Vec<String>,
}

impl SelectionSpec {
    pub fn new(
        chart_type: ChartType,
        timestamp_column: impl Into<String>,
        attributes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            chart_type,
            timestamp_column: timestamp_column.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    /// Columns that make up the aggregation key: the timestamp followed by the
    /// attributes in selection order.
    pub fn key_columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.timestamp_column.as_str())
            .chain(self.attributes.iter().map(String::as_str))
    }

    /// Line and Bar charts plot exactly one attribute; Scatter takes one or more.
    pub fn check_arity(&self) -> Result<()> {
        let found = self.attributes.len();
        let valid = if self.chart_type.allows_multiple_attributes() {
            found >= 1
        } else {
            found == 1
        };
        if valid {
            return Ok(());
        }
        Err(VisualizeError::SelectionArity {
            chart: self.chart_type,
            expected: if self.chart_type.allows_multiple_attributes() {
                "one or more"
            } else {
                "exactly one"
            },
            found,
        })
    }

    /// Every referenced column must exist, be selected once and hold at least
    /// one non-missing value.
    pub fn check_against(&self, dataset: &Dataset) -> Result<()> {
        let mut seen: Vec<&str> = Vec::new();
        for column in self.key_columns() {
            if seen.contains(&column) {
                return Err(VisualizeError::DuplicateSelection {
                    column: column.to_string(),
                });
            }
            seen.push(column);
        }

        if let Some(column) = self.key_columns().find(|column| !dataset.has_column(column)) {
            return Err(VisualizeError::SchemaMismatch {
                column: column.to_string(),
            });
        }

        for column in self.key_columns() {
            let values = dataset.column(column).unwrap_or_default();
            if values.iter().all(|value| value.is_missing()) {
                return Err(VisualizeError::EmptyColumn {
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}
