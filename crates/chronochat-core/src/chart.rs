use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregation::{summarize, COUNT_COLUMN};
use crate::cleaning::CleanedDataset;
use crate::display_names::{display_name, join_display_names};
use crate::error::Result;
use crate::selection::{ChartType, SelectionSpec};

const LEGEND_TITLE: &str = "Attribute";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesMode {
    LinesMarkers,
    Markers,
    Bars,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub symbol: String,
    pub size: f64,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Hover/display text for the point, when the chart shows one.
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub mode: SeriesMode,
    /// 1-based legend position; `None` leaves ordering to the renderer.
    pub legend_rank: Option<usize>,
    pub marker: Option<MarkerStyle>,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendOrientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendLayout {
    pub title: String,
    pub orientation: LegendOrientation,
    /// Anchor position in paper coordinates (0..1 spans the plot area).
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub x_anchor: Option<String>,
    pub y_anchor: Option<String>,
    pub border_color: Option<String>,
    pub border_width: Option<f64>,
}

impl LegendLayout {
    fn boxed_vertical() -> Self {
        Self {
            title: LEGEND_TITLE.to_string(),
            orientation: LegendOrientation::Vertical,
            x: Some(1.15),
            y: Some(0.95),
            x_anchor: Some("center".to_string()),
            y_anchor: Some("middle".to_string()),
            border_color: Some("pink".to_string()),
            border_width: Some(1.5),
        }
    }

    fn horizontal() -> Self {
        Self {
            title: LEGEND_TITLE.to_string(),
            orientation: LegendOrientation::Horizontal,
            x: None,
            y: None,
            x_anchor: None,
            y_anchor: None,
            border_color: None,
            border_width: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartLayout {
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
    pub legend: LegendLayout,
}

/// Declarative description of a chart, handed to whatever renders pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDescription {
    pub chart_type: ChartType,
    pub series: Vec<ChartSeries>,
    pub layout: ChartLayout,
}

impl ChartDescription {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(|series| series.points.len()).sum()
    }

    /// Earliest and latest timestamp over all series.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let mut timestamps = self
            .series
            .iter()
            .flat_map(|series| series.points.iter().map(|point| point.timestamp));
        let first = timestamps.next()?;
        Some(timestamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts))))
    }

    /// Smallest and largest value over all series.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut values = self
            .series
            .iter()
            .flat_map(|series| series.points.iter().map(|point| point.value));
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

/// Formats a plotted value the way it was written in the upload: whole numbers
/// without a trailing `.0`.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Builds the series and layout for the selected chart type.
pub fn build_chart(cleaned: &CleanedDataset, selection: &SelectionSpec) -> Result<ChartDescription> {
    selection.check_arity()?;

    let series = match selection.chart_type {
        ChartType::Line => line_series(cleaned, selection)?,
        ChartType::Scatter => scatter_series(cleaned, selection)?,
        ChartType::Bar => bar_series(cleaned, selection)?,
    };

    let attributes = join_display_names(selection.attributes.iter().map(String::as_str));
    let x_axis_title = display_name(&selection.timestamp_column).to_string();
    let layout = ChartLayout {
        title: format!(
            "{} of {attributes} over {x_axis_title}",
            selection.chart_type.label()
        ),
        x_axis_title,
        y_axis_title: attributes,
        legend: match selection.chart_type {
            ChartType::Bar => LegendLayout::horizontal(),
            ChartType::Line | ChartType::Scatter => LegendLayout::boxed_vertical(),
        },
    };

    let chart = ChartDescription {
        chart_type: selection.chart_type,
        series,
        layout,
    };
    debug!(
        chart = selection.chart_type.as_str(),
        series = chart.series.len(),
        points = chart.point_count(),
        "built chart description"
    );
    Ok(chart)
}

fn line_series(cleaned: &CleanedDataset, selection: &SelectionSpec) -> Result<Vec<ChartSeries>> {
    let frame = cleaned.dataframe();
    let timestamps = datetime_values(frame, &selection.timestamp_column)?;

    let mut series = Vec::with_capacity(selection.attributes.len());
    for (idx, attribute) in selection.attributes.iter().enumerate() {
        let values = float_values(frame, attribute)?;
        let mut points: Vec<ChartPoint> = timestamps
            .iter()
            .zip(values)
            .filter_map(|(ts, value)| {
                Some(ChartPoint {
                    timestamp: (*ts)?,
                    value: value?,
                    text: None,
                })
            })
            .collect();
        points.sort_by_key(|point| point.timestamp);

        series.push(ChartSeries {
            name: attribute.clone(),
            mode: SeriesMode::LinesMarkers,
            legend_rank: Some(idx + 1),
            marker: Some(MarkerStyle {
                symbol: "circle".to_string(),
                size: 5.0,
                color: Some("blue".to_string()),
            }),
            points,
        });
    }
    Ok(series)
}

fn scatter_series(
    cleaned: &CleanedDataset,
    selection: &SelectionSpec,
) -> Result<Vec<ChartSeries>> {
    let frame = cleaned.dataframe();
    let timestamps = datetime_values(frame, &selection.timestamp_column)?;

    let mut series = Vec::with_capacity(selection.attributes.len());
    for attribute in &selection.attributes {
        let values = float_values(frame, attribute)?;
        let points = timestamps
            .iter()
            .zip(values)
            .filter_map(|(ts, value)| {
                let value = value?;
                Some(ChartPoint {
                    timestamp: (*ts)?,
                    value,
                    text: Some(format_value(value)),
                })
            })
            .collect();

        series.push(ChartSeries {
            name: attribute.clone(),
            mode: SeriesMode::Markers,
            legend_rank: None,
            marker: None,
            points,
        });
    }
    Ok(series)
}

/// One bar series per distinct attribute value, plotting occurrence counts.
fn bar_series(cleaned: &CleanedDataset, selection: &SelectionSpec) -> Result<Vec<ChartSeries>> {
    let summary = summarize(cleaned, selection)?;
    let frame = summary.dataframe();
    let attribute = &selection.attributes[0];

    let timestamps = datetime_values(frame, &selection.timestamp_column)?;
    let categories = float_values(frame, attribute)?;
    let counts = frame.column(COUNT_COLUMN)?.i64()?;

    let mut series: Vec<(u64, ChartSeries)> = Vec::new();
    for (idx, (ts, category)) in timestamps.iter().zip(categories).enumerate() {
        let (Some(ts), Some(category), Some(count)) = (*ts, category, counts.get(idx)) else {
            continue;
        };

        let key = category.to_bits();
        let position = match series.iter().position(|(existing, _)| *existing == key) {
            Some(position) => position,
            None => {
                series.push((
                    key,
                    ChartSeries {
                        name: format!("{LEGEND_TITLE}: {}", format_value(category)),
                        mode: SeriesMode::Bars,
                        legend_rank: None,
                        marker: None,
                        points: Vec::new(),
                    },
                ));
                series.len() - 1
            }
        };
        series[position].1.points.push(ChartPoint {
            timestamp: ts,
            value: count as f64,
            text: None,
        });
    }

    Ok(series.into_iter().map(|(_, series)| series).collect())
}

fn datetime_values(frame: &DataFrame, column: &str) -> Result<Vec<Option<DateTime<Utc>>>> {
    let values = frame.column(column)?.datetime()?;
    Ok((0..frame.height())
        .map(|idx| values.get(idx).and_then(DateTime::<Utc>::from_timestamp_micros))
        .collect())
}

fn float_values(frame: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let values = frame.column(column)?.f64()?;
    Ok((0..frame.height()).map(|idx| values.get(idx)).collect())
}
