use chrono::{TimeZone, Utc};
use chronochat_core::chart::{LegendOrientation, SeriesMode};
use chronochat_core::{visualize, ChartType, SelectionSpec};
use chronochat_parser::parse_dataset;

const MESSAGES: &str = "timestamp,status,media_wa_type,need_push\n\
                        1700003600,5,1,0\n\
                        1700000000,4,0,0\n\
                        1700000000,4,1,2\n\
                        1700003600,13,0,0\n\
                        1700000000,5,0,0\n";

#[test]
fn line_series_are_time_ordered_and_ranked() {
    let dataset = parse_dataset(MESSAGES).expect("parse failed");
    let selection = SelectionSpec::new(ChartType::Line, "timestamp", ["need_push"]);

    let chart = visualize(&dataset, &selection).expect("visualize failed").chart;

    let series = &chart.series[0];
    assert_eq!(series.name, "need_push");
    assert_eq!(series.legend_rank, Some(1));
    assert_eq!(series.marker.as_ref().map(|marker| marker.size), Some(5.0));
    assert!(series
        .points
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    // Stable sort keeps upload order among equal timestamps.
    let values: Vec<f64> = series.points.iter().map(|point| point.value).collect();
    assert_eq!(values, vec![0.0, 2.0, 0.0, 0.0, 0.0]);

    assert_eq!(chart.layout.title, "Line chart of need_push over Date and Time");
    assert_eq!(chart.layout.x_axis_title, "Date and Time");
    assert_eq!(chart.layout.y_axis_title, "need_push");
    assert_eq!(chart.layout.legend.orientation, LegendOrientation::Vertical);
    assert_eq!(chart.layout.legend.border_color.as_deref(), Some("pink"));
}

#[test]
fn scatter_points_carry_their_values_as_text() {
    let dataset = parse_dataset(MESSAGES).expect("parse failed");
    let selection = SelectionSpec::new(ChartType::Scatter, "timestamp", ["status", "media_wa_type"]);

    let chart = visualize(&dataset, &selection).expect("visualize failed").chart;

    assert_eq!(chart.series.len(), 2);
    let status = &chart.series[0];
    assert_eq!(status.mode, SeriesMode::Markers);
    assert_eq!(status.points.len(), 5);
    assert_eq!(status.points[3].text.as_deref(), Some("13"));
    assert_eq!(chart.series[1].name, "media_wa_type");
    assert_eq!(chart.layout.y_axis_title, "Message status, Message type");
}

#[test]
fn bar_chart_counts_each_attribute_value() {
    let dataset = parse_dataset(MESSAGES).expect("parse failed");
    let selection = SelectionSpec::new(ChartType::Bar, "timestamp", ["status"]);

    let result = visualize(&dataset, &selection).expect("visualize failed");
    let chart = &result.chart;

    let names: Vec<&str> = chart.series.iter().map(|series| series.name.as_str()).collect();
    assert_eq!(names, vec!["Attribute: 4", "Attribute: 5", "Attribute: 13"]);
    assert!(chart.series.iter().all(|series| series.mode == SeriesMode::Bars));

    let early = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let late = Utc.timestamp_opt(1_700_003_600, 0).unwrap();
    let status_four = &chart.series[0];
    assert_eq!(status_four.points.len(), 1);
    assert_eq!(status_four.points[0].timestamp, early);
    assert_eq!(status_four.points[0].value, 2.0);

    let status_five: Vec<_> = chart.series[1]
        .points
        .iter()
        .map(|point| (point.timestamp, point.value))
        .collect();
    assert_eq!(status_five, vec![(early, 1.0), (late, 1.0)]);

    let plotted: f64 = chart
        .series
        .iter()
        .flat_map(|series| series.points.iter().map(|point| point.value))
        .sum();
    assert_eq!(plotted as i64, result.summary.total_count().expect("count"));
    assert_eq!(chart.layout.legend.orientation, LegendOrientation::Horizontal);
    assert_eq!(chart.layout.title, "Bar chart of Message status over Date and Time");
}

#[test]
fn chart_description_serializes_for_renderers() {
    let dataset = parse_dataset(MESSAGES).expect("parse failed");
    let selection = SelectionSpec::new(ChartType::Line, "timestamp", ["status"]);
    let chart = visualize(&dataset, &selection).expect("visualize failed").chart;

    let json: serde_json::Value =
        serde_json::from_str(&chart.to_json().expect("serialize")).expect("valid json");
    assert_eq!(json["chart_type"], "line");
    assert_eq!(json["series"][0]["mode"], "lines_markers");
    assert_eq!(json["series"][0]["points"][0]["timestamp"], "2023-11-14T22:13:20Z");
}
