use chronochat_core::cleaning::{build_frame, clean_rows};
use chronochat_core::coercion::coerce_column;
use chronochat_core::timestamp::normalize_timestamps;
use chronochat_core::{ChartType, SelectionSpec, VisualizeError};
use chronochat_parser::parse_dataset;
use polars::prelude::DataType;

const CSV: &str = "_id,timestamp,status,remote_resource\n\
                   1,1700000000,4,\n\
                   2,1700000060,x,group\n\
                   3,,5,\n\
                   4,1700000120,13,group\n";

fn frame_for(selection: &SelectionSpec) -> polars::prelude::DataFrame {
    let dataset = parse_dataset(CSV).expect("parse failed");
    let timestamps = normalize_timestamps(&dataset, &selection.timestamp_column).expect("timestamps");
    let attributes: Vec<_> = selection
        .attributes
        .iter()
        .map(|attr| (attr.clone(), coerce_column(&dataset, attr).expect("coerce")))
        .collect();
    build_frame(&dataset, &timestamps, &attributes).expect("frame")
}

#[test]
fn frame_types_selected_columns() {
    let selection = SelectionSpec::new(ChartType::Line, "timestamp", ["status"]);
    let frame = frame_for(&selection);

    assert_eq!(frame.height(), 4);
    assert!(matches!(
        frame.column("timestamp").expect("timestamp").dtype(),
        DataType::Datetime(_, Some(_))
    ));
    assert_eq!(frame.column("status").expect("status").dtype(), &DataType::Float64);
    assert_eq!(frame.column("_id").expect("_id").dtype(), &DataType::String);
    assert_eq!(frame.column("status").expect("status").null_count(), 1);
}

#[test]
fn removes_rows_missing_selected_values_only() {
    let selection = SelectionSpec::new(ChartType::Line, "timestamp", ["status"]);
    let cleaned = clean_rows(frame_for(&selection), &selection).expect("clean failed");

    assert_eq!(cleaned.height(), 2);
    let ids: Vec<Option<&str>> = cleaned
        .dataframe()
        .column("_id")
        .expect("_id")
        .str()
        .expect("string ids")
        .into_iter()
        .collect();
    assert_eq!(ids, vec![Some("1"), Some("4")]);
    // Unselected columns may still hold nulls.
    assert_eq!(
        cleaned
            .dataframe()
            .column("remote_resource")
            .expect("remote_resource")
            .null_count(),
        1
    );
}

#[test]
fn cleaning_is_idempotent() {
    let selection = SelectionSpec::new(ChartType::Line, "timestamp", ["status"]);
    let once = clean_rows(frame_for(&selection), &selection).expect("first clean");
    let twice = clean_rows(once.dataframe().clone(), &selection).expect("second clean");

    assert!(once.dataframe().equals_missing(twice.dataframe()));
}

#[test]
fn nothing_left_is_an_empty_result() {
    let dataset = parse_dataset("timestamp,status\nsoon,x\nlater,y\n").expect("parse failed");
    let selection = SelectionSpec::new(ChartType::Line, "timestamp", ["status"]);
    let timestamps = normalize_timestamps(&dataset, "timestamp").expect("timestamps");
    let status = coerce_column(&dataset, "status").expect("coerce");
    let frame = build_frame(&dataset, &timestamps, &[("status".to_string(), status)]).expect("frame");

    let err = clean_rows(frame, &selection).expect_err("no complete rows");
    assert!(matches!(err, VisualizeError::EmptyResult));
}
