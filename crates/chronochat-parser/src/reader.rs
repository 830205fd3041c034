use std::io::Read;

use csv::{ReaderBuilder, Trim};
use tracing::debug;

use crate::errors::ParserError;
use crate::model::{Dataset, RawRecord, RawValue};

/// Reads a headered CSV upload into a [`Dataset`], typing each cell on its own.
///
/// A header with no data rows is a valid, empty dataset; deciding whether an
/// empty table is acceptable is left to the caller.
pub fn read_dataset<R: Read>(reader: R) -> Result<Dataset, ParserError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(ParserError::MissingHeader);
    }
    let columns: Vec<String> = headers.iter().map(str::to_string).collect();
    let mut dataset = Dataset::new(columns.clone())?;

    for row in csv_reader.records() {
        let row = row?;
        let record = columns
            .iter()
            .zip(row.iter())
            .fold(RawRecord::new(), |record, (column, cell)| {
                record.with(column.clone(), RawValue::infer(cell))
            });
        dataset.push(record)?;
    }

    debug!(
        columns = dataset.columns().len(),
        rows = dataset.height(),
        "parsed uploaded table"
    );
    Ok(dataset)
}

pub fn parse_dataset(content: &str) -> Result<Dataset, ParserError> {
    read_dataset(content.as_bytes())
}
