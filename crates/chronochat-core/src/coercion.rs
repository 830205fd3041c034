use tracing::debug;

use crate::error::{Result, VisualizeError};
use crate::{Dataset, RawValue};

/// Outcome of coercing one cell: `Some(number)` or missing.
pub type Coerced = Option<f64>;

/// Best-effort numeric reading of a single cell. Never fails; anything that is
/// not a finite number is missing.
pub fn coerce_value(value: &RawValue) -> Coerced {
    let number = match value {
        RawValue::Missing => return None,
        RawValue::Integer(value) => *value as f64,
        RawValue::Float(value) => *value,
        RawValue::Text(text) => text.trim().parse::<f64>().ok()?,
    };
    number.is_finite().then_some(number)
}

/// Coerces a whole column, row for row.
pub fn coerce_column(dataset: &Dataset, column: &str) -> Result<Vec<Coerced>> {
    let raw = dataset
        .column(column)
        .ok_or_else(|| VisualizeError::SchemaMismatch {
            column: column.to_string(),
        })?;

    let coerced: Vec<Coerced> = raw.into_iter().map(coerce_value).collect();
    debug!(
        column,
        missing = coerced.iter().filter(|value| value.is_none()).count(),
        "coerced attribute column"
    );
    Ok(coerced)
}
