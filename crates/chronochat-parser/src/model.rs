use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::errors::ParserError;

/// A single untyped cell as it arrived in the uploaded table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Missing,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Types a CSV cell the way a dataframe reader would: blank and NaN-like
    /// markers are missing, integer and float literals become numbers, and
    /// everything else stays text.
    pub fn infer(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("nan")
            || trimmed.eq_ignore_ascii_case("null")
        {
            return RawValue::Missing;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return RawValue::Integer(value);
        }
        if looks_like_float(trimmed) {
            if let Ok(value) = trimmed.parse::<f64>() {
                return RawValue::Float(value);
            }
        }
        RawValue::Text(trimmed.to_string())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, RawValue::Missing)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, RawValue::Integer(_) | RawValue::Float(_))
    }

    /// Numeric view of the value without any string parsing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Integer(value) => Some(*value as f64),
            RawValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(RawValue::Missing),
            serde_json::Value::Number(number) => Some(match number.as_i64() {
                Some(int) => RawValue::Integer(int),
                None => RawValue::Float(number.as_f64()?),
            }),
            serde_json::Value::String(text) => Some(RawValue::Text(text.clone())),
            serde_json::Value::Bool(flag) => Some(RawValue::Integer(i64::from(*flag))),
            _ => None,
        }
    }
}

// Rejects strings like "inf" or "infinity" that f64::from_str accepts but no
// spreadsheet export means as a number.
fn looks_like_float(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Missing => Ok(()),
            RawValue::Integer(value) => write!(f, "{value}"),
            RawValue::Float(value) => write!(f, "{value}"),
            RawValue::Text(value) => f.write_str(value),
        }
    }
}

/// One row of the uploaded table, keyed by column name in header order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    fields: Vec<(String, RawValue)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: RawValue) -> Self {
        self.insert(column, value);
        self
    }

    /// Sets a field, replacing the value in place when the column is already present.
    pub fn insert(&mut self, column: impl Into<String>, value: RawValue) {
        let column = column.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &RawValue> {
        self.fields.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn value_at(&self, index: usize) -> &RawValue {
        &self.fields[index].1
    }
}

/// An ordered set of records that all share one column schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<RawRecord>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Result<Self, ParserError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(ParserError::DuplicateColumn {
                    column: column.clone(),
                });
            }
        }
        Ok(Self {
            columns,
            records: Vec::new(),
        })
    }

    /// Builds a dataset from records, taking the schema from the first one.
    pub fn from_records(records: Vec<RawRecord>) -> Result<Self, ParserError> {
        let columns = records
            .first()
            .map(|record| record.columns().map(str::to_string).collect())
            .unwrap_or_default();
        let mut dataset = Dataset::new(columns)?;
        for record in records {
            dataset.push(record)?;
        }
        Ok(dataset)
    }

    /// Parses a JSON array of flat objects. Keys missing from later objects are
    /// treated as missing cells so that every record keeps the first object's schema.
    pub fn from_json_records(json: &str) -> Result<Self, ParserError> {
        let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(json)?;

        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut dataset = Dataset::new(columns.clone())?;
        for (row_index, row) in rows.iter().enumerate() {
            let mut record = RawRecord::new();
            for column in &columns {
                let value = match row.get(column) {
                    None => RawValue::Missing,
                    Some(value) => {
                        RawValue::from_json(value).ok_or_else(|| ParserError::InvalidRecord {
                            row_index,
                            message: format!("column '{column}' holds a nested value"),
                        })?
                    }
                };
                record.insert(column.clone(), value);
            }
            dataset.push(record)?;
        }
        Ok(dataset)
    }

    pub fn push(&mut self, record: RawRecord) -> Result<(), ParserError> {
        let row_index = self.records.len();
        if record.len() != self.columns.len()
            || !record.columns().zip(&self.columns).all(|(a, b)| a == b)
        {
            return Err(ParserError::InvalidRecord {
                row_index,
                message: format!(
                    "columns [{}] do not match schema [{}]",
                    record.columns().collect::<Vec<_>>().join(", "),
                    self.columns.join(", ")
                ),
            });
        }
        self.records.push(record);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|name| name == column)
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn height(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Values of one column in row order, or `None` when the column is unknown.
    pub fn column(&self, column: &str) -> Option<Vec<&RawValue>> {
        let index = self.columns.iter().position(|name| name == column)?;
        Some(
            self.records
                .iter()
                .map(|record| record.value_at(index))
                .collect(),
        )
    }

    /// Picks the column the upload form would preselect as the time axis: the
    /// first whose name mentions a timestamp or a date.
    pub fn suggest_timestamp_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|name| {
                let lower = name.to_lowercase();
                lower.contains("timestamp") || lower.contains("date")
            })
            .map(String::as_str)
    }
}
