pub mod aggregation;
pub mod chart;
pub mod cleaning;
pub mod coercion;
pub mod config;
pub mod display_names;
pub mod error;
pub mod export;
pub mod notes;
pub mod pipeline;
pub mod selection;
pub mod timestamp;

pub use chronochat_parser::{Dataset, RawRecord, RawValue};
pub use error::{Result, VisualizeError};
pub use pipeline::{visualize, VisualizationResult};
pub use selection::{ChartType, SelectionSpec};
