pub mod errors;
pub mod model;
mod reader;

pub use errors::ParserError;
pub use model::{Dataset, RawRecord, RawValue};
pub use reader::{parse_dataset, read_dataset};
