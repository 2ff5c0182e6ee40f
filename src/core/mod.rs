pub mod error;
pub mod types;
pub mod value;

pub use error::{NestError, Result};
pub use types::{Attributes, Column, RecordId};
pub use value::{DataType, Value};
