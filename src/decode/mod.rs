pub mod action;
pub mod reader;
pub mod value;

pub use action::{extract_action, ActionRecord, SchemaError};
pub use reader::{decode_record, RecordDecodeError};
pub use value::Value;
