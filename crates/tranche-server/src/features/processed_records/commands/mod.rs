pub mod write;

pub use write::{WriteRecordCommand, WriteRecordError, WriteRecordResponse};
