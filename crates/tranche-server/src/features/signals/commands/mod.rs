pub mod acknowledge;

pub use acknowledge::{AcknowledgeSignalCommand, AcknowledgeSignalError, AcknowledgeSignalResponse};
