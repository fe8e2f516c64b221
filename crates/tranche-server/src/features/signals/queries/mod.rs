pub mod list;

pub use list::{ListSignalsError, ListSignalsQuery};
