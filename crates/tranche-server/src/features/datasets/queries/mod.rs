pub mod get_by_name;
pub mod list;

pub use get_by_name::{GetDatasetError, GetDatasetQuery};
pub use list::{ListDatasetsError, ListDatasetsQuery};
