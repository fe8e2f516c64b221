pub mod list;

pub use list::{CounterView, ListCountersError, ListCountersQuery};
