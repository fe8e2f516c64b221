pub mod get;

pub use get::{GetUserStateError, GetUserStateQuery, UserStateView};
