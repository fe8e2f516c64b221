pub mod clear;
pub mod put_active_bundle;
pub mod remove_active_bundle;
pub mod update_count;

pub use clear::{ClearUserStateCommand, ClearUserStateError};
pub use put_active_bundle::{PutActiveBundleCommand, PutActiveBundleError};
pub use remove_active_bundle::{RemoveActiveBundleCommand, RemoveActiveBundleError};
pub use update_count::{UpdateBundleCountCommand, UpdateBundleCountError, UpdateBundleCountResponse};
