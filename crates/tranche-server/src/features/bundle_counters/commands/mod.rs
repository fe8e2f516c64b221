pub mod allocate;
pub mod recycle;

pub use allocate::{AllocateBundleCommand, AllocateBundleError, AllocateBundleResponse};
pub use recycle::{RecycleBundleCommand, RecycleBundleError, RecycleBundleResponse};
