pub mod force_complete;
pub mod manual_assign;
pub mod purge_records;
pub mod release;
pub mod reset_counters;
pub mod reset_progress;

pub use force_complete::{ForceCompleteError, ForceCompleteResponse};
pub use manual_assign::{ManualAssignCommand, ManualAssignError, ManualAssignResponse};
pub use purge_records::{PurgeRecordsError, PurgeRecordsResponse};
pub use release::{ReleaseError, ReleaseResponse};
pub use reset_counters::{ResetCountersError, ResetCountersResponse};
pub use reset_progress::{ResetProgressError, ResetProgressResponse};

use serde::{Deserialize, Serialize};

/// Body of the password-gated bulk actions.
#[derive(Clone, Serialize, Deserialize)]
pub struct PasswordCommand {
    pub password: String,
}

impl std::fmt::Debug for PasswordCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordCommand")
            .field("password", &"<redacted>")
            .finish()
    }
}
