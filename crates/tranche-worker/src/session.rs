//! Identity of the running worker

use serde::{Deserialize, Serialize};

/// Who is working, where, and on which dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub worker_id: String,
    pub region: String,
    pub dataset_name: String,
}

impl Session {
    pub fn new(
        worker_id: impl Into<String>,
        region: impl Into<String>,
        dataset_name: impl Into<String>,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            region: region.into(),
            dataset_name: dataset_name.into(),
        }
    }
}
