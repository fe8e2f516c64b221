pub mod summary;

pub use summary::{
    AnalyticsSummary, BundleProgress, DatasetProgress, SummaryError, SummaryQuery,
};
