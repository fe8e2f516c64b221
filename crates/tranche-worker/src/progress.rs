//! Progress reporting for batch operations

use indicatif::{ProgressBar, ProgressStyle};

/// Receives progress of a batch of `total` items.
pub trait ProgressReporter: Send + Sync {
    fn start(&self, total: u64, message: &str);
    fn advance(&self, delta: u64);
    fn finish(&self, message: &str);
}

impl ProgressReporter for ProgressBar {
    fn start(&self, total: u64, message: &str) {
        self.set_length(total);
        self.set_position(0);
        self.set_message(message.to_string());
    }

    fn advance(&self, delta: u64) {
        self.inc(delta);
    }

    fn finish(&self, message: &str) {
        self.finish_with_message(message.to_string());
    }
}

/// Reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start(&self, _total: u64, _message: &str) {}
    fn advance(&self, _delta: u64) {}
    fn finish(&self, _message: &str) {}
}

/// Create a progress bar counting records
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_reports_fraction() {
        let pb = ProgressBar::hidden();
        pb.start(4, "Syncing");
        pb.advance(1);
        pb.advance(2);
        assert_eq!(pb.position(), 3);
        assert_eq!(pb.length(), Some(4));
        ProgressReporter::finish(&pb, "done");
        assert!(pb.is_finished());
    }

    #[test]
    fn test_create_progress_bar() {
        let pb = create_progress_bar(100, "Uploading");
        assert_eq!(pb.length(), Some(100));
    }
}
