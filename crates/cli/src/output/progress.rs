//! Progress bar for transfer operations
//!
//! Wraps an indicatif bar and feeds it from the transfer engine's progress
//! callbacks. In quiet, JSON or no-progress mode nothing is drawn.

use std::path::Path;

use indicatif::ProgressStyle;
use swc_core::{Error, ListingEntry, TransferProgress, UploadOutcome};

use super::OutputConfig;

const BYTES_TEMPLATE: &str =
    "{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {pos} {msg}";

/// Progress bar wrapper
#[derive(Debug)]
pub struct ProgressBar {
    bar: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Byte progress for uploads; the length is set per file
    pub fn bytes(config: &OutputConfig) -> Self {
        Self::build(config, || {
            let bar = indicatif::ProgressBar::new(0);
            if let Ok(style) = ProgressStyle::with_template(BYTES_TEMPLATE) {
                bar.set_style(style.progress_chars("#>-"));
            }
            bar
        })
    }

    /// Item counter for downloads and deletes
    pub fn spinner(config: &OutputConfig, message: &str) -> Self {
        Self::build(config, || {
            let bar = indicatif::ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template(SPINNER_TEMPLATE) {
                bar.set_style(style);
            }
            bar.set_message(message.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(100));
            bar
        })
    }

    fn build(config: &OutputConfig, make: impl FnOnce() -> indicatif::ProgressBar) -> Self {
        let bar = if config.quiet || config.json || config.no_progress {
            None
        } else {
            Some(make())
        };
        Self { bar }
    }

    /// Finish and clear the progress bar
    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    /// Check if progress bar is visible
    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    fn println(&self, message: String) {
        if let Some(bar) = &self.bar {
            bar.println(message);
        }
    }
}

impl TransferProgress for ProgressBar {
    fn upload_started(&self, local: &Path, remote: &str, size: u64) {
        if let Some(bar) = &self.bar {
            bar.reset();
            bar.set_length(size);
            bar.set_message(format!("{} -> {remote}", local.display()));
        }
    }

    fn bytes_sent(&self, bytes: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(bytes);
        }
    }

    fn segment_failed(&self, index: usize, error: &Error) {
        self.println(format!("segment {index} failed: {error}"));
    }

    fn upload_finished(&self, outcome: &UploadOutcome) {
        if outcome.segments > 0 {
            self.println(format!(
                "{}: {} segment(s)",
                outcome.remote_name, outcome.segments
            ));
        }
    }

    fn segment_deleted(&self, container: &str, entry: &ListingEntry) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("{container}/{}", entry.name));
        }
    }

    fn object_deleted(&self, bucket: &str, name: &str) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
            bar.set_message(format!("{bucket}/{name}"));
        }
    }

    fn object_downloaded(&self, _bucket: &str, name: &str, _target: &Path, _bytes: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
            bar.set_message(name.to_string());
        }
    }
}
