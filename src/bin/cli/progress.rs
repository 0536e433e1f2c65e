//! Progress display for CLI operations.

use indicatif::{ProgressBar, ProgressStyle};
use vocabvault::progress::ProgressReporter;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} entries {wide_msg}";

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Entry-level progress bar driven by [`ProgressReporter`] callbacks
pub struct CliProgress {
    bar: ProgressBar,
    quiet: bool,
}

impl CliProgress {
    /// Creates a hidden bar when `quiet` is set
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(0);
            pb.set_style(bar_style());
            pb
        };
        Self { bar, quiet }
    }

    /// Finishes the progress display
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Finishes with a custom message
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.bar.abandon_with_message(msg.into());
    }
}

impl ProgressReporter for CliProgress {
    fn on_total(&mut self, total_entries: usize) {
        self.bar.set_length(total_entries as u64);
    }

    fn on_entry_start(&mut self, entry_name: &str, _size: u64) {
        if self.quiet {
            return;
        }
        // Truncate long names
        let display_name = if entry_name.chars().count() > 40 {
            let tail: String = entry_name
                .chars()
                .rev()
                .take(37)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("...{}", tail)
        } else {
            entry_name.to_string()
        };
        self.bar.set_message(display_name);
    }

    fn on_entry_complete(&mut self, _entry_name: &str, _success: bool) {
        self.bar.inc(1);
    }

    fn on_warning(&mut self, message: &str) {
        if !self.quiet {
            self.bar.println(format!("warning: {}", message));
        }
    }
}

/// Spinner for a single indeterminate operation
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    /// Starts a spinner showing `message`
    pub fn start(message: &str, quiet: bool) -> Self {
        if quiet {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { bar }
    }

    /// Stops and removes the spinner
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
