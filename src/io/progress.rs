//! Console progress reporting for simulation runs

use std::sync::LazyLock;

use indicatif::{ProgressBar, ProgressStyle};

use crate::io::configuration::PROGRESS_BASIS_POINTS;

static SIMULATION_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {percent:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Progress bar over the frozen share of a simulation path
///
/// Positions are tracked in hundredths of a percent so the path's clamped
/// ceiling stays representable; the bar only fills completely through
/// `finish`.
pub struct SimulationProgress {
    bar: ProgressBar,
}

impl SimulationProgress {
    /// Create a bar labeled with the run or level name
    pub fn new(label: impl Into<String>) -> Self {
        let bar = ProgressBar::new(PROGRESS_BASIS_POINTS);
        bar.set_style(SIMULATION_STYLE.clone());
        bar.set_message(label.into());
        Self { bar }
    }

    /// Move the bar to a percentage
    pub fn update(&self, percent: f64) {
        let position = (percent * 100.0).round().clamp(0.0, PROGRESS_BASIS_POINTS as f64);
        self.bar.set_position(position as u64);
    }

    /// Complete the bar
    pub fn finish(&self) {
        self.bar.finish();
    }

    /// Leave a terminal marker for an aborted run
    pub fn fail(&self) {
        self.bar.abandon_with_message("failed");
    }
}
