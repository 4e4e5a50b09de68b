//! Progress bars for engine operations

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use picflasher_core::progress::{Phase, Progress};

/// Progress reporter using indicatif progress bars, one bar per phase
#[derive(Default)]
pub struct IndicatifProgress {
    multi: MultiProgress,
    current_bar: Option<ProgressBar>,
}

impl Progress for IndicatifProgress {
    fn start(&mut self, phase: Phase) {
        self.finish();
        let pb = self.multi.add(ProgressBar::new(100));
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos:>3}}% {} {{msg}}",
                    phase.label()
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.current_bar = Some(pb);
    }

    fn update(&mut self, percent: u8) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(percent as u64);
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            if pb.position() >= 100 {
                pb.finish_with_message("done");
            } else {
                pb.abandon_with_message("aborted");
            }
        }
    }
}
