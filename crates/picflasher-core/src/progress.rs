//! Progress reporting for long-running operations
//!
//! Operations report an integer percentage per [`Phase`]. The
//! [`PercentTracker`] helper turns positions into percentages and only
//! forwards a value when it changes, so reporters see a non-decreasing
//! sequence in `0..=100` that always ends at 100.

/// The operation a progress stream belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Block erase
    Erase,
    /// Blank check of code memory
    BlankCheck,
    /// Reading code memory
    Read,
    /// Programming code memory
    Program,
    /// Verifying code memory
    Verify,
    /// Reading data EEPROM
    EepromRead,
    /// Writing data EEPROM
    EepromWrite,
}

impl Phase {
    /// Short human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Self::Erase => "Erasing",
            Self::BlankCheck => "Blank check",
            Self::Read => "Reading",
            Self::Program => "Programming",
            Self::Verify => "Verifying",
            Self::EepromRead => "Reading EEPROM",
            Self::EepromWrite => "Writing EEPROM",
        }
    }
}

/// Callback for progress reporting
pub trait Progress {
    /// Called when a phase begins
    fn start(&mut self, phase: Phase);

    /// Called when the percentage of the current phase changes
    fn update(&mut self, percent: u8);

    /// Called when the current phase ends (successfully or not)
    fn finish(&mut self);
}

/// A no-op progress reporter
pub struct NoProgress;

impl Progress for NoProgress {
    fn start(&mut self, _phase: Phase) {}
    fn update(&mut self, _percent: u8) {}
    fn finish(&mut self) {}
}

/// Converts positions into de-duplicated percentage updates
pub struct PercentTracker<'p> {
    progress: &'p mut dyn Progress,
    total: u32,
    last: u8,
}

impl<'p> PercentTracker<'p> {
    /// Start `phase` on `progress`, reporting 0%
    ///
    /// `total` is the position that corresponds to 100%.
    pub fn start(progress: &'p mut dyn Progress, phase: Phase, total: u32) -> Self {
        progress.start(phase);
        progress.update(0);
        Self {
            progress,
            total,
            last: 0,
        }
    }

    /// Report that `position` units out of `total` are done
    pub fn advance(&mut self, position: u32) {
        let percent = if self.total == 0 {
            100
        } else {
            (position as u64 * 100 / self.total as u64).min(100) as u8
        };
        if percent > self.last {
            self.last = percent;
            self.progress.update(percent);
        }
    }

    /// Report 100% and end the phase
    pub fn complete(mut self) {
        self.advance(self.total);
        self.progress.finish();
    }

    /// End the phase early (e.g. on error) without claiming 100%
    pub fn abort(self) {
        self.progress.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    #[derive(Default)]
    struct Recorder {
        phases: Vec<Phase>,
        values: Vec<u8>,
        finished: usize,
    }

    impl Progress for Recorder {
        fn start(&mut self, phase: Phase) {
            self.phases.push(phase);
        }
        fn update(&mut self, percent: u8) {
            self.values.push(percent);
        }
        fn finish(&mut self) {
            self.finished += 1;
        }
    }

    #[test]
    fn test_tracker_deduplicates() {
        let mut rec = Recorder::default();
        let mut tracker = PercentTracker::start(&mut rec, Phase::Read, 0x8000);
        for word in 0..0x4000u32 {
            tracker.advance(word * 2);
        }
        tracker.complete();

        assert_eq!(rec.phases, [Phase::Read]);
        assert_eq!(rec.values, (0..=100).collect::<Vec<u8>>());
        assert_eq!(rec.finished, 1);
    }

    #[test]
    fn test_tracker_clamps_and_never_decreases() {
        let mut rec = Recorder::default();
        let mut tracker = PercentTracker::start(&mut rec, Phase::Erase, 10);
        tracker.advance(7);
        tracker.advance(3);
        tracker.advance(25);
        tracker.complete();

        assert_eq!(rec.values, [0, 70, 100]);
    }

    #[test]
    fn test_abort_does_not_report_completion() {
        let mut rec = Recorder::default();
        let mut tracker = PercentTracker::start(&mut rec, Phase::BlankCheck, 100);
        tracker.advance(40);
        tracker.abort();

        assert_eq!(rec.values, [0, 40]);
        assert_eq!(rec.finished, 1);
    }
}
