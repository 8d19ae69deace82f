//! Completion counter driving a throttled progress bar.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use yansi::Paint;

const TEMPLATE: &str = "[PROGRESS] {prefix}: [{bar:40.green}] {percent:>3}% ({pos}/{len}) {msg}";

/// Minimum percentage gain between two redraws.
const STEP_PERCENT: usize = 5;

/// Counts finished sections for one track and decides when to redraw.
///
/// `done` counts successes only; failures still move the bar forward so it
/// reaches 100% once every section has been attempted.
pub struct Progress {
    bar: ProgressBar,
    done: usize,
    failed: usize,
    total: usize,
    last_percent: usize,
}

impl Progress {
    /// Bar drawn on stderr.
    pub fn new(label: impl Into<String>, total: usize) -> Self {
        Self::with_target(label, total, ProgressDrawTarget::stderr())
    }

    /// Counter that never draws.
    pub fn hidden(label: impl Into<String>, total: usize) -> Self {
        Self::with_target(label, total, ProgressDrawTarget::hidden())
    }

    fn with_target(label: impl Into<String>, total: usize, target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total as u64), target);
        bar.set_style(
            ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_prefix(label.into());
        Self {
            bar,
            done: 0,
            failed: 0,
            total,
            last_percent: 0,
        }
    }

    pub fn done(&self) -> usize {
        self.done
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn finished(&self) -> usize {
        self.done + self.failed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn percent(&self) -> usize {
        if self.total == 0 {
            100
        } else {
            self.finished().min(self.total) * 100 / self.total
        }
    }

    /// Position shown by the bar; only moves on a redraw.
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Text after the counts: the failure tally, if any.
    pub fn message(&self) -> String {
        if self.failed > 0 {
            format!("{}", format!("{} failed", self.failed).red())
        } else {
            String::new()
        }
    }

    /// Record one finished unit.
    ///
    /// Redraws and returns true when the percentage advanced by at least
    /// [`STEP_PERCENT`] since the last redraw, or just reached 100.
    pub fn record(&mut self, ok: bool) -> bool {
        if ok {
            self.done += 1;
        } else {
            self.failed += 1;
        }
        let percent = self.percent();
        let first_full = percent == 100 && self.last_percent < 100;
        if percent >= self.last_percent + STEP_PERCENT || first_full {
            self.last_percent = percent;
            self.bar.set_position(self.finished().min(self.total) as u64);
            self.bar.set_message(self.message());
            true
        } else {
            false
        }
    }

    /// Leave the final state of the bar on screen.
    pub fn finish(&self) {
        self.bar.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twenty_steps_render_bounded() {
        let mut p = Progress::hidden("TI", 20);
        let renders = (0..20).filter(|_| p.record(true)).count();
        assert!(renders <= 100 / STEP_PERCENT + 1, "{renders}");
        assert_eq!(p.done(), 20);
        assert_eq!(p.position(), 20);
    }

    #[test]
    fn test_small_steps_are_throttled() {
        let mut p = Progress::hidden("TI", 300);
        let renders = (0..300).filter(|_| p.record(true)).count();
        assert!(renders <= 100 / STEP_PERCENT + 1, "{renders}");
        assert!(renders >= 20);
    }

    #[test]
    fn test_position_only_moves_on_redraw() {
        let mut p = Progress::hidden("TI", 100);
        for _ in 0..4 {
            assert!(!p.record(true));
        }
        assert_eq!(p.position(), 0);
        assert!(p.record(true));
        assert_eq!(p.position(), 5);
    }

    #[test]
    fn test_hundred_always_rendered() {
        let mut p = Progress::hidden("TI", 3);
        let last = (0..3).map(|_| p.record(true)).last();
        assert_eq!(last, Some(true));
        assert_eq!(p.percent(), 100);
        assert_eq!(p.position(), 3);
    }

    #[test]
    fn test_no_repeat_render_past_total() {
        let mut p = Progress::hidden("TI", 1);
        assert!(p.record(true));
        assert!(!p.record(true));
    }

    #[test]
    fn test_failures_complete_the_bar() {
        let mut p = Progress::hidden("TI", 4);
        for ok in [true, false, true, false] {
            p.record(ok);
        }
        assert_eq!(p.done(), 2);
        assert_eq!(p.failed(), 2);
        assert_eq!(p.percent(), 100);
        assert_eq!(p.position(), 4);
        assert!(p.message().contains("2 failed"), "{}", p.message());
    }

    #[test]
    fn test_percent_zero_total() {
        assert_eq!(Progress::hidden("x", 0).percent(), 100);
    }
}
