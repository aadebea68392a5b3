use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// How far a scenario has come.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    /// Bounded by wall-clock time.
    Elapsed { elapsed: Duration, total: Duration },
    /// Bounded by a shared iteration budget.
    Iterations { done: u64, total: u64 },
    Unbounded,
}

impl Position {
    fn style(&self) -> Style {
        match self {
            Self::Elapsed { .. } => Style::Time,
            Self::Iterations { .. } => Style::Count,
            Self::Unbounded => Style::Spinner,
        }
    }

    /// `(position, length)` for bounded progress.
    fn bounds(&self) -> Option<(u64, u64)> {
        match *self {
            Self::Elapsed { elapsed, total } => {
                let total = u64::try_from(total.as_millis()).unwrap_or(u64::MAX);
                let elapsed = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                Some((elapsed.min(total), total))
            }
            Self::Iterations { done, total } => Some((done.min(total), total)),
            Self::Unbounded => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Time,
    Count,
    Spinner,
}

impl Style {
    fn new_bar(self, multi: &MultiProgress, prefix: &str) -> ProgressBar {
        let (pb, template) = match self {
            Self::Time => (
                ProgressBar::new(0),
                "{prefix} [ {bar:20.cyan/blue} ] {percent:>3}% {msg}",
            ),
            Self::Count => (
                ProgressBar::new(0),
                "{prefix} [ {bar:20.green/blue} ] {pos}/{len} {msg}",
            ),
            Self::Spinner => (ProgressBar::new_spinner(), "{prefix} {spinner} {msg}"),
        };

        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█░");
        let pb = multi.add(pb);
        pb.set_style(style);
        pb.set_prefix(prefix.to_string());
        if self == Self::Spinner {
            pb.enable_steady_tick(Duration::from_millis(120));
        }
        pb
    }
}

/// Live per-scenario bars on stderr.
pub(crate) struct HumanProgress {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl HumanProgress {
    pub(crate) fn new() -> Self {
        let multi = MultiProgress::new();
        multi.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn update(&self, scenario: &str, position: Position, message: String) {
        let mut bars = self
            .bars
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // The first update picks the bar kind for the scenario.
        let pb = bars
            .entry(scenario.to_string())
            .or_insert_with(|| position.style().new_bar(&self.multi, scenario));

        pb.set_message(message);
        match position.bounds() {
            Some((pos, len)) => {
                pb.set_length(len);
                pb.set_position(pos);
            }
            None => pb.tick(),
        }
    }

    pub(crate) fn finish(&self) {
        let mut bars = self
            .bars
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (_, pb) in bars.drain() {
            pb.finish_and_clear();
        }
        let _ = self.multi.clear();
    }
}
