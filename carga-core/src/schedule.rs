use std::time::Duration;

use crate::config::Stage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSnapshot {
    pub index: usize,
    pub count: usize,
    pub stage_elapsed: Duration,
    pub stage_remaining: Duration,
    pub start_target: u64,
    pub end_target: u64,
    pub current_target: u64,
}

/// Piecewise-linear VU target over a list of stages.
#[derive(Debug, Clone)]
pub struct RampingSchedule {
    start: u64,
    stages: Vec<Stage>,
    cumulative_ends: Vec<Duration>,
}

struct StageWindow {
    index: usize,
    start: Duration,
    end: Duration,
    start_target: u64,
    end_target: u64,
}

impl RampingSchedule {
    pub fn new(start: u64, stages: Vec<Stage>) -> Self {
        let cumulative_ends = stages
            .iter()
            .scan(Duration::ZERO, |acc, st| {
                *acc = acc.saturating_add(st.duration);
                Some(*acc)
            })
            .collect();

        Self {
            start,
            stages,
            cumulative_ends,
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.cumulative_ends.last().copied().unwrap_or_default()
    }

    pub fn is_done(&self, elapsed: Duration) -> bool {
        elapsed >= self.total_duration()
    }

    /// Stage containing `elapsed`; the last stage once the schedule is over.
    fn window_at(&self, elapsed: Duration) -> Option<StageWindow> {
        if self.stages.is_empty() {
            return None;
        }

        let index = self
            .cumulative_ends
            .partition_point(|end| *end < elapsed)
            .min(self.stages.len() - 1);

        let start = index
            .checked_sub(1)
            .map_or(Duration::ZERO, |prev| self.cumulative_ends[prev]);
        let start_target = index
            .checked_sub(1)
            .map_or(self.start, |prev| self.stages[prev].target);

        Some(StageWindow {
            index,
            start,
            end: self.cumulative_ends[index],
            start_target,
            end_target: self.stages[index].target,
        })
    }

    pub fn target_at(&self, elapsed: Duration) -> u64 {
        if elapsed.is_zero() {
            return self.start;
        }
        let Some(w) = self.window_at(elapsed) else {
            return self.start;
        };
        if elapsed >= w.end {
            return w.end_target;
        }

        let span = w.end.saturating_sub(w.start).as_nanos() as i128;
        if span == 0 {
            return w.end_target;
        }

        let from = w.start_target as i128;
        let delta = w.end_target as i128 - from;
        let progressed = elapsed.saturating_sub(w.start).as_nanos() as i128;

        // Truncates toward `from`, so a ramp reaches `n` only once it is fully there.
        let cur = from + delta.saturating_mul(progressed) / span;
        cur.clamp(0, u64::MAX as i128) as u64
    }

    pub fn stage_snapshot_at(&self, elapsed: Duration) -> Option<StageSnapshot> {
        let clamped = elapsed.min(self.total_duration());
        let w = self.window_at(clamped)?;

        let stage_elapsed = clamped.saturating_sub(w.start);
        let stage_remaining = w.end.saturating_sub(w.start).saturating_sub(stage_elapsed);

        Some(StageSnapshot {
            index: w.index,
            count: self.stages.len(),
            stage_elapsed,
            stage_remaining,
            start_target: w.start_target,
            end_target: w.end_target,
            current_target: self.target_at(clamped),
        })
    }

    /// How long an idle VU (1-based `vu_index`) should wait before looking at the target again.
    pub fn next_recheck_in(&self, elapsed: Duration, vu_index: u64) -> Duration {
        let max_sleep = Duration::from_millis(50);

        let Some(w) = self.window_at(elapsed) else {
            return max_sleep;
        };
        if self.is_done(elapsed) {
            return Duration::ZERO;
        }
        if vu_index <= self.target_at(elapsed) {
            return Duration::from_millis(1);
        }

        let until_stage_end = w.end.saturating_sub(elapsed);
        if w.end_target <= w.start_target || vu_index > w.end_target {
            return until_stage_end.min(max_sleep);
        }

        // Solve start + (end - start) * t / span >= vu_index for t.
        let span = w.end.saturating_sub(w.start).as_nanos() as i128;
        let delta = (w.end_target - w.start_target) as i128;
        let need = (vu_index as i128 - w.start_target as i128).max(0);
        let at_ns = need.saturating_mul(span) / delta;
        let progressed = elapsed.saturating_sub(w.start).as_nanos() as i128;
        let wait_ns = (at_ns - progressed).clamp(0, u64::MAX as i128) as u64;

        Duration::from_nanos(wait_ns).min(max_sleep)
    }
}
