//! Wall-clock accounting for the assembly and linear-solve phases.
//!
//! Collection is compiled in only with the `timing` feature. Without it every
//! hook passes straight through and the final report is empty.

use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Assembly,
    LinearSolve,
}

/// Accumulated durations of one phase.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhaseTotals {
    pub count: usize,
    pub total: Duration,
    pub longest: Duration,
}

impl PhaseTotals {
    #[cfg_attr(not(feature = "timing"), allow(dead_code))]
    fn add(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.longest = self.longest.max(elapsed);
    }

    pub fn mean(&self) -> Duration {
        match u32::try_from(self.count) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total / n,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimingStats {
    pub assembly: PhaseTotals,
    pub linear_solve: PhaseTotals,
    pub wall: Duration,
}

impl TimingStats {
    #[cfg_attr(not(feature = "timing"), allow(dead_code))]
    fn totals_mut(&mut self, phase: Phase) -> &mut PhaseTotals {
        match phase {
            Phase::Assembly => &mut self.assembly,
            Phase::LinearSolve => &mut self.linear_solve,
        }
    }

    /// Wall time spent outside the recorded phases.
    pub fn other(&self) -> Duration {
        self.wall
            .saturating_sub(self.assembly.total + self.linear_solve.total)
    }

    /// Info-level breakdown; silent when nothing was recorded.
    pub fn log(&self) {
        if self.assembly.count + self.linear_solve.count == 0 {
            return;
        }
        log::info!("timing: {:.3} s wall", self.wall.as_secs_f64());
        for (name, totals) in [("assembly", &self.assembly), ("linear solve", &self.linear_solve)] {
            log::info!(
                "  {name:<13} {:>6} calls, total {:>10.3} ms, mean {:>8.3} ms, max {:>8.3} ms",
                totals.count,
                totals.total.as_secs_f64() * 1e3,
                totals.mean().as_secs_f64() * 1e3,
                totals.longest.as_secs_f64() * 1e3
            );
        }
        log::info!("  other {:>34.3} ms", self.other().as_secs_f64() * 1e3);
    }
}

#[cfg(feature = "timing")]
mod collect {
    use std::cell::RefCell;
    use std::time::{Duration, Instant};

    use super::{Phase, TimingStats};

    thread_local! {
        static STATS: RefCell<TimingStats> = RefCell::new(TimingStats::default());
    }

    pub fn reset() {
        STATS.with(|stats| *stats.borrow_mut() = TimingStats::default());
    }

    pub fn time<R>(phase: Phase, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        STATS.with(|stats| stats.borrow_mut().totals_mut(phase).add(elapsed));
        result
    }

    pub fn finish(wall: Duration) -> TimingStats {
        STATS.with(|stats| {
            let mut stats = stats.borrow_mut();
            stats.wall = wall;
            stats.clone()
        })
    }
}

#[cfg(not(feature = "timing"))]
mod collect {
    use std::time::Duration;

    use super::{Phase, TimingStats};

    pub fn reset() {}

    pub fn time<R>(_phase: Phase, f: impl FnOnce() -> R) -> R {
        f()
    }

    pub fn finish(wall: Duration) -> TimingStats {
        TimingStats {
            wall,
            ..TimingStats::default()
        }
    }
}

pub fn reset_timing() {
    collect::reset();
}

pub fn record_assembly<R>(f: impl FnOnce() -> R) -> R {
    collect::time(Phase::Assembly, f)
}

pub fn record_linear_solve<R>(f: impl FnOnce() -> R) -> R {
    collect::time(Phase::LinearSolve, f)
}

pub fn finalize_timing(wall: Duration) -> TimingStats {
    collect::finish(wall)
}

pub fn finalize_and_log(wall: Duration) {
    finalize_timing(wall).log();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_totals_track_mean_and_longest() {
        let mut totals = PhaseTotals::default();
        assert_eq!(totals.mean(), Duration::ZERO);
        totals.add(Duration::from_millis(2));
        totals.add(Duration::from_millis(6));
        assert_eq!(totals.count, 2);
        assert_eq!(totals.mean(), Duration::from_millis(4));
        assert_eq!(totals.longest, Duration::from_millis(6));
    }

    #[test]
    fn other_excludes_recorded_phases() {
        let mut stats = TimingStats {
            wall: Duration::from_millis(10),
            ..TimingStats::default()
        };
        stats.totals_mut(Phase::Assembly).add(Duration::from_millis(3));
        stats.totals_mut(Phase::LinearSolve).add(Duration::from_millis(5));
        assert_eq!(stats.other(), Duration::from_millis(2));
        stats.log();
    }

    #[cfg(feature = "timing")]
    #[test]
    fn hooks_collect_per_thread() {
        reset_timing();
        assert_eq!(record_assembly(|| 2 + 2), 4);
        record_linear_solve(|| ());
        record_linear_solve(|| ());
        let stats = finalize_timing(Duration::from_millis(1));
        assert_eq!(stats.assembly.count, 1);
        assert_eq!(stats.linear_solve.count, 2);
    }

    #[cfg(not(feature = "timing"))]
    #[test]
    fn hooks_pass_through_without_the_feature() {
        reset_timing();
        assert_eq!(record_linear_solve(|| 7), 7);
        let stats = finalize_timing(Duration::from_millis(1));
        assert_eq!(stats.linear_solve.count, 0);
        assert_eq!(stats.wall, Duration::from_millis(1));
    }
}
