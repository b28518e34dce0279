use std::time::{Duration, Instant};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Turns irregular host ticks into at most one logic tick per call.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    interval: Duration,
    last_tick: Instant,
    accumulated: Duration,
    logic_ticks: u64,
}

impl TickScheduler {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval: normalize_interval(interval),
            last_tick: now,
            accumulated: Duration::ZERO,
            logic_ticks: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    pub fn logic_ticks(&self) -> u64 {
        self.logic_ticks
    }

    /// Records a system tick. Returns `true` when a logic tick is due; any
    /// backlog beyond one interval is dropped rather than replayed.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.accumulated = now.saturating_duration_since(self.last_tick);
        if self.accumulated < self.interval {
            return false;
        }
        self.last_tick = now;
        self.accumulated = Duration::ZERO;
        true
    }

    /// Advances the logic tick counter and returns the new count.
    pub fn begin_logic_tick(&mut self) -> u64 {
        self.logic_ticks = self.logic_ticks.saturating_add(1);
        self.logic_ticks
    }
}

pub(crate) fn normalize_interval(interval: Duration) -> Duration {
    if interval.is_zero() {
        DEFAULT_TICK_INTERVAL
    } else {
        interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_logic_tick_before_interval() {
        let base = Instant::now();
        let mut scheduler = TickScheduler::new(Duration::from_millis(1000), base);

        assert!(!scheduler.poll(base + Duration::from_millis(16)));
        assert!(!scheduler.poll(base + Duration::from_millis(999)));
        assert_eq!(scheduler.accumulated(), Duration::from_millis(999));
    }

    #[test]
    fn one_logic_tick_per_elapsed_interval() {
        let base = Instant::now();
        let mut scheduler = TickScheduler::new(Duration::from_millis(1000), base);

        let fired = (1..=60)
            .map(|frame| scheduler.poll(base + Duration::from_millis(frame * 50)))
            .filter(|fired| *fired)
            .count();

        assert_eq!(fired, 3);
        assert_eq!(scheduler.accumulated(), Duration::ZERO);
    }

    #[test]
    fn large_gap_yields_exactly_one_logic_tick() {
        let base = Instant::now();
        let mut scheduler = TickScheduler::new(Duration::from_millis(1000), base);

        assert!(scheduler.poll(base + Duration::from_secs(5)));
        assert!(!scheduler.poll(base + Duration::from_millis(5001)));
        assert!(scheduler.poll(base + Duration::from_secs(6)));
    }

    #[test]
    fn zero_interval_falls_back_to_default() {
        let scheduler = TickScheduler::new(Duration::ZERO, Instant::now());

        assert_eq!(scheduler.interval(), DEFAULT_TICK_INTERVAL);
    }

    #[test]
    fn logic_tick_counter_is_monotonic() {
        let mut scheduler = TickScheduler::new(DEFAULT_TICK_INTERVAL, Instant::now());

        assert_eq!(scheduler.begin_logic_tick(), 1);
        assert_eq!(scheduler.begin_logic_tick(), 2);
        assert_eq!(scheduler.logic_ticks(), 2);
    }
}
