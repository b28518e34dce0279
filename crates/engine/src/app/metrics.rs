use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LockResult, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static POISON_LOGGED: AtomicBool = AtomicBool::new(false);

/// Takes the guard even from a poisoned lock; the snapshot is plain data.
fn recover<G>(result: LockResult<G>, operation: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        if !POISON_LOGGED.swap(true, Ordering::Relaxed) {
            warn!(operation, "runtime_metrics_lock_poisoned");
        }
        poisoned.into_inner()
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RuntimeMetricsSnapshot {
    pub system_tps: f32,
    pub logic_tps: f32,
    pub frames_per_sec: f32,
    pub logic_ticks_total: u64,
}

/// Cloneable read handle for the latest published snapshot.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<RuntimeMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> RuntimeMetricsSnapshot {
        *recover(self.latest.read(), "read")
    }

    pub(crate) fn publish(&self, snapshot: RuntimeMetricsSnapshot) {
        *recover(self.latest.write(), "write") = snapshot;
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    system_ticks: u32,
    logic_ticks: u32,
    frames: u32,
    logic_ticks_total: u64,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval_start: now,
            interval,
            system_ticks: 0,
            logic_ticks: 0,
            frames: 0,
            logic_ticks_total: 0,
        }
    }

    pub(crate) fn record_system_tick(&mut self) {
        self.system_ticks = self.system_ticks.saturating_add(1);
    }

    pub(crate) fn record_logic_tick(&mut self) {
        self.logic_ticks = self.logic_ticks.saturating_add(1);
        self.logic_ticks_total = self.logic_ticks_total.saturating_add(1);
    }

    pub(crate) fn record_frame(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<RuntimeMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let snapshot = RuntimeMetricsSnapshot {
            system_tps: self.system_ticks as f32 / elapsed_seconds,
            logic_tps: self.logic_ticks as f32 / elapsed_seconds,
            frames_per_sec: self.frames as f32 / elapsed_seconds,
            logic_ticks_total: self.logic_ticks_total,
        };

        self.interval_start = now;
        self.system_ticks = 0;
        self.logic_ticks = 0;
        self.frames = 0;

        Some(snapshot)
    }
}
