use std::cell::Cell;
use std::env;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use super::input::{InputRouter, DEFAULT_MAX_INPUT_CHARS, DEFAULT_MAX_QUEUED_COMMANDS};
use super::metrics::MetricsAccumulator;
use super::registry::Registry;
use super::scheduler::{normalize_interval, TickScheduler, DEFAULT_TICK_INTERVAL};
use super::{MetricsHandle, RuntimeError, SceneGraph, TickInfo, WindowManager};

pub const TICK_INTERVAL_ENV_VAR: &str = "TEXTSIM_TICK_INTERVAL_MS";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub tick_interval: Duration,
    pub forward_system_ticks: bool,
    pub show_status_line: bool,
    pub max_input_chars: usize,
    pub max_queued_commands: usize,
    pub metrics_log_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "textsim".to_string(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            forward_system_ticks: true,
            show_status_line: true,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            max_queued_commands: DEFAULT_MAX_QUEUED_COMMANDS,
            metrics_log_interval: Duration::from_secs(10),
        }
    }
}

impl RuntimeConfig {
    /// Applies `TEXTSIM_TICK_INTERVAL_MS` on top of the configured interval.
    pub fn with_env_overrides(mut self) -> Self {
        self.tick_interval = resolve_tick_interval(self.tick_interval);
        self
    }
}

/// Application-level callbacks around the window stack.
pub trait AppHooks {
    /// Runs on the first logic tick and again after every restart; seeds the
    /// initial windows.
    fn on_first_tick(&mut self, windows: &mut WindowManager) -> Result<(), RuntimeError>;

    /// Text placed between the status line and the focused window.
    fn on_pre_render(&mut self, _windows: &WindowManager) -> String {
        String::new()
    }

    fn on_shutdown(&mut self, _windows: &mut WindowManager) {}
}

thread_local! {
    static RUNTIME_ALIVE: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as owning a live runtime.
struct InstanceGuard;

impl InstanceGuard {
    fn acquire() -> Result<Self, RuntimeError> {
        RUNTIME_ALIVE.with(|alive| {
            if alive.replace(true) {
                Err(RuntimeError::AlreadyInitialized)
            } else {
                Ok(Self)
            }
        })
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        RUNTIME_ALIVE.with(|alive| alive.set(false));
    }
}

/// Application root: owns the scheduler, input router, scene graph and
/// window manager, and drives them in that order on every forwarded tick.
pub struct Runtime {
    config: RuntimeConfig,
    hooks: Box<dyn AppHooks>,
    scheduler: TickScheduler,
    input: InputRouter,
    scene_graph: SceneGraph,
    windows: WindowManager,
    metrics: MetricsAccumulator,
    metrics_handle: MetricsHandle,
    is_shut_down: bool,
    _guard: InstanceGuard,
}

impl Runtime {
    pub fn new<H>(config: RuntimeConfig, registry: Registry, hooks: H) -> Result<Self, RuntimeError>
    where
        H: AppHooks + 'static,
    {
        Self::new_at(config, registry, hooks, Instant::now())
    }

    pub fn new_at<H>(
        mut config: RuntimeConfig,
        registry: Registry,
        hooks: H,
        now: Instant,
    ) -> Result<Self, RuntimeError>
    where
        H: AppHooks + 'static,
    {
        let guard = InstanceGuard::acquire()?;
        config.tick_interval = normalize_interval(config.tick_interval);
        info!(
            title = config.title.as_str(),
            tick_interval_ms = config.tick_interval.as_millis() as u64,
            forward_system_ticks = config.forward_system_ticks,
            show_status_line = config.show_status_line,
            "runtime_config"
        );

        Ok(Self {
            scheduler: TickScheduler::new(config.tick_interval, now),
            input: InputRouter::new(config.max_input_chars, config.max_queued_commands),
            scene_graph: SceneGraph::new(config.title.clone(), config.show_status_line),
            windows: WindowManager::new(registry),
            metrics: MetricsAccumulator::new(config.metrics_log_interval, now),
            metrics_handle: MetricsHandle::default(),
            hooks: Box::new(hooks),
            is_shut_down: false,
            config,
            _guard: guard,
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn windows(&self) -> &WindowManager {
        &self.windows
    }

    pub fn windows_mut(&mut self) -> &mut WindowManager {
        &mut self.windows
    }

    pub fn input(&self) -> &InputRouter {
        &self.input
    }

    pub fn scene_graph(&self) -> &SceneGraph {
        &self.scene_graph
    }

    pub fn logic_ticks(&self) -> u64 {
        self.scheduler.logic_ticks()
    }

    pub fn metrics(&self) -> MetricsHandle {
        self.metrics_handle.clone()
    }

    /// True once the simulation has started and every window is gone.
    pub fn is_idle(&self) -> bool {
        self.scheduler.logic_ticks() > 0 && self.windows.is_empty()
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: FnMut(&str) + 'static,
    {
        self.scene_graph.subscribe(subscriber);
    }

    /// Host entry point. Call at least once per host frame.
    pub fn on_tick(&mut self, is_system_tick: bool) -> Result<(), RuntimeError> {
        self.on_tick_at(is_system_tick, false, Instant::now())
    }

    pub fn on_tick_at(
        &mut self,
        is_system_tick: bool,
        skip_advance: bool,
        now: Instant,
    ) -> Result<(), RuntimeError> {
        if !is_system_tick {
            return self.logic_tick(skip_advance);
        }

        self.metrics.record_system_tick();
        if self.scheduler.poll(now) {
            self.logic_tick(skip_advance)?;
        }
        if self.config.forward_system_ticks && self.scheduler.logic_ticks() > 0 {
            self.forward(TickInfo {
                is_system_tick: true,
                skip_advance,
                logic_tick: self.scheduler.logic_ticks(),
            })?;
        }
        if let Some(snapshot) = self.metrics.maybe_snapshot(now) {
            self.metrics_handle.publish(snapshot);
            info!(
                system_tps = snapshot.system_tps,
                logic_tps = snapshot.logic_tps,
                frames_per_sec = snapshot.frames_per_sec,
                logic_ticks_total = snapshot.logic_ticks_total,
                window_count = self.windows.len(),
                "runtime_metrics"
            );
        }
        Ok(())
    }

    pub fn add_char(&mut self, ch: char) -> bool {
        self.input.add_char(ch)
    }

    pub fn remove_last_char(&mut self) {
        self.input.remove_last_char();
    }

    /// Dispatches the current line to the focused window and clears it.
    pub fn submit(&mut self) -> Result<(), RuntimeError> {
        let Some(line) = self.input.take_line() else {
            return Ok(());
        };
        debug!(input = line.as_str(), "input_submitted");
        self.windows.dispatch_input(&line)?;
        self.settle_restart()
    }

    /// Queues a line for dispatch on the next forwarded tick.
    pub fn queue_command(&mut self, line: impl Into<String>) {
        self.input.queue_command(line);
    }

    /// Runs the shutdown hook once and drops every window.
    pub fn shutdown(&mut self) {
        if self.is_shut_down {
            return;
        }
        self.is_shut_down = true;
        self.hooks.on_shutdown(&mut self.windows);
        self.windows.clear();
        info!(logic_ticks = self.scheduler.logic_ticks(), "shutdown");
    }

    fn logic_tick(&mut self, skip_advance: bool) -> Result<(), RuntimeError> {
        let logic_tick = self.scheduler.begin_logic_tick();
        self.metrics.record_logic_tick();
        trace!(logic_tick, skip_advance, "logic_tick");
        if logic_tick == 1 {
            info!("first_tick");
            self.hooks.on_first_tick(&mut self.windows)?;
        }
        self.forward(TickInfo {
            is_system_tick: false,
            skip_advance,
            logic_tick,
        })
    }

    fn forward(&mut self, tick: TickInfo) -> Result<(), RuntimeError> {
        for line in self.input.on_tick(tick) {
            debug!(input = line.as_str(), "queued_input_dispatched");
            self.windows.dispatch_input(&line)?;
            self.settle_restart()?;
        }

        let pre_render = self.hooks.on_pre_render(&self.windows);
        if self
            .scene_graph
            .on_tick(tick, &pre_render, &mut self.windows, &self.input)
        {
            self.metrics.record_frame();
        }

        self.windows.on_tick(tick)?;
        self.settle_restart()
    }

    fn settle_restart(&mut self) -> Result<(), RuntimeError> {
        if !self.windows.take_restart_request() {
            return Ok(());
        }
        info!(logic_ticks = self.scheduler.logic_ticks(), "restart");
        self.windows.clear();
        self.input.clear();
        self.scene_graph.invalidate();
        self.hooks.on_first_tick(&mut self.windows)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .field("input", &self.input)
            .field("scene_graph", &self.scene_graph)
            .field("windows", &self.windows)
            .field("is_shut_down", &self.is_shut_down)
            .finish()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn resolve_tick_interval(configured: Duration) -> Duration {
    match env::var(TICK_INTERVAL_ENV_VAR) {
        Ok(value) => parse_tick_interval(&value).unwrap_or_else(|| {
            warn!(
                env_var = TICK_INTERVAL_ENV_VAR,
                value = value.as_str(),
                "invalid tick interval env var value; falling back to config"
            );
            configured
        }),
        Err(env::VarError::NotPresent) => configured,
        Err(err) => {
            warn!(
                env_var = TICK_INTERVAL_ENV_VAR,
                error = %err,
                "unable to read tick interval env var; falling back to config"
            );
            configured
        }
    }
}

fn parse_tick_interval(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => None,
    }
}
