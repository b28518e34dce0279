mod error;
mod form;
mod identity;
mod input;
mod metrics;
mod registry;
mod runtime;
mod scene_graph;
mod scheduler;
mod window;
mod window_manager;

pub use error::RuntimeError;
pub use form::{Form, FormContext, FormRuntime};
pub use identity::{FormKey, TickInfo, WindowKey};
pub use input::{InputRouter, DEFAULT_MAX_INPUT_CHARS, DEFAULT_MAX_QUEUED_COMMANDS};
pub use metrics::{MetricsHandle, RuntimeMetricsSnapshot};
pub use registry::Registry;
pub use runtime::{AppHooks, Runtime, RuntimeConfig, TICK_INTERVAL_ENV_VAR};
pub use scene_graph::{FrameSubscriber, SceneGraph};
pub use scheduler::{TickScheduler, DEFAULT_TICK_INTERVAL};
pub use window::{
    CommandAction, CommandTable, RenderContext, UserData, Window, WindowContext, WindowRuntime,
    DEFAULT_PROMPT,
};
pub use window_manager::WindowManager;
