pub(crate) mod bootstrap;
mod demo;
pub(crate) mod loop_runner;

use engine::{RuntimeError, StartupError};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum HostError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("failed to spawn stdin reader thread: {0}")]
    StdinThread(#[source] std::io::Error),
}
