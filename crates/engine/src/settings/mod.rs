mod atomic_io;
mod document;
mod fs;

use std::io;

use thiserror::Error;
use tracing::{debug, info, warn};

pub use document::{Settings, SETTINGS_VERSION};
pub use fs::{DiskFs, MemoryFs, VirtualFs};

pub const DEFAULT_SETTINGS_PATH: &str = "settings/settings.xml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed settings xml (line={line}, column={column}): {message}")]
    Malformed {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("invalid settings root (line={line}, column={column}): {message}")]
    InvalidRoot {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("invalid settings entry (line={line}, column={column}): {message}")]
    InvalidEntry {
        line: usize,
        column: usize,
        message: String,
    },
}

/// Loads and saves a [`Settings`] document at a fixed virtual path.
#[derive(Debug)]
pub struct SettingsStore<F: VirtualFs> {
    fs: F,
    path: String,
}

impl<F: VirtualFs> SettingsStore<F> {
    pub fn new(fs: F) -> Self {
        Self::with_path(fs, DEFAULT_SETTINGS_PATH)
    }

    pub fn with_path(fs: F, path: impl Into<String>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the stored settings, or defaults when the file is missing or
    /// unusable. Failures are logged, never returned.
    pub fn load(&self) -> Settings {
        match self.try_load() {
            Ok(settings) => settings,
            Err(error) => {
                warn!(path = self.path.as_str(), error = %error, "settings_load_failed");
                Settings::default()
            }
        }
    }

    /// Like [`load`](Self::load) but reports unreadable or malformed files.
    /// A missing file still yields defaults.
    pub fn try_load(&self) -> Result<Settings, SettingsError> {
        let raw = match self.fs.read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                debug!(path = self.path.as_str(), "settings_missing_using_defaults");
                return Ok(Settings::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Settings::parse_xml(&raw)
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        self.fs
            .write_atomic(&self.path, &settings.to_xml())
            .map_err(|source| SettingsError::Io {
                path: self.path.clone(),
                source,
            })?;
        info!(path = self.path.as_str(), "settings_saved");
        Ok(())
    }
}
