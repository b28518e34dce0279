use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod settings;

pub use app::{
    AppHooks, CommandTable, Form, FormContext, FormKey, MetricsHandle, Registry, RenderContext,
    Runtime, RuntimeConfig, RuntimeError, RuntimeMetricsSnapshot, TickInfo, UserData, Window,
    WindowContext, WindowKey, WindowManager, TICK_INTERVAL_ENV_VAR,
};
pub use settings::{DiskFs, MemoryFs, Settings, SettingsError, SettingsStore, VirtualFs};

pub const DATA_DIR_ENV_VAR: &str = "TEXTSIM_DATA_DIR";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error("failed to create data directory at {path}: {source}")]
    CreateDataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TEXTSIM_DATA_DIR points at a file, not a directory: {path}")]
    DataDirIsFile { path: PathBuf },
}

/// Resolves and creates the directory holding settings and saves.
///
/// `TEXTSIM_DATA_DIR` wins when set; otherwise `./textsim-data` under the
/// working directory is used.
pub fn resolve_data_dir() -> Result<PathBuf, StartupError> {
    let dir = match env::var(DATA_DIR_ENV_VAR) {
        Ok(value) => PathBuf::from(value),
        Err(env::VarError::NotPresent) => env::current_dir()
            .map_err(StartupError::CurrentDir)?
            .join("textsim-data"),
        Err(source) => {
            return Err(StartupError::EnvVar {
                var: DATA_DIR_ENV_VAR,
                source,
            })
        }
    };
    ensure_data_dir(&dir)?;
    Ok(normalize_path(&dir))
}

fn ensure_data_dir(dir: &Path) -> Result<(), StartupError> {
    if dir.is_file() {
        return Err(StartupError::DataDirIsFile {
            path: dir.to_path_buf(),
        });
    }
    fs::create_dir_all(dir).map_err(|source| StartupError::CreateDataDir {
        path: dir.to_path_buf(),
        source,
    })
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_created_when_missing() {
        let temp = tempfile::tempdir().expect("temp");
        let dir = temp.path().join("nested").join("data");

        ensure_data_dir(&dir).expect("create");

        assert!(dir.is_dir());
    }

    #[test]
    fn data_dir_pointing_at_file_is_rejected() {
        let temp = tempfile::tempdir().expect("temp");
        let file = temp.path().join("data");
        fs::write(&file, "").expect("write");

        let err = ensure_data_dir(&file).expect_err("file");

        assert!(matches!(err, StartupError::DataDirIsFile { .. }));
    }
}
