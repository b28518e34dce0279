use std::rc::Rc;
use std::time::Duration;

use engine::{resolve_data_dir, DiskFs, Registry, RuntimeConfig, Settings, SettingsStore, VirtualFs};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::demo::{self, DemoHooks};
use super::HostError;

const TICK_INTERVAL_SETTING: &str = "tick_interval_ms";
const TITLE_SETTING: &str = "title";
const STATUS_LINE_SETTING: &str = "show_status_line";

pub(crate) struct AppWiring {
    pub(crate) config: RuntimeConfig,
    pub(crate) registry: Registry,
    pub(crate) hooks: DemoHooks,
    pub(crate) bindings: KeyBindings,
}

/// Characters that act as editing keys inside a typed line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct KeyBindings {
    pub(crate) submit: Option<char>,
    pub(crate) backspace: Option<char>,
}

impl KeyBindings {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self {
            submit: binding_char(settings, "submit"),
            backspace: binding_char(settings, "backspace"),
        }
    }
}

pub(crate) fn build_app() -> Result<AppWiring, HostError> {
    init_tracing();
    info!("=== textsim startup ===");

    let data_dir = resolve_data_dir()?;
    info!(data_dir = %data_dir.display(), "data_dir_resolved");
    let fs = Rc::new(DiskFs::new(data_dir));
    let settings = load_or_seed_settings(fs.as_ref());

    let config = config_from_settings(&settings).with_env_overrides();
    let bindings = KeyBindings::from_settings(&settings);
    let registry = demo::build_registry(settings, fs)?;

    Ok(AppWiring {
        config,
        registry,
        hooks: DemoHooks,
        bindings,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Loads settings, writing a default document on first run.
fn load_or_seed_settings<F: VirtualFs>(fs: F) -> Settings {
    let store = SettingsStore::new(fs);
    if store.fs().exists(store.path()) {
        return store.load();
    }

    let settings = default_settings();
    if let Err(error) = store.save(&settings) {
        warn!(error = %error, "settings_seed_failed");
    }
    settings
}

pub(crate) fn default_settings() -> Settings {
    let defaults = RuntimeConfig::default();
    let mut settings = Settings::new();
    settings.set_value(
        TICK_INTERVAL_SETTING,
        defaults.tick_interval.as_millis().to_string(),
    );
    settings.set_value(TITLE_SETTING, "The Trail");
    settings.set_value(STATUS_LINE_SETTING, defaults.show_status_line.to_string());
    settings.bind("backspace", "~");
    settings
}

pub(crate) fn config_from_settings(settings: &Settings) -> RuntimeConfig {
    let mut config = RuntimeConfig::default();

    if let Some(raw) = settings.value(TICK_INTERVAL_SETTING) {
        match settings.u64_value(TICK_INTERVAL_SETTING) {
            Some(ms) if ms > 0 => config.tick_interval = Duration::from_millis(ms),
            _ => warn!(
                setting = TICK_INTERVAL_SETTING,
                value = raw,
                "invalid tick interval setting; using default"
            ),
        }
    }
    if let Some(title) = settings.value(TITLE_SETTING).filter(|title| !title.is_empty()) {
        config.title = title.to_string();
    }
    if let Some(raw) = settings.value(STATUS_LINE_SETTING) {
        match raw.trim().parse::<bool>() {
            Ok(show) => config.show_status_line = show,
            Err(_) => warn!(
                setting = STATUS_LINE_SETTING,
                value = raw,
                "invalid boolean setting; using default"
            ),
        }
    }
    config
}

fn binding_char(settings: &Settings, action: &str) -> Option<char> {
    let key = settings.binding(action)?;
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(ch),
        _ => {
            warn!(action, key, "binding must be a single character; ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use engine::{MemoryFs, SettingsStore};

    use super::*;

    #[test]
    fn config_reads_interval_title_and_status_line() {
        let mut settings = Settings::new();
        settings.set_value(TICK_INTERVAL_SETTING, "250");
        settings.set_value(TITLE_SETTING, "Oregon");
        settings.set_value(STATUS_LINE_SETTING, "false");

        let config = config_from_settings(&settings);

        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.title, "Oregon");
        assert!(!config.show_status_line);
    }

    #[test]
    fn invalid_settings_fall_back_to_defaults() {
        let mut settings = Settings::new();
        settings.set_value(TICK_INTERVAL_SETTING, "0");
        settings.set_value(STATUS_LINE_SETTING, "sometimes");

        let config = config_from_settings(&settings);
        let defaults = RuntimeConfig::default();

        assert_eq!(config.tick_interval, defaults.tick_interval);
        assert_eq!(config.show_status_line, defaults.show_status_line);
    }

    #[test]
    fn first_run_seeds_default_settings() {
        let fs = MemoryFs::new();

        let settings = load_or_seed_settings(&fs);

        assert_eq!(settings, default_settings());
        let stored = SettingsStore::new(&fs).try_load().expect("stored");
        assert_eq!(stored, settings);
    }

    #[test]
    fn existing_settings_are_not_overwritten() {
        let fs = MemoryFs::new().with_file(
            "settings/settings.xml",
            "<Settings version=\"1\"><Value name=\"title\">Mine</Value></Settings>",
        );

        let settings = load_or_seed_settings(&fs);

        assert_eq!(settings.value(TITLE_SETTING), Some("Mine"));
        assert_eq!(settings.value(TICK_INTERVAL_SETTING), None);
    }

    #[test]
    fn bindings_take_single_characters_only() {
        let mut settings = Settings::new();
        settings.bind("submit", ";");
        settings.bind("backspace", "Backspace");

        let bindings = KeyBindings::from_settings(&settings);

        assert_eq!(
            bindings,
            KeyBindings {
                submit: Some(';'),
                backspace: None,
            }
        );
    }
}
