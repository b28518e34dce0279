use engine::{Form, FormContext, RenderContext, Settings, Window, WindowContext, WindowKey};
use tracing::debug;

use super::{SETTINGS_VIEW, TRAVEL};

pub(crate) struct MainMenuWindow;

impl Window for MainMenuWindow {
    fn menu_header(&self, _ctx: &RenderContext<'_>) -> String {
        "THE TRAIL\nYou may:".to_string()
    }

    fn on_post_create(&mut self, ctx: &mut WindowContext<'_>) {
        let commands = ctx.commands_mut();
        commands.add("Travel the trail", |ctx| ctx.add_window(TRAVEL));
        commands.add("Settings", |ctx| ctx.set_form(SETTINGS_VIEW));
        commands.add("Quit", |ctx| ctx.remove_window());
    }

    fn on_window_added(&mut self, ctx: &mut WindowContext<'_>, added: WindowKey) {
        debug!(window = %ctx.key(), added = %added, "window_stacked_above");
    }

    fn on_activate(&mut self, ctx: &mut WindowContext<'_>) {
        debug!(window = %ctx.key(), "main_menu_focused");
    }
}

/// Read-only view of the loaded settings document.
pub(crate) struct SettingsForm {
    settings: Settings,
}

impl SettingsForm {
    pub(crate) fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl Form for SettingsForm {
    fn input_fills_buffer(&self) -> bool {
        false
    }

    fn prompt_text(&self) -> Option<String> {
        Some("Type anything to return.".to_string())
    }

    fn on_render(&mut self, _ctx: &RenderContext<'_>) -> String {
        let mut text = "Settings\n".to_string();
        let mut empty = true;
        for (name, value) in self.settings.values() {
            text.push_str(&format!("  {name} = {value}\n"));
            empty = false;
        }
        for (action, key) in self.settings.bindings() {
            text.push_str(&format!("  {action} -> '{key}'\n"));
            empty = false;
        }
        if empty {
            text.push_str("  (defaults)\n");
        }
        text
    }

    fn on_input(&mut self, ctx: &mut FormContext<'_>, _input: &str) {
        ctx.clear_form();
    }
}
