use std::any::Any;
use std::fmt;

use super::window::{CommandTable, FormRequest, RenderContext, Requests, UserData};
use super::{FormKey, TickInfo, WindowKey};

pub struct FormContext<'a> {
    key: FormKey,
    window: WindowKey,
    user_data: &'a mut UserData,
    commands: &'a CommandTable,
    requests: &'a mut Requests,
}

impl<'a> FormContext<'a> {
    pub(crate) fn new(
        key: FormKey,
        window: WindowKey,
        user_data: &'a mut UserData,
        commands: &'a CommandTable,
        requests: &'a mut Requests,
    ) -> Self {
        Self {
            key,
            window,
            user_data,
            commands,
            requests,
        }
    }

    pub fn key(&self) -> FormKey {
        self.key
    }

    pub fn window(&self) -> WindowKey {
        self.window
    }

    pub fn data<T: Any>(&self) -> Option<&T> {
        self.user_data.get::<T>()
    }

    pub fn data_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.user_data.get_mut::<T>()
    }

    pub fn commands(&self) -> &CommandTable {
        self.commands
    }

    /// Replaces this form once the current callback returns.
    pub fn set_form(&mut self, form: FormKey) {
        self.requests.form = Some(FormRequest::Set(form));
    }

    pub fn clear_form(&mut self) {
        self.requests.form = Some(FormRequest::Clear);
    }

    pub fn remove_window(&mut self) {
        self.requests.remove_window = true;
    }

    pub fn add_window(&mut self, window: WindowKey) {
        self.requests.open_windows.push(window);
    }

    pub fn restart(&mut self) {
        self.requests.restart = true;
    }
}

/// A sub-state hosted by exactly one window at a time.
///
/// Forms are dropped without a teardown hook when replaced or cleared, so
/// they must not own anything that needs explicit release.
pub trait Form {
    fn accepts_input(&self) -> bool {
        true
    }

    /// Whether keystrokes are echoed into the prompt while typing.
    fn input_fills_buffer(&self) -> bool {
        true
    }

    fn prompt_text(&self) -> Option<String> {
        None
    }

    fn on_pre_create(&mut self, _ctx: &mut FormContext<'_>) {}

    fn on_post_create(&mut self, _ctx: &mut FormContext<'_>) {}

    fn on_tick(&mut self, _ctx: &mut FormContext<'_>, _tick: TickInfo) {}

    fn on_render(&mut self, _ctx: &RenderContext<'_>) -> String {
        String::new()
    }

    fn on_input(&mut self, _ctx: &mut FormContext<'_>, _input: &str) {}
}

pub struct FormRuntime {
    key: FormKey,
    parent: WindowKey,
    form: Box<dyn Form>,
}

impl FormRuntime {
    pub(crate) fn new(key: FormKey, parent: WindowKey, form: Box<dyn Form>) -> Self {
        Self { key, parent, form }
    }

    pub fn key(&self) -> FormKey {
        self.key
    }

    pub fn parent(&self) -> WindowKey {
        self.parent
    }

    pub fn accepts_input(&self) -> bool {
        self.form.accepts_input()
    }

    pub fn input_fills_buffer(&self) -> bool {
        self.form.input_fills_buffer()
    }

    pub fn prompt_text(&self) -> Option<String> {
        self.form.prompt_text()
    }

    pub(crate) fn pre_create(&mut self, ctx: &mut FormContext<'_>) {
        self.form.on_pre_create(ctx);
    }

    pub(crate) fn post_create(&mut self, ctx: &mut FormContext<'_>) {
        self.form.on_post_create(ctx);
    }

    pub(crate) fn tick(&mut self, ctx: &mut FormContext<'_>, tick: TickInfo) {
        self.form.on_tick(ctx, tick);
    }

    pub(crate) fn render(&mut self, ctx: &RenderContext<'_>) -> String {
        self.form.on_render(ctx)
    }

    pub(crate) fn input(&mut self, ctx: &mut FormContext<'_>, line: &str) {
        self.form.on_input(ctx, line);
    }
}

impl fmt::Debug for FormRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormRuntime")
            .field("key", &self.key)
            .field("parent", &self.parent)
            .field("accepts_input", &self.accepts_input())
            .field("input_fills_buffer", &self.input_fills_buffer())
            .finish()
    }
}
