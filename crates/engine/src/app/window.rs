use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::form::{FormContext, FormRuntime};
use super::registry::Registry;
use super::{FormKey, RuntimeError, TickInfo, WindowKey};

pub const DEFAULT_PROMPT: &str = "What is your choice?";

/// Typed payload owned by a window and shared with whichever form it hosts.
#[derive(Default)]
pub struct UserData(Option<Box<dyn Any>>);

impl UserData {
    pub fn new<T: Any>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    pub fn empty() -> Self {
        Self(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_ref()?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.0.as_mut()?.downcast_mut::<T>()
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserData")
            .field(&if self.is_empty() { "empty" } else { "set" })
            .finish()
    }
}

pub type CommandAction = Rc<dyn Fn(&mut WindowContext<'_>)>;

struct Command {
    label: String,
    action: CommandAction,
}

/// Ordered label → action menu. Display order is insertion order.
#[derive(Default)]
pub struct CommandTable {
    commands: Vec<Command>,
    lookup_by_lower_label: HashMap<String, usize>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command, or replaces the action of an existing label in place.
    pub fn add<F>(&mut self, label: impl Into<String>, action: F)
    where
        F: Fn(&mut WindowContext<'_>) + 'static,
    {
        let label = label.into();
        let lower = label.to_lowercase();
        let action: CommandAction = Rc::new(action);
        if let Some(&index) = self.lookup_by_lower_label.get(&lower) {
            self.commands[index] = Command { label, action };
            return;
        }
        self.commands.push(Command { label, action });
        self.lookup_by_lower_label
            .insert(lower, self.commands.len() - 1);
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.lookup_by_lower_label.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|command| command.label.as_str())
    }

    /// Matches a 1-based menu number first, then a case-insensitive label.
    pub fn resolve(&self, input: &str) -> Option<CommandAction> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let index = match input.parse::<usize>() {
            Ok(number) => number.checked_sub(1)?,
            Err(_) => *self.lookup_by_lower_label.get(&input.to_lowercase())?,
        };
        self.commands
            .get(index)
            .map(|command| Rc::clone(&command.action))
    }

    pub fn render_menu(&self) -> String {
        let mut menu = String::new();
        for (index, command) in self.commands.iter().enumerate() {
            menu.push_str(&format!("  {}. {}\n", index + 1, command.label));
        }
        menu
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.labels()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormRequest {
    Set(FormKey),
    Clear,
}

/// Mutations requested from inside a callback, applied once it returns.
#[derive(Debug, Default)]
pub(crate) struct Requests {
    pub(crate) form: Option<FormRequest>,
    pub(crate) remove_window: bool,
    pub(crate) open_windows: Vec<WindowKey>,
    pub(crate) restart: bool,
}

/// What a window hands back to the manager after its requests have settled.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct WindowEffects {
    pub(crate) open_windows: Vec<WindowKey>,
    pub(crate) restart: bool,
}

impl WindowEffects {
    pub(crate) fn merge(&mut self, mut other: WindowEffects) {
        self.open_windows.append(&mut other.open_windows);
        self.restart |= other.restart;
    }
}

pub struct WindowContext<'a> {
    key: WindowKey,
    form: Option<FormKey>,
    user_data: &'a mut UserData,
    commands: &'a mut CommandTable,
    requests: &'a mut Requests,
}

impl<'a> WindowContext<'a> {
    pub(crate) fn new(
        key: WindowKey,
        form: Option<FormKey>,
        user_data: &'a mut UserData,
        commands: &'a mut CommandTable,
        requests: &'a mut Requests,
    ) -> Self {
        Self {
            key,
            form,
            user_data,
            commands,
            requests,
        }
    }

    pub fn key(&self) -> WindowKey {
        self.key
    }

    pub fn current_form(&self) -> Option<FormKey> {
        self.form
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

    pub fn commands_mut(&mut self) -> &mut CommandTable {
        self.commands
    }

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

/// Read-only view used while producing text.
pub struct RenderContext<'a> {
    window: WindowKey,
    form: Option<FormKey>,
    user_data: &'a UserData,
    commands: &'a CommandTable,
}

impl<'a> RenderContext<'a> {
    pub fn window(&self) -> WindowKey {
        self.window
    }

    pub fn form(&self) -> Option<FormKey> {
        self.form
    }

    pub fn data<T: Any>(&self) -> Option<&T> {
        self.user_data.get::<T>()
    }

    pub fn commands(&self) -> &CommandTable {
        self.commands
    }
}

/// Capability set of a top-level window. Every hook defaults to a no-op.
pub trait Window {
    fn create_user_data(&self) -> UserData {
        UserData::empty()
    }

    fn accepts_input(&self) -> bool {
        true
    }

    fn prompt_text(&self) -> String {
        DEFAULT_PROMPT.to_string()
    }

    fn menu_header(&self, _ctx: &RenderContext<'_>) -> String {
        String::new()
    }

    fn menu_footer(&self, _ctx: &RenderContext<'_>) -> String {
        String::new()
    }

    fn on_post_create(&mut self, _ctx: &mut WindowContext<'_>) {}

    fn on_window_added(&mut self, _ctx: &mut WindowContext<'_>, _added: WindowKey) {}

    fn on_activate(&mut self, _ctx: &mut WindowContext<'_>) {}

    fn on_tick(&mut self, _ctx: &mut WindowContext<'_>, _tick: TickInfo) {}
}

pub struct WindowRuntime {
    key: WindowKey,
    window: Box<dyn Window>,
    form: Option<FormRuntime>,
    commands: CommandTable,
    user_data: UserData,
    should_remove: bool,
}

impl WindowRuntime {
    pub(crate) fn new(key: WindowKey, window: Box<dyn Window>) -> Self {
        let user_data = window.create_user_data();
        Self {
            key,
            window,
            form: None,
            commands: CommandTable::new(),
            user_data,
            should_remove: false,
        }
    }

    pub fn key(&self) -> WindowKey {
        self.key
    }

    pub fn current_form(&self) -> Option<FormKey> {
        self.form.as_ref().map(FormRuntime::key)
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn data<T: Any>(&self) -> Option<&T> {
        self.user_data.get::<T>()
    }

    pub fn data_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.user_data.get_mut::<T>()
    }

    pub fn should_remove(&self) -> bool {
        self.should_remove
    }

    pub fn mark_for_removal(&mut self) {
        self.should_remove = true;
    }

    pub fn accepts_input(&self) -> bool {
        match &self.form {
            Some(form) => form.accepts_input() || form.input_fills_buffer(),
            None => self.window.accepts_input(),
        }
    }

    pub fn input_fills_buffer(&self) -> bool {
        self.form
            .as_ref()
            .map_or(true, FormRuntime::input_fills_buffer)
    }

    pub fn prompt_text(&self) -> String {
        self.form
            .as_ref()
            .and_then(FormRuntime::prompt_text)
            .unwrap_or_else(|| self.window.prompt_text())
    }

    pub fn clear_form(&mut self) {
        if let Some(form) = self.form.take() {
            debug!(window = %self.key, form = %form.key(), "form_cleared");
        }
    }

    /// Renders the hosted form, falling back to the command menu when the
    /// form has nothing to show.
    pub fn render(&mut self) -> String {
        let ctx = RenderContext {
            window: self.key,
            form: self.form.as_ref().map(FormRuntime::key),
            user_data: &self.user_data,
            commands: &self.commands,
        };
        if let Some(form) = self.form.as_mut() {
            let text = form.render(&ctx);
            if !text.is_empty() {
                return text;
            }
        }

        let mut text = self.window.menu_header(&ctx);
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&self.commands.render_menu());
        text.push_str(&self.window.menu_footer(&ctx));
        text
    }

    /// Constructs and attaches a form. Validation happens before the slot is
    /// touched, so a failed call leaves the current form in place.
    pub(crate) fn set_form(
        &mut self,
        registry: &Registry,
        key: FormKey,
    ) -> Result<WindowEffects, RuntimeError> {
        let requests = self.attach_form(registry, key)?;
        self.settle(registry, requests)
    }

    pub(crate) fn post_create(&mut self, registry: &Registry) -> Result<WindowEffects, RuntimeError> {
        let requests = self.run_window_hook(|window, ctx| window.on_post_create(ctx));
        self.settle(registry, requests)
    }

    pub(crate) fn window_added(
        &mut self,
        registry: &Registry,
        added: WindowKey,
    ) -> Result<WindowEffects, RuntimeError> {
        let requests = self.run_window_hook(|window, ctx| window.on_window_added(ctx, added));
        self.settle(registry, requests)
    }

    pub(crate) fn activate(&mut self, registry: &Registry) -> Result<WindowEffects, RuntimeError> {
        let requests = self.run_window_hook(|window, ctx| window.on_activate(ctx));
        self.settle(registry, requests)
    }

    pub(crate) fn tick(
        &mut self,
        registry: &Registry,
        tick: TickInfo,
    ) -> Result<WindowEffects, RuntimeError> {
        let mut requests = self.run_window_hook(|window, ctx| window.on_tick(ctx, tick));
        if let Some(form) = self.form.as_mut() {
            let mut ctx = FormContext::new(
                form.key(),
                self.key,
                &mut self.user_data,
                &self.commands,
                &mut requests,
            );
            form.tick(&mut ctx, tick);
        }
        self.settle(registry, requests)
    }

    pub(crate) fn dispatch_input(
        &mut self,
        registry: &Registry,
        line: &str,
    ) -> Result<WindowEffects, RuntimeError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(WindowEffects::default());
        }

        let mut requests = Requests::default();
        let form_takes_input = self
            .form
            .as_ref()
            .is_some_and(FormRuntime::accepts_input);
        if form_takes_input {
            if let Some(form) = self.form.as_mut() {
                let mut ctx = FormContext::new(
                    form.key(),
                    self.key,
                    &mut self.user_data,
                    &self.commands,
                    &mut requests,
                );
                form.input(&mut ctx, line);
            }
        } else if let Some(action) = self.commands.resolve(line) {
            let form = self.current_form();
            let mut ctx = WindowContext::new(
                self.key,
                form,
                &mut self.user_data,
                &mut self.commands,
                &mut requests,
            );
            action(&mut ctx);
        } else {
            debug!(window = %self.key, input = line, "command_unmatched");
        }
        self.settle(registry, requests)
    }

    fn run_window_hook<F>(&mut self, hook: F) -> Requests
    where
        F: FnOnce(&mut dyn Window, &mut WindowContext<'_>),
    {
        let mut requests = Requests::default();
        let form = self.current_form();
        let mut ctx = WindowContext::new(
            self.key,
            form,
            &mut self.user_data,
            &mut self.commands,
            &mut requests,
        );
        hook(self.window.as_mut(), &mut ctx);
        requests
    }

    fn attach_form(&mut self, registry: &Registry, key: FormKey) -> Result<Requests, RuntimeError> {
        let form = self.form.insert(registry.create_form(key, self.key)?);
        let mut requests = Requests::default();
        let mut ctx = FormContext::new(
            key,
            self.key,
            &mut self.user_data,
            &self.commands,
            &mut requests,
        );
        form.pre_create(&mut ctx);
        form.post_create(&mut ctx);
        debug!(window = %self.key, form = %key, "form_attached");
        Ok(requests)
    }

    fn settle(
        &mut self,
        registry: &Registry,
        mut requests: Requests,
    ) -> Result<WindowEffects, RuntimeError> {
        let mut effects = WindowEffects::default();
        loop {
            if requests.remove_window && !self.should_remove {
                debug!(window = %self.key, "window_marked_for_removal");
                self.should_remove = true;
            }
            effects.open_windows.append(&mut requests.open_windows);
            effects.restart |= requests.restart;

            requests = match requests.form.take() {
                None => return Ok(effects),
                Some(FormRequest::Clear) => {
                    self.clear_form();
                    return Ok(effects);
                }
                Some(FormRequest::Set(key)) => self.attach_form(registry, key)?,
            };
        }
    }
}

impl fmt::Debug for WindowRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowRuntime")
            .field("key", &self.key)
            .field("form", &self.current_form())
            .field("commands", &self.commands)
            .field("user_data", &self.user_data)
            .field("should_remove", &self.should_remove)
            .finish()
    }
}
