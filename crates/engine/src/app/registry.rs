use std::collections::HashMap;
use std::fmt;

use super::form::{Form, FormRuntime};
use super::window::{Window, WindowRuntime};
use super::{FormKey, RuntimeError, WindowKey};

type WindowCtor = dyn Fn() -> Box<dyn Window>;
type FormCtor = dyn Fn() -> Box<dyn Form>;

struct FormSpec {
    parent: WindowKey,
    ctor: Box<FormCtor>,
}

/// Identity-keyed constructor table for windows and forms.
///
/// Forms declare their required parent window at registration time; the
/// declaration is checked every time the form is constructed for a window.
#[derive(Default)]
pub struct Registry {
    windows: HashMap<WindowKey, Box<WindowCtor>>,
    forms: HashMap<FormKey, FormSpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_window<W, F>(&mut self, key: WindowKey, ctor: F) -> Result<(), RuntimeError>
    where
        W: Window + 'static,
        F: Fn() -> W + 'static,
    {
        if self.windows.contains_key(&key) {
            return Err(RuntimeError::DuplicateWindowRegistration(key));
        }
        self.windows
            .insert(key, Box::new(move || Box::new(ctor()) as Box<dyn Window>));
        Ok(())
    }

    pub fn register_form<T, F>(
        &mut self,
        key: FormKey,
        parent: WindowKey,
        ctor: F,
    ) -> Result<(), RuntimeError>
    where
        T: Form + 'static,
        F: Fn() -> T + 'static,
    {
        if self.forms.contains_key(&key) {
            return Err(RuntimeError::DuplicateFormRegistration(key));
        }
        self.forms.insert(
            key,
            FormSpec {
                parent,
                ctor: Box::new(move || Box::new(ctor()) as Box<dyn Form>),
            },
        );
        Ok(())
    }

    pub fn contains_window(&self, key: WindowKey) -> bool {
        self.windows.contains_key(&key)
    }

    pub fn contains_form(&self, key: FormKey) -> bool {
        self.forms.contains_key(&key)
    }

    pub fn form_parent(&self, key: FormKey) -> Option<WindowKey> {
        self.forms.get(&key).map(|spec| spec.parent)
    }

    pub fn create_window(&self, key: WindowKey) -> Result<WindowRuntime, RuntimeError> {
        let ctor = self
            .windows
            .get(&key)
            .ok_or(RuntimeError::UnknownWindow(key))?;
        Ok(WindowRuntime::new(key, ctor()))
    }

    pub fn create_form(
        &self,
        key: FormKey,
        owning_window: WindowKey,
    ) -> Result<FormRuntime, RuntimeError> {
        let spec = self.forms.get(&key).ok_or(RuntimeError::UnknownForm(key))?;
        if spec.parent != owning_window {
            return Err(RuntimeError::ParentMismatch {
                form: key,
                expected: spec.parent,
                actual: owning_window,
            });
        }
        Ok(FormRuntime::new(key, spec.parent, (spec.ctor)()))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut windows = self.windows.keys().collect::<Vec<_>>();
        windows.sort();
        let mut forms = self
            .forms
            .iter()
            .map(|(key, spec)| (key, spec.parent))
            .collect::<Vec<_>>();
        forms.sort();
        f.debug_struct("Registry")
            .field("windows", &windows)
            .field("forms", &forms)
            .finish()
    }
}
