use tracing::{debug, info};

use super::form::FormRuntime;
use super::registry::Registry;
use super::window::{WindowEffects, WindowRuntime};
use super::{FormKey, RuntimeError, TickInfo, WindowKey};

/// Insertion-ordered stack of live windows. The last entry is focused and is
/// the only one that receives ticks and input.
#[derive(Debug)]
pub struct WindowManager {
    registry: Registry,
    windows: Vec<WindowRuntime>,
    restart_requested: bool,
}

impl WindowManager {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            windows: Vec::new(),
            restart_requested: false,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn contains(&self, key: WindowKey) -> bool {
        self.position(key).is_some()
    }

    pub fn keys(&self) -> Vec<WindowKey> {
        self.windows.iter().map(WindowRuntime::key).collect()
    }

    pub fn focused(&self) -> Option<&WindowRuntime> {
        self.windows.last()
    }

    pub fn focused_mut(&mut self) -> Option<&mut WindowRuntime> {
        self.windows.last_mut()
    }

    pub fn window(&self, key: WindowKey) -> Option<&WindowRuntime> {
        self.windows.iter().find(|window| window.key() == key)
    }

    pub fn window_mut(&mut self, key: WindowKey) -> Option<&mut WindowRuntime> {
        self.windows.iter_mut().find(|window| window.key() == key)
    }

    /// Opens a window, or re-runs `on_activate` when it is already open.
    pub fn add(&mut self, key: WindowKey) -> Result<(), RuntimeError> {
        if let Some(index) = self.position(key) {
            let effects = self.windows[index].activate(&self.registry)?;
            debug!(window = %key, "window_reactivated");
            return self.apply_effects(effects);
        }

        let window = self.registry.create_window(key)?;
        self.windows.push(window);
        info!(window = %key, window_count = self.windows.len(), "window_added");

        let mut effects = WindowEffects::default();
        for existing in self.keys() {
            let Some(index) = self.position(existing) else {
                continue;
            };
            let window = &mut self.windows[index];
            let next = if existing == key {
                window.post_create(&self.registry)?
            } else {
                window.window_added(&self.registry, key)?
            };
            effects.merge(next);
        }
        self.apply_effects(effects)
    }

    /// Flags a window for removal at the next sweep. Unknown keys are ignored.
    pub fn remove(&mut self, key: WindowKey) -> bool {
        match self.window_mut(key) {
            Some(window) => {
                window.mark_for_removal();
                true
            }
            None => false,
        }
    }

    pub fn on_tick(&mut self, tick: TickInfo) -> Result<(), RuntimeError> {
        if self.focused().is_some_and(WindowRuntime::should_remove) {
            self.sweep()?;
        }

        let Some(window) = self.windows.last_mut() else {
            return Ok(());
        };
        let effects = window.tick(&self.registry, tick)?;
        self.apply_effects(effects)
    }

    /// Drops every window without running any hook.
    pub fn clear(&mut self) {
        if !self.windows.is_empty() {
            info!(window_count = self.windows.len(), "windows_cleared");
        }
        self.windows.clear();
    }

    /// Builds a form for `parent` without attaching it anywhere.
    pub fn create_form(&self, parent: WindowKey, form: FormKey) -> Result<FormRuntime, RuntimeError> {
        self.registry.create_form(form, parent)
    }

    /// Attaches a form to an open window. Returns `false` when the window is
    /// not open.
    pub fn set_form(&mut self, window: WindowKey, form: FormKey) -> Result<bool, RuntimeError> {
        let Some(index) = self.position(window) else {
            return Ok(false);
        };
        let effects = self.windows[index].set_form(&self.registry, form)?;
        self.apply_effects(effects)?;
        Ok(true)
    }

    pub fn clear_form(&mut self, window: WindowKey) -> bool {
        match self.window_mut(window) {
            Some(window) => {
                window.clear_form();
                true
            }
            None => false,
        }
    }

    pub fn accepting_input(&self) -> bool {
        self.focused().is_some_and(WindowRuntime::accepts_input)
    }

    pub fn input_fills_buffer(&self) -> bool {
        self.focused()
            .is_some_and(WindowRuntime::input_fills_buffer)
    }

    pub fn prompt_text(&self) -> Option<String> {
        self.focused().map(WindowRuntime::prompt_text)
    }

    pub fn render_focused(&mut self) -> String {
        self.windows
            .last_mut()
            .map(WindowRuntime::render)
            .unwrap_or_default()
    }

    /// Routes a submitted line to the focused window.
    pub fn dispatch_input(&mut self, line: &str) -> Result<(), RuntimeError> {
        let Some(window) = self.windows.last_mut() else {
            return Ok(());
        };
        let effects = window.dispatch_input(&self.registry, line)?;
        self.apply_effects(effects)
    }

    pub(crate) fn take_restart_request(&mut self) -> bool {
        std::mem::take(&mut self.restart_requested)
    }

    fn sweep(&mut self) -> Result<(), RuntimeError> {
        // Removal works from a key snapshot: hooks run below may reopen windows.
        let snapshot = self.keys();
        self.windows.retain(|window| !window.should_remove());
        if snapshot.len() == self.windows.len() {
            return Ok(());
        }

        for key in snapshot.iter().filter(|key| !self.contains(**key)) {
            info!(window = %key, "window_swept");
        }

        let Some(window) = self.windows.last_mut() else {
            return Ok(());
        };
        let effects = window.activate(&self.registry)?;
        self.apply_effects(effects)
    }

    fn apply_effects(&mut self, effects: WindowEffects) -> Result<(), RuntimeError> {
        for key in effects.open_windows {
            self.add(key)?;
        }
        if effects.restart {
            self.restart_requested = true;
        }
        Ok(())
    }

    fn position(&self, key: WindowKey) -> Option<usize> {
        self.windows.iter().position(|window| window.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::super::form::{Form, FormContext};
    use super::super::window::{Window, WindowContext};
    use super::*;

    const MAIN: WindowKey = WindowKey::new("main");
    const OVERLAY: WindowKey = WindowKey::new("overlay");
    const POPUP: WindowKey = WindowKey::new("popup");
    const MAIN_FORM: FormKey = FormKey::new("main_form");
    const OVERLAY_FORM: FormKey = FormKey::new("overlay_form");

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recording {
        key: WindowKey,
        log: Log,
    }

    impl Recording {
        fn record(&self, event: &str) {
            self.log.borrow_mut().push(format!("{}:{event}", self.key));
        }
    }

    impl Window for Recording {
        fn on_post_create(&mut self, _ctx: &mut WindowContext<'_>) {
            self.record("post_create");
        }

        fn on_window_added(&mut self, _ctx: &mut WindowContext<'_>, added: WindowKey) {
            self.record(&format!("window_added({added})"));
        }

        fn on_activate(&mut self, _ctx: &mut WindowContext<'_>) {
            self.record("activate");
        }

        fn on_tick(&mut self, _ctx: &mut WindowContext<'_>, _tick: TickInfo) {
            self.record("tick");
        }
    }

    struct ClosingForm;

    impl Form for ClosingForm {
        fn on_tick(&mut self, ctx: &mut FormContext<'_>, _tick: TickInfo) {
            ctx.remove_window();
        }

        fn on_input(&mut self, ctx: &mut FormContext<'_>, input: &str) {
            if input == "popup" {
                ctx.add_window(POPUP);
            }
        }
    }

    fn manager() -> (WindowManager, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = Registry::new();
        for key in [MAIN, OVERLAY, POPUP] {
            let log = Rc::clone(&log);
            registry
                .register_window(key, move || Recording {
                    key,
                    log: Rc::clone(&log),
                })
                .expect("register window");
        }
        registry
            .register_form(MAIN_FORM, MAIN, || ClosingForm)
            .expect("main form");
        registry
            .register_form(OVERLAY_FORM, OVERLAY, || ClosingForm)
            .expect("overlay form");
        (WindowManager::new(registry), log)
    }

    fn drain(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.borrow_mut())
    }

    fn tick() -> TickInfo {
        TickInfo {
            is_system_tick: false,
            skip_advance: false,
            logic_tick: 1,
        }
    }

    #[test]
    fn overlay_scenario_restores_focus_and_reactivates() {
        let (mut manager, log) = manager();

        manager.add(MAIN).expect("main");
        assert_eq!(manager.focused().map(WindowRuntime::key), Some(MAIN));
        assert_eq!(drain(&log), vec!["main:post_create"]);

        manager.add(OVERLAY).expect("overlay");
        assert_eq!(manager.focused().map(WindowRuntime::key), Some(OVERLAY));
        assert_eq!(
            drain(&log),
            vec!["main:window_added(overlay)", "overlay:post_create"]
        );

        assert!(manager.remove(OVERLAY));
        manager.on_tick(tick()).expect("tick");

        assert_eq!(manager.keys(), vec![MAIN]);
        assert_eq!(drain(&log), vec!["main:activate", "main:tick"]);
    }

    #[test]
    fn focus_tracks_most_recent_live_add() {
        let (mut manager, _log) = manager();
        let sequences: [&[WindowKey]; 4] = [
            &[MAIN],
            &[MAIN, OVERLAY, POPUP],
            &[POPUP, MAIN, OVERLAY, MAIN],
            &[OVERLAY, OVERLAY, POPUP],
        ];

        for sequence in sequences {
            manager.clear();
            let mut expected = Vec::<WindowKey>::new();
            for key in sequence {
                manager.add(*key).expect("add");
                if !expected.contains(key) {
                    expected.push(*key);
                }
            }
            assert_eq!(manager.keys(), expected);
            assert_eq!(
                manager.focused().map(WindowRuntime::key),
                expected.last().copied()
            );
        }
    }

    #[test]
    fn duplicate_add_only_reactivates() {
        let (mut manager, log) = manager();
        manager.add(MAIN).expect("main");
        manager.add(OVERLAY).expect("overlay");
        drain(&log);

        manager.add(MAIN).expect("again");

        assert_eq!(manager.len(), 2);
        assert_eq!(drain(&log), vec!["main:activate"]);
        assert_eq!(manager.focused().map(WindowRuntime::key), Some(OVERLAY));
    }

    #[test]
    fn tick_with_no_windows_is_a_no_op() {
        let (mut manager, log) = manager();

        manager.on_tick(tick()).expect("tick");
        manager.dispatch_input("1").expect("input");

        assert!(manager.is_empty());
        assert!(drain(&log).is_empty());
        assert!(!manager.accepting_input());
        assert_eq!(manager.render_focused(), "");
    }

    #[test]
    fn form_requested_removal_is_swept_next_tick() {
        let (mut manager, log) = manager();
        manager.add(MAIN).expect("main");
        manager.add(OVERLAY).expect("overlay");
        assert!(manager.set_form(OVERLAY, OVERLAY_FORM).expect("attach"));
        drain(&log);

        manager.on_tick(tick()).expect("first tick");
        assert_eq!(manager.len(), 2);
        assert!(manager.focused().is_some_and(WindowRuntime::should_remove));

        manager.on_tick(tick()).expect("second tick");
        assert_eq!(manager.keys(), vec![MAIN]);
        assert_eq!(
            drain(&log),
            vec!["overlay:tick", "main:activate", "main:tick"]
        );
    }

    #[test]
    fn removal_of_unknown_or_background_window() {
        let (mut manager, log) = manager();
        manager.add(MAIN).expect("main");
        manager.add(OVERLAY).expect("overlay");
        drain(&log);

        assert!(!manager.remove(POPUP));
        assert!(manager.remove(MAIN));
        manager.on_tick(tick()).expect("tick");

        // Only a flagged focused window triggers a sweep.
        assert_eq!(manager.len(), 2);
        assert_eq!(drain(&log), vec!["overlay:tick"]);
    }

    #[test]
    fn form_input_can_open_windows() {
        let (mut manager, log) = manager();
        manager.add(MAIN).expect("main");
        manager.set_form(MAIN, MAIN_FORM).expect("attach");
        drain(&log);

        manager.dispatch_input("popup").expect("input");

        assert_eq!(manager.focused().map(WindowRuntime::key), Some(POPUP));
        assert_eq!(
            drain(&log),
            vec!["main:window_added(popup)", "popup:post_create"]
        );
    }

    #[test]
    fn mismatched_form_is_fatal_for_every_pair() {
        let (mut manager, _log) = manager();
        manager.add(MAIN).expect("main");
        manager.add(OVERLAY).expect("overlay");
        manager.add(POPUP).expect("popup");

        for (window, form) in [
            (MAIN, OVERLAY_FORM),
            (OVERLAY, MAIN_FORM),
            (POPUP, MAIN_FORM),
            (POPUP, OVERLAY_FORM),
        ] {
            let expected = manager.registry().form_parent(form).expect("parent");
            assert_eq!(
                manager.set_form(window, form),
                Err(RuntimeError::ParentMismatch {
                    form,
                    expected,
                    actual: window,
                })
            );
            assert!(manager.create_form(window, form).is_err());
            assert_eq!(manager.window(window).and_then(|w| w.current_form()), None);
        }
    }

    #[test]
    fn unknown_window_is_fatal() {
        let (mut manager, _log) = manager();
        let missing = WindowKey::new("missing");

        assert_eq!(manager.add(missing), Err(RuntimeError::UnknownWindow(missing)));
        assert!(manager.is_empty());
    }

    #[test]
    fn clear_drops_windows_without_hooks() {
        let (mut manager, log) = manager();
        manager.add(MAIN).expect("main");
        manager.add(OVERLAY).expect("overlay");
        drain(&log);

        manager.clear();

        assert!(manager.is_empty());
        assert!(manager.focused().is_none());
        assert!(drain(&log).is_empty());
    }
}
