mod main_menu;
mod party;
mod travel;

use std::rc::Rc;

use engine::{
    AppHooks, FormKey, Registry, RuntimeError, Settings, VirtualFs, WindowKey, WindowManager,
};
use tracing::info;

use self::main_menu::{MainMenuWindow, SettingsForm};
use self::party::{PartyState, SaveSlot, SAVE_PATH};
use self::travel::{LoadForm, RestForm, SaveForm, TravelWindow, TravelingForm};

pub(crate) const MAIN_MENU: WindowKey = WindowKey::new("main_menu");
pub(crate) const TRAVEL: WindowKey = WindowKey::new("travel");

pub(crate) const SETTINGS_VIEW: FormKey = FormKey::new("settings_view");
pub(crate) const TRAVELING: FormKey = FormKey::new("traveling");
pub(crate) const RESTING: FormKey = FormKey::new("resting");
pub(crate) const SAVING: FormKey = FormKey::new("saving");
pub(crate) const LOADING: FormKey = FormKey::new("loading");

pub(crate) fn build_registry(
    settings: Settings,
    fs: Rc<dyn VirtualFs>,
) -> Result<Registry, RuntimeError> {
    let slot = SaveSlot::new(fs, SAVE_PATH);
    let mut registry = Registry::new();

    registry.register_window(MAIN_MENU, || MainMenuWindow)?;
    registry.register_window(TRAVEL, || TravelWindow)?;

    registry.register_form(SETTINGS_VIEW, MAIN_MENU, move || {
        SettingsForm::new(settings.clone())
    })?;
    registry.register_form(TRAVELING, TRAVEL, || TravelingForm)?;
    registry.register_form(RESTING, TRAVEL, RestForm::default)?;
    {
        let slot = slot.clone();
        registry.register_form(SAVING, TRAVEL, move || SaveForm::new(slot.clone()))?;
    }
    registry.register_form(LOADING, TRAVEL, move || LoadForm::new(slot.clone()))?;

    Ok(registry)
}

/// Seeds the main menu and shows the party summary above the travel window.
#[derive(Debug, Default)]
pub(crate) struct DemoHooks;

impl AppHooks for DemoHooks {
    fn on_first_tick(&mut self, windows: &mut WindowManager) -> Result<(), RuntimeError> {
        windows.add(MAIN_MENU)
    }

    fn on_pre_render(&mut self, windows: &WindowManager) -> String {
        windows
            .window(TRAVEL)
            .and_then(|window| window.data::<PartyState>())
            .map(PartyState::summary)
            .unwrap_or_default()
    }

    fn on_shutdown(&mut self, windows: &mut WindowManager) {
        info!(window_count = windows.len(), "demo_shutdown");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::{Duration, Instant};

    use engine::{MemoryFs, Runtime, RuntimeConfig};

    use super::*;

    struct Session {
        runtime: Runtime,
        fs: Rc<MemoryFs>,
        base: Instant,
        elapsed_ms: u64,
        frames: Rc<RefCell<Vec<String>>>,
    }

    impl Session {
        fn start() -> Self {
            let fs = Rc::new(MemoryFs::new());
            let mut settings = Settings::new();
            settings.set_value("tick_interval_ms", "1000");
            let registry = build_registry(settings, fs.clone()).expect("registry");
            let config = RuntimeConfig {
                show_status_line: false,
                ..RuntimeConfig::default()
            };
            let base = Instant::now();
            let mut runtime =
                Runtime::new_at(config, registry, DemoHooks, base).expect("runtime");
            let frames = Rc::new(RefCell::new(Vec::new()));
            {
                let frames = Rc::clone(&frames);
                runtime.subscribe(move |frame| frames.borrow_mut().push(frame.to_string()));
            }
            let mut session = Self {
                runtime,
                fs,
                base,
                elapsed_ms: 0,
                frames,
            };
            session.logic_tick();
            session
        }

        fn advance(&mut self, millis: u64) {
            self.elapsed_ms += millis;
            self.runtime
                .on_tick_at(
                    true,
                    false,
                    self.base + Duration::from_millis(self.elapsed_ms),
                )
                .expect("tick");
        }

        fn logic_tick(&mut self) {
            self.advance(1000);
        }

        fn frame_tick(&mut self) {
            self.advance(16);
        }

        fn enter(&mut self, line: &str) {
            for ch in line.chars() {
                self.runtime.add_char(ch);
            }
            self.runtime.submit().expect("submit");
            self.frame_tick();
        }

        fn frame(&self) -> String {
            self.frames.borrow().last().cloned().unwrap_or_default()
        }

        fn party(&self) -> PartyState {
            self.runtime
                .windows()
                .window(TRAVEL)
                .and_then(|window| window.data::<PartyState>())
                .cloned()
                .expect("travel window with party")
        }
    }

    #[test]
    fn every_form_is_registered_under_its_window() {
        let registry =
            build_registry(Settings::new(), Rc::new(MemoryFs::new())).expect("registry");

        assert_eq!(registry.form_parent(SETTINGS_VIEW), Some(MAIN_MENU));
        for form in [TRAVELING, RESTING, SAVING, LOADING] {
            assert_eq!(registry.form_parent(form), Some(TRAVEL));
        }
    }

    #[test]
    fn main_menu_is_shown_after_first_tick() {
        let session = Session::start();

        assert_eq!(
            session.frame(),
            "THE TRAIL\nYou may:\n  1. Travel the trail\n  2. Settings\n  3. Quit\nWhat is your choice? "
        );
    }

    #[test]
    fn travel_advances_one_day_per_logic_tick() {
        let mut session = Session::start();
        session.enter("1");
        assert_eq!(session.runtime.windows().keys(), vec![MAIN_MENU, TRAVEL]);

        session.enter("continue on the trail");
        session.logic_tick();
        session.logic_tick();

        assert_eq!(session.party().day, 3);
        assert!(session.frame().starts_with("Day 3 | Miles 40/2000"));
        assert!(session.frame().contains("1960 miles to go"));
        assert!(session.frame().ends_with("Type anything to stop."));

        session.enter("stop");
        session.logic_tick();
        assert_eq!(session.party().day, 3);
    }

    #[test]
    fn bare_enter_keeps_the_wagon_rolling() {
        let mut session = Session::start();
        session.enter("1");
        session.enter("continue on the trail");

        session.enter("");
        session.logic_tick();

        let travel = session.runtime.windows().window(TRAVEL).expect("travel");
        assert_eq!(travel.current_form(), Some(TRAVELING));
        assert_eq!(session.party().day, 2);
    }

    #[test]
    fn rest_rejects_bad_input_and_accepts_days() {
        let mut session = Session::start();
        session.enter("1");
        session.enter("rest");

        session.enter("forever");
        assert!(session.frame().contains("'forever' is not a number of days"));
        assert!(session.frame().ends_with("(1-9) "));

        session.enter("2");
        assert_eq!(session.party().day, 3);
        assert!(session.frame().contains("2. Rest"));
    }

    #[test]
    fn save_then_load_restores_party() {
        let mut session = Session::start();
        session.enter("1");
        session.enter("rest");
        session.enter("4");

        session.enter("save");
        assert!(session.frame().contains("Saved day 5 to saves/party.json."));
        assert!(session.fs.exists(SAVE_PATH));
        session.enter("ok");

        session.enter("rest");
        session.enter("3");
        assert_eq!(session.party().day, 8);

        session.enter("load");
        assert!(session.frame().contains("Loaded day 5"));
        assert_eq!(session.party().day, 5);
    }

    #[test]
    fn load_without_save_reports_failure_and_keeps_party() {
        let mut session = Session::start();
        session.enter("1");

        session.enter("load");

        assert!(session.frame().contains("Load failed: read save"));
        assert_eq!(session.party(), PartyState::default());
    }

    #[test]
    fn returning_from_travel_refocuses_main_menu() {
        let mut session = Session::start();
        session.enter("1");

        session.enter("return to main menu");
        session.frame_tick();

        assert_eq!(session.runtime.windows().keys(), vec![MAIN_MENU]);
        assert!(session.frame().starts_with("THE TRAIL"));
    }

    #[test]
    fn settings_form_lists_values() {
        let mut session = Session::start();

        session.enter("settings");

        assert!(session.frame().contains("tick_interval_ms = 1000"));
        session.enter("back");
        assert!(session.frame().contains("2. Settings"));
    }

    #[test]
    fn quitting_leaves_runtime_idle() {
        let mut session = Session::start();

        session.enter("quit");
        session.frame_tick();

        assert!(session.runtime.is_idle());
    }
}
