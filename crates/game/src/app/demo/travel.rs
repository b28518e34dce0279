use engine::{Form, FormContext, RenderContext, TickInfo, UserData, Window, WindowContext};
use tracing::{debug, info, warn};

use super::party::{PartyState, SaveSlot, MAX_REST_DAYS, TRAIL_LENGTH_MILES};
use super::{LOADING, RESTING, SAVING, TRAVELING};

pub(crate) struct TravelWindow;

impl Window for TravelWindow {
    fn create_user_data(&self) -> UserData {
        UserData::new(PartyState::default())
    }

    fn menu_header(&self, ctx: &RenderContext<'_>) -> String {
        match ctx.data::<PartyState>() {
            Some(party) if party.arrived() => {
                format!("You have reached the end of the trail on day {}.", party.day)
            }
            _ => "You stand at the side of the trail.".to_string(),
        }
    }

    fn on_post_create(&mut self, ctx: &mut WindowContext<'_>) {
        let commands = ctx.commands_mut();
        commands.add("Continue on the trail", |ctx| ctx.set_form(TRAVELING));
        commands.add("Rest", |ctx| ctx.set_form(RESTING));
        commands.add("Save", |ctx| ctx.set_form(SAVING));
        commands.add("Load", |ctx| ctx.set_form(LOADING));
        commands.add("Return to main menu", |ctx| ctx.remove_window());
    }

    fn on_activate(&mut self, ctx: &mut WindowContext<'_>) {
        debug!(window = %ctx.key(), "travel_resumed");
    }
}

/// Advances the party one day per logic tick until the player stops.
pub(crate) struct TravelingForm;

impl Form for TravelingForm {
    fn input_fills_buffer(&self) -> bool {
        false
    }

    fn prompt_text(&self) -> Option<String> {
        Some("Type anything to stop.".to_string())
    }

    fn on_tick(&mut self, ctx: &mut FormContext<'_>, tick: TickInfo) {
        if tick.is_system_tick || tick.skip_advance {
            return;
        }
        let Some(party) = ctx.data_mut::<PartyState>() else {
            return;
        };
        party.advance_day();
        if party.arrived() {
            info!(day = party.day, "trail_completed");
            ctx.clear_form();
        }
    }

    fn on_render(&mut self, ctx: &RenderContext<'_>) -> String {
        let remaining = ctx
            .data::<PartyState>()
            .map_or(TRAIL_LENGTH_MILES, PartyState::miles_remaining);
        format!("The wagon rolls on. {remaining} miles to go.")
    }

    fn on_input(&mut self, ctx: &mut FormContext<'_>, _input: &str) {
        ctx.clear_form();
    }
}

/// Asks for a number of days and rests that long.
#[derive(Default)]
pub(crate) struct RestForm {
    error: Option<String>,
}

impl Form for RestForm {
    fn prompt_text(&self) -> Option<String> {
        Some(format!(
            "How many days would you like to rest? (1-{MAX_REST_DAYS})"
        ))
    }

    fn on_render(&mut self, _ctx: &RenderContext<'_>) -> String {
        match &self.error {
            Some(error) => format!("Your party makes camp.\n{error}"),
            None => "Your party makes camp.".to_string(),
        }
    }

    fn on_input(&mut self, ctx: &mut FormContext<'_>, input: &str) {
        let days = match input.trim().parse::<u32>() {
            Ok(days) if (1..=MAX_REST_DAYS).contains(&days) => days,
            _ => {
                self.error = Some(format!(
                    "'{input}' is not a number of days between 1 and {MAX_REST_DAYS}."
                ));
                return;
            }
        };
        if let Some(party) = ctx.data_mut::<PartyState>() {
            party.rest(days);
            debug!(days, day = party.day, health = party.health, "party_rested");
        }
        ctx.clear_form();
    }
}

/// Writes the party to the save slot as soon as it is attached.
pub(crate) struct SaveForm {
    slot: SaveSlot,
    status: String,
}

impl SaveForm {
    pub(crate) fn new(slot: SaveSlot) -> Self {
        Self {
            slot,
            status: String::new(),
        }
    }
}

impl Form for SaveForm {
    fn input_fills_buffer(&self) -> bool {
        false
    }

    fn prompt_text(&self) -> Option<String> {
        Some("Type anything to continue.".to_string())
    }

    fn on_post_create(&mut self, ctx: &mut FormContext<'_>) {
        let Some(party) = ctx.data::<PartyState>() else {
            self.status = "There is no party to save.".to_string();
            return;
        };
        self.status = match self.slot.save(party) {
            Ok(()) => {
                info!(path = self.slot.path(), day = party.day, "party_saved");
                format!("Saved day {} to {}.", party.day, self.slot.path())
            }
            Err(error) => {
                warn!(error = error.as_str(), "party_save_failed");
                format!("Save failed: {error}")
            }
        };
    }

    fn on_render(&mut self, _ctx: &RenderContext<'_>) -> String {
        self.status.clone()
    }

    fn on_input(&mut self, ctx: &mut FormContext<'_>, _input: &str) {
        ctx.clear_form();
    }
}

/// Replaces the party with the saved one as soon as it is attached.
pub(crate) struct LoadForm {
    slot: SaveSlot,
    status: String,
}

impl LoadForm {
    pub(crate) fn new(slot: SaveSlot) -> Self {
        Self {
            slot,
            status: String::new(),
        }
    }
}

impl Form for LoadForm {
    fn input_fills_buffer(&self) -> bool {
        false
    }

    fn prompt_text(&self) -> Option<String> {
        Some("Type anything to continue.".to_string())
    }

    fn on_post_create(&mut self, ctx: &mut FormContext<'_>) {
        self.status = match self.slot.load() {
            Ok(loaded) => {
                let status = format!("Loaded day {} from {}.", loaded.day, self.slot.path());
                info!(path = self.slot.path(), day = loaded.day, "party_loaded");
                if let Some(party) = ctx.data_mut::<PartyState>() {
                    *party = loaded;
                }
                status
            }
            Err(error) => {
                warn!(error = error.as_str(), "party_load_failed");
                format!("Load failed: {error}")
            }
        };
    }

    fn on_render(&mut self, _ctx: &RenderContext<'_>) -> String {
        self.status.clone()
    }

    fn on_input(&mut self, ctx: &mut FormContext<'_>, _input: &str) {
        ctx.clear_form();
    }
}
