use std::fmt::Display;
use std::rc::Rc;

use engine::VirtualFs;
use serde::{Deserialize, Serialize};

pub(crate) const SAVE_VERSION: u32 = 1;
pub(crate) const SAVE_PATH: &str = "saves/party.json";
pub(crate) const TRAIL_LENGTH_MILES: u32 = 2000;
pub(crate) const MAX_HEALTH: u32 = 100;
pub(crate) const MAX_REST_DAYS: u32 = 9;

const MILES_PER_DAY: u32 = 20;
const FOOD_PER_DAY: u32 = 5;
const HEALTH_LOST_PER_DAY: u32 = 2;
const HEALTH_PER_REST_DAY: u32 = 10;

pub(crate) type SaveLoadResult<T> = Result<T, String>;

/// Travel window user data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PartyState {
    pub(crate) day: u32,
    pub(crate) miles: u32,
    pub(crate) food: u32,
    pub(crate) health: u32,
}

impl Default for PartyState {
    fn default() -> Self {
        Self {
            day: 1,
            miles: 0,
            food: 500,
            health: MAX_HEALTH,
        }
    }
}

impl PartyState {
    pub(crate) fn arrived(&self) -> bool {
        self.miles >= TRAIL_LENGTH_MILES
    }

    pub(crate) fn miles_remaining(&self) -> u32 {
        TRAIL_LENGTH_MILES.saturating_sub(self.miles)
    }

    /// One day on the trail. Starving parties lose health twice as fast.
    pub(crate) fn advance_day(&mut self) {
        if self.arrived() {
            return;
        }
        self.day = self.day.saturating_add(1);
        self.miles = (self.miles + MILES_PER_DAY).min(TRAIL_LENGTH_MILES);
        let health_lost = if self.food >= FOOD_PER_DAY {
            self.food -= FOOD_PER_DAY;
            HEALTH_LOST_PER_DAY
        } else {
            self.food = 0;
            HEALTH_LOST_PER_DAY * 2
        };
        self.health = self.health.saturating_sub(health_lost);
    }

    pub(crate) fn rest(&mut self, days: u32) {
        self.day = self.day.saturating_add(days);
        self.food = self.food.saturating_sub(FOOD_PER_DAY * days);
        self.health = (self.health + HEALTH_PER_REST_DAY * days).min(MAX_HEALTH);
    }

    pub(crate) fn summary(&self) -> String {
        format!(
            "Day {} | Miles {}/{} | Food {} lbs | Health {}",
            self.day, self.miles, TRAIL_LENGTH_MILES, self.food, self.health
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SaveGame {
    pub(crate) save_version: u32,
    pub(crate) party: PartyState,
}

/// Where the travel window keeps its save file.
#[derive(Clone)]
pub(crate) struct SaveSlot {
    fs: Rc<dyn VirtualFs>,
    path: String,
}

impl SaveSlot {
    pub(crate) fn new(fs: Rc<dyn VirtualFs>, path: impl Into<String>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn save(&self, party: &PartyState) -> SaveLoadResult<()> {
        let save = SaveGame {
            save_version: SAVE_VERSION,
            party: party.clone(),
        };
        let json = serde_json::to_string_pretty(&save)
            .map_err(|error| format!("encode save json: {error}"))?;
        self.fs
            .write_atomic(&self.path, &json)
            .map_err(|error| format!("write save '{}': {error}", self.path))
    }

    pub(crate) fn load(&self) -> SaveLoadResult<PartyState> {
        let raw = self
            .fs
            .read_to_string(&self.path)
            .map_err(|error| format!("read save '{}': {error}", self.path))?;
        let save = parse_save_game_json(&raw)?;
        validate_save_game(&save)?;
        Ok(save.party)
    }
}

pub(crate) fn parse_save_game_json(raw: &str) -> SaveLoadResult<SaveGame> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, SaveGame>(&mut deserializer) {
        Ok(save) => Ok(save),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse save json: {source}"))
            } else {
                Err(format!("parse save json at {path}: {source}"))
            }
        }
    }
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> String {
    format!("validation failed at {path}: expected {expected}, got {actual}")
}

pub(crate) fn validate_save_game(save: &SaveGame) -> SaveLoadResult<()> {
    if save.save_version != SAVE_VERSION {
        return Err(expected_actual(
            "save_version",
            SAVE_VERSION,
            save.save_version,
        ));
    }
    if save.party.day == 0 {
        return Err(expected_actual("party.day", "at least 1", save.party.day));
    }
    if save.party.miles > TRAIL_LENGTH_MILES {
        return Err(expected_actual(
            "party.miles",
            format!("at most {TRAIL_LENGTH_MILES}"),
            save.party.miles,
        ));
    }
    if save.party.health > MAX_HEALTH {
        return Err(expected_actual(
            "party.health",
            format!("at most {MAX_HEALTH}"),
            save.party.health,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use engine::MemoryFs;
    use serde_json::json;

    use super::*;

    fn slot() -> (Rc<MemoryFs>, SaveSlot) {
        let fs = Rc::new(MemoryFs::new());
        let slot = SaveSlot::new(fs.clone(), SAVE_PATH);
        (fs, slot)
    }

    #[test]
    fn advancing_consumes_food_and_health() {
        let mut party = PartyState::default();

        party.advance_day();

        assert_eq!(
            party,
            PartyState {
                day: 2,
                miles: 20,
                food: 495,
                health: 98,
            }
        );
    }

    #[test]
    fn starving_party_loses_health_faster() {
        let mut party = PartyState {
            food: 3,
            ..PartyState::default()
        };

        party.advance_day();

        assert_eq!(party.food, 0);
        assert_eq!(party.health, 96);
    }

    #[test]
    fn arrived_party_stops_advancing() {
        let mut party = PartyState {
            miles: TRAIL_LENGTH_MILES - 5,
            ..PartyState::default()
        };

        party.advance_day();
        let arrived = party.clone();
        party.advance_day();

        assert!(arrived.arrived());
        assert_eq!(arrived.miles, TRAIL_LENGTH_MILES);
        assert_eq!(party, arrived);
    }

    #[test]
    fn resting_restores_health_up_to_max() {
        let mut party = PartyState {
            health: 75,
            ..PartyState::default()
        };

        party.rest(3);

        assert_eq!(party.day, 4);
        assert_eq!(party.food, 485);
        assert_eq!(party.health, MAX_HEALTH);
    }

    #[test]
    fn save_and_load_through_virtual_fs() {
        let (fs, slot) = slot();
        let party = PartyState {
            day: 12,
            miles: 220,
            food: 445,
            health: 80,
        };

        slot.save(&party).expect("save");

        assert!(fs.exists(SAVE_PATH));
        assert_eq!(slot.load().expect("load"), party);
    }

    #[test]
    fn load_without_save_reports_read_error() {
        let (_fs, slot) = slot();

        let err = slot.load().expect_err("missing");

        assert!(err.starts_with("read save 'saves/party.json'"));
    }

    #[test]
    fn parse_error_reports_field_path() {
        let raw = json!({
            "save_version": SAVE_VERSION,
            "party": { "day": "twelve", "miles": 0, "food": 0, "health": 0 }
        })
        .to_string();

        let err = parse_save_game_json(&raw).expect_err("bad day");

        assert!(err.starts_with("parse save json at party.day:"), "{err}");
    }

    #[test]
    fn unknown_top_level_field_is_rejected() {
        let raw = json!({
            "save_version": SAVE_VERSION,
            "party": PartyState::default(),
            "extra": true
        })
        .to_string();

        assert!(parse_save_game_json(&raw).is_err());
    }

    #[test]
    fn version_mismatch_fails_validation() {
        let save = SaveGame {
            save_version: SAVE_VERSION + 1,
            party: PartyState::default(),
        };

        let err = validate_save_game(&save).expect_err("version");

        assert_eq!(
            err,
            format!(
                "validation failed at save_version: expected {SAVE_VERSION}, got {}",
                SAVE_VERSION + 1
            )
        );
    }

    #[test]
    fn out_of_range_party_fails_validation() {
        let save = SaveGame {
            save_version: SAVE_VERSION,
            party: PartyState {
                health: MAX_HEALTH + 1,
                ..PartyState::default()
            },
        };

        let err = validate_save_game(&save).expect_err("health");

        assert!(err.starts_with("validation failed at party.health"));
    }
}
