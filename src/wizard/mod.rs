//! Bookmark registration wizard: walks a user through four ordered questions
//! (location, wind limit, temperature floor, day filter) and turns the answers
//! into one ready bookmark.
//!
//! The decision logic lives in [`handle_input`], a pure function over the
//! current step and the raw message text; [`Wizard`] wraps it with persistence
//! so that a half-finished registration survives restarts and duplicate
//! messages.

use anyhow::{Context, Result};

use crate::database::Database;
use crate::models::{CheckPeriod, WizardState};

/// Inline query answers prefix their message text with this token so the
/// first wizard step can tell a location pick from arbitrary chatter.
pub const LOCATION_ID_PREFIX: &str = "loc:";

pub const BUTTON_ALL_DAYS: &str = "Every day";
pub const BUTTON_ONLY_WEEKENDS: &str = "Only weekends";

const PROMPT_WIND: &str =
    "Ok, now enter the max wind speed (in mph) that is comfortable for you in that location";
const PROMPT_TEMP: &str =
    "Got it, now send me the lowest day temperature (in ˚C) that still suits you";
const PROMPT_DAY_FILTER: &str =
    "And the last thing: should I check the weather every day or only for weekends?";
const REPLY_FINISHED: &str =
    "All done, this location was saved for you. I will drop you a message when the weather looks good there.";

/// The single bookmark mutation one successful wizard step produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEffect {
    SetLocation(String),
    SetMaxWindSpeed(i64),
    SetLowestTemp(i64),
    SetCheckPeriod(CheckPeriod),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Input accepted: persist the effect, move to `next`, answer with `reply`.
    Advanced {
        next: WizardState,
        effect: StepEffect,
        reply: String,
    },
    /// Input not understood: answer with `reply`, state stays put.
    Rejected { reply: String },
}

/// Pure transition function of the wizard. No side effects here; callers
/// persist the effect and the next state themselves.
pub fn handle_input(state: WizardState, input: &str) -> StepOutcome {
    let input = input.trim();

    match state {
        WizardState::AwaitingLocation => match parse_location_token(input) {
            Some(location_id) => StepOutcome::Advanced {
                next: WizardState::AwaitingWind,
                effect: StepEffect::SetLocation(location_id),
                reply: PROMPT_WIND.to_string(),
            },
            None => StepOutcome::Rejected {
                reply: "That doesn't look like a location. Please pick one from the \
                        suggestions: type the bot name followed by a place name, \
                        like `@weather_observer_bot London`"
                    .to_string(),
            },
        },

        WizardState::AwaitingWind => match input.parse::<i64>() {
            Ok(speed) => StepOutcome::Advanced {
                next: WizardState::AwaitingTemp,
                effect: StepEffect::SetMaxWindSpeed(speed),
                reply: PROMPT_TEMP.to_string(),
            },
            Err(_) => StepOutcome::Rejected {
                reply: "I expected a whole number of mph, like 15. Please try again."
                    .to_string(),
            },
        },

        WizardState::AwaitingTemp => match input.parse::<i64>() {
            Ok(temp) => StepOutcome::Advanced {
                next: WizardState::AwaitingDayFilter,
                effect: StepEffect::SetLowestTemp(temp),
                reply: PROMPT_DAY_FILTER.to_string(),
            },
            Err(_) => StepOutcome::Rejected {
                reply: "I expected a whole number of degrees, like 10. Please try again."
                    .to_string(),
            },
        },

        WizardState::AwaitingDayFilter => match parse_day_filter(input) {
            Some(period) => StepOutcome::Advanced {
                next: WizardState::Finished,
                effect: StepEffect::SetCheckPeriod(period),
                reply: REPLY_FINISHED.to_string(),
            },
            None => StepOutcome::Rejected {
                reply: format!(
                    "Please answer with one of the buttons: \"{}\" or \"{}\"",
                    BUTTON_ALL_DAYS, BUTTON_ONLY_WEEKENDS
                ),
            },
        },

        WizardState::Finished => StepOutcome::Rejected {
            reply: "We are done already. Call /add to watch one more location.".to_string(),
        },
    }
}

fn parse_location_token(input: &str) -> Option<String> {
    let id = input.strip_prefix(LOCATION_ID_PREFIX)?.trim();
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}

fn parse_day_filter(input: &str) -> Option<CheckPeriod> {
    if input.eq_ignore_ascii_case(BUTTON_ALL_DAYS) {
        Some(CheckPeriod::AllDays)
    } else if input.eq_ignore_ascii_case(BUTTON_ONLY_WEEKENDS) {
        Some(CheckPeriod::WeekendsOnly)
    } else {
        None
    }
}

/// The persisted wizard for one user.
pub struct Wizard<'a> {
    db: &'a Database,
    user_id: i64,
    state: WizardState,
}

impl<'a> Wizard<'a> {
    /// Loads the user's current step; absence of a state row means there is
    /// no registration in flight.
    pub async fn load(db: &'a Database, user_id: i64) -> Result<Wizard<'a>> {
        let state = db
            .user_state(user_id)
            .await?
            .unwrap_or(WizardState::Finished);
        Ok(Wizard { db, user_id, state })
    }

    /// Begins a fresh registration. Any previous state and unfinished
    /// bookmark are dropped first, so a retry always starts clean.
    pub async fn start(db: &'a Database, user_id: i64, chat_id: i64) -> Result<Wizard<'a>> {
        db.delete_user_state(user_id).await?;
        db.delete_unfinished_bookmarks(user_id).await?;
        db.create_unfinished_bookmark(user_id, chat_id).await?;
        db.save_user_state(user_id, WizardState::AwaitingLocation)
            .await?;

        Ok(Wizard {
            db,
            user_id,
            state: WizardState::AwaitingLocation,
        })
    }

    pub fn current_state(&self) -> WizardState {
        self.state
    }

    /// Feeds one message into the wizard. Returns the reply for the user, or
    /// `None` when no registration is in flight (nothing to do, nothing
    /// changed). Rejected input leaves both the state and the bookmark as
    /// they were.
    pub async fn advance(&mut self, input: &str) -> Result<Option<String>> {
        if self.state == WizardState::Finished {
            return Ok(None);
        }

        let (next, effect, reply) = match handle_input(self.state, input) {
            StepOutcome::Rejected { reply } => return Ok(Some(reply)),
            StepOutcome::Advanced {
                next,
                effect,
                reply,
            } => (next, effect, reply),
        };

        // The location must resolve against the catalog, not just parse.
        if let StepEffect::SetLocation(location_id) = &effect {
            if self.db.location_by_id(location_id).await?.is_none() {
                return Ok(Some(
                    "I don't know that location, sorry. Please pick one from the suggestions."
                        .to_string(),
                ));
            }
        }

        let bookmark = self
            .db
            .unfinished_bookmark(self.user_id)
            .await?
            .context("wizard step with no unfinished bookmark behind it")?;

        match &effect {
            StepEffect::SetLocation(location_id) => {
                self.db.set_bookmark_location(bookmark.id, location_id).await?
            }
            StepEffect::SetMaxWindSpeed(speed) => {
                self.db.set_bookmark_max_wind_speed(bookmark.id, *speed).await?
            }
            StepEffect::SetLowestTemp(temp) => {
                self.db.set_bookmark_lowest_temp(bookmark.id, *temp).await?
            }
            StepEffect::SetCheckPeriod(period) => {
                self.db.set_bookmark_check_period(bookmark.id, *period).await?
            }
        }

        if next == WizardState::Finished {
            self.db.mark_bookmark_ready(bookmark.id).await?;
            self.db.delete_user_state(self.user_id).await?;
            log::info!(
                "User {} finished registering bookmark {} for location {}",
                self.user_id,
                bookmark.id,
                bookmark.location_id
            );
        } else {
            self.db.save_user_state(self.user_id, next).await?;
        }

        self.state = next;
        Ok(Some(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SiteLocation;

    const TEST_LOCATION_ID: &str = "3772";
    const USER_ID: i64 = 111;
    const USER2_ID: i64 = 222;

    async fn prepare_db() -> Database {
        let db = Database::open_in_memory().await;
        db.insert_locations(&[SiteLocation {
            id: TEST_LOCATION_ID.to_string(),
            name: "London".to_string(),
            region: "se".to_string(),
            auth_area: "Greater London".to_string(),
            national_park: String::new(),
            latitude: "51.5".to_string(),
            longitude: "-0.1".to_string(),
            elevation: "25.0".to_string(),
        }])
        .await
        .unwrap();
        db
    }

    #[test]
    fn rejects_garbage_per_step_without_advancing() {
        let cases = [
            (WizardState::AwaitingLocation, "just some text"),
            (WizardState::AwaitingLocation, "loc:abc"),
            (WizardState::AwaitingLocation, "loc:"),
            (WizardState::AwaitingWind, "breezy"),
            (WizardState::AwaitingWind, "12.5"),
            (WizardState::AwaitingTemp, "warm"),
            (WizardState::AwaitingDayFilter, "sometimes"),
        ];

        for (state, input) in cases {
            assert!(
                matches!(handle_input(state, input), StepOutcome::Rejected { .. }),
                "{:?} should reject {:?}",
                state,
                input
            );
        }
    }

    #[test]
    fn accepts_negative_temperatures_and_trims_whitespace() {
        match handle_input(WizardState::AwaitingTemp, "  -5 ") {
            StepOutcome::Advanced { next, effect, .. } => {
                assert_eq!(next, WizardState::AwaitingDayFilter);
                assert_eq!(effect, StepEffect::SetLowestTemp(-5));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn day_filter_choices_map_to_check_periods() {
        match handle_input(WizardState::AwaitingDayFilter, BUTTON_ALL_DAYS) {
            StepOutcome::Advanced { next, effect, .. } => {
                assert_eq!(next, WizardState::Finished);
                assert_eq!(effect, StepEffect::SetCheckPeriod(CheckPeriod::AllDays));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        match handle_input(WizardState::AwaitingDayFilter, "only weekends") {
            StepOutcome::Advanced { effect, .. } => {
                assert_eq!(
                    effect,
                    StepEffect::SetCheckPeriod(CheckPeriod::WeekendsOnly)
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn full_registration_produces_one_ready_bookmark() {
        let db = prepare_db().await;

        let mut wizard = Wizard::start(&db, USER_ID, 500).await.unwrap();
        assert_eq!(wizard.current_state(), WizardState::AwaitingLocation);

        wizard
            .advance(&format!("{}{}", LOCATION_ID_PREFIX, TEST_LOCATION_ID))
            .await
            .unwrap();
        assert_eq!(wizard.current_state(), WizardState::AwaitingWind);

        wizard.advance("20").await.unwrap();
        assert_eq!(wizard.current_state(), WizardState::AwaitingTemp);

        wizard.advance("10").await.unwrap();
        assert_eq!(wizard.current_state(), WizardState::AwaitingDayFilter);

        wizard.advance(BUTTON_ALL_DAYS).await.unwrap();
        assert_eq!(wizard.current_state(), WizardState::Finished);

        let bookmarks = db.bookmarks_for_user(USER_ID).await.unwrap();
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks[0].location_id, TEST_LOCATION_ID);
        assert_eq!(bookmarks[0].max_wind_speed, 20);
        assert_eq!(bookmarks[0].lowest_temp, 10);
        assert_eq!(bookmarks[0].check_period, CheckPeriod::AllDays);
        assert_eq!(bookmarks[0].chat_id, 500);
        assert!(bookmarks[0].is_ready);

        // terminal cleanup: the state row is gone
        assert!(db.user_state(USER_ID).await.unwrap().is_none());

        // duplicate input after the end changes nothing
        let mut reloaded = Wizard::load(&db, USER_ID).await.unwrap();
        assert_eq!(reloaded.advance(BUTTON_ALL_DAYS).await.unwrap(), None);
        assert_eq!(db.bookmarks_for_user(USER_ID).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_input_leaves_state_and_bookmark_untouched() {
        let db = prepare_db().await;

        let mut wizard = Wizard::start(&db, USER_ID, 500).await.unwrap();
        wizard
            .advance(&format!("{}{}", LOCATION_ID_PREFIX, TEST_LOCATION_ID))
            .await
            .unwrap();

        let reply = wizard.advance("very windy").await.unwrap();
        assert!(reply.is_some());
        assert_eq!(wizard.current_state(), WizardState::AwaitingWind);
        assert_eq!(
            db.user_state(USER_ID).await.unwrap(),
            Some(WizardState::AwaitingWind)
        );

        let bookmark = db.unfinished_bookmark(USER_ID).await.unwrap().unwrap();
        assert_eq!(bookmark.max_wind_speed, 0);
    }

    #[tokio::test]
    async fn unknown_location_is_rejected_in_place() {
        let db = prepare_db().await;

        let mut wizard = Wizard::start(&db, USER_ID, 500).await.unwrap();
        let reply = wizard.advance("loc:99999").await.unwrap();

        assert!(reply.unwrap().contains("don't know"));
        assert_eq!(wizard.current_state(), WizardState::AwaitingLocation);
    }

    #[tokio::test]
    async fn wizard_state_survives_a_reload() {
        let db = prepare_db().await;

        let mut wizard = Wizard::start(&db, USER_ID, 500).await.unwrap();
        wizard
            .advance(&format!("{}{}", LOCATION_ID_PREFIX, TEST_LOCATION_ID))
            .await
            .unwrap();
        wizard.advance("20").await.unwrap();
        drop(wizard);

        // as after a bot restart: the next message resumes where we stopped
        let mut resumed = Wizard::load(&db, USER_ID).await.unwrap();
        assert_eq!(resumed.current_state(), WizardState::AwaitingTemp);

        resumed.advance("10").await.unwrap();
        assert_eq!(resumed.current_state(), WizardState::AwaitingDayFilter);
    }

    #[tokio::test]
    async fn restart_drops_the_previous_unfinished_bookmark() {
        let db = prepare_db().await;

        let mut wizard = Wizard::start(&db, USER_ID, 500).await.unwrap();
        wizard
            .advance(&format!("{}{}", LOCATION_ID_PREFIX, TEST_LOCATION_ID))
            .await
            .unwrap();
        wizard.advance("20").await.unwrap();

        // user changed their mind mid-way and starts over
        let wizard = Wizard::start(&db, USER_ID, 500).await.unwrap();
        assert_eq!(wizard.current_state(), WizardState::AwaitingLocation);

        let bookmarks = db.bookmarks_for_user(USER_ID).await.unwrap();
        assert_eq!(bookmarks.len(), 1, "at most one unfinished bookmark");
        assert_eq!(bookmarks[0].location_id, "");
        assert_eq!(bookmarks[0].max_wind_speed, 0);
    }

    #[tokio::test]
    async fn two_users_register_independently() {
        let db = prepare_db().await;

        let mut first = Wizard::start(&db, USER_ID, 500).await.unwrap();
        first
            .advance(&format!("{}{}", LOCATION_ID_PREFIX, TEST_LOCATION_ID))
            .await
            .unwrap();
        first.advance("20").await.unwrap();
        first.advance("10").await.unwrap();
        first.advance(BUTTON_ALL_DAYS).await.unwrap();

        let mut second = Wizard::start(&db, USER2_ID, 600).await.unwrap();
        second
            .advance(&format!("{}{}", LOCATION_ID_PREFIX, TEST_LOCATION_ID))
            .await
            .unwrap();
        second.advance("30").await.unwrap();
        second.advance("5").await.unwrap();
        second.advance(BUTTON_ONLY_WEEKENDS).await.unwrap();

        let first_bookmarks = db.bookmarks_for_user(USER_ID).await.unwrap();
        let second_bookmarks = db.bookmarks_for_user(USER2_ID).await.unwrap();

        assert_eq!(first_bookmarks.len(), 1);
        assert_eq!(first_bookmarks[0].max_wind_speed, 20);
        assert_eq!(first_bookmarks[0].lowest_temp, 10);
        assert_eq!(first_bookmarks[0].check_period, CheckPeriod::AllDays);
        assert!(first_bookmarks[0].is_ready);

        assert_eq!(second_bookmarks.len(), 1);
        assert_eq!(second_bookmarks[0].max_wind_speed, 30);
        assert_eq!(second_bookmarks[0].lowest_temp, 5);
        assert_eq!(second_bookmarks[0].check_period, CheckPeriod::WeekendsOnly);
        assert!(second_bookmarks[0].is_ready);
    }
}
