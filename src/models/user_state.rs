use serde::{Deserialize, Serialize};

/// Step of the bookmark registration wizard. Persisted as an integer so that
/// a half-finished registration survives a restart of the bot. At most one
/// row per user; the absence of a row means the same as
/// [`WizardState::Finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum WizardState {
    AwaitingLocation = 1,
    AwaitingWind = 2,
    AwaitingTemp = 3,
    AwaitingDayFilter = 4,
    Finished = -1,
}
