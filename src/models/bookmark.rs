use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// How often the owner wants the forecast checked for this place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum CheckPeriod {
    AllDays = 0,
    /// Friday counts as part of the weekend here.
    WeekendsOnly = 1,
}

impl Default for CheckPeriod {
    fn default() -> Self {
        CheckPeriod::AllDays
    }
}

/// One saved location per user with the desired weather envelope.
/// Created half-empty by the registration wizard and filled in step by step;
/// only rows with `is_ready = true` take part in forecast checks.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bookmark {
    pub id: i64,
    pub user_id: i64,
    pub chat_id: i64,
    pub location_id: String,
    /// Upper bound (exclusive) on acceptable wind, mph.
    pub max_wind_speed: i64,
    /// Lower bound (exclusive) on acceptable feels-like temperature, ˚C.
    pub lowest_temp: i64,
    pub check_period: CheckPeriod,
    pub is_ready: bool,
}
