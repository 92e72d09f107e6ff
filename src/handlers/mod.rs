pub mod callbacks;
pub mod commands;
pub mod inline;
pub mod messages;
pub mod utils;

pub use callbacks::callback_handler;
pub use commands::command_handler;
pub use inline::inline_query_handler;
pub use messages::message_handler;

use chrono::{DateTime, NaiveTime, Utc};
use teloxide::prelude::*;

use crate::checker::{check_weather, deliver_reports};
use crate::database::Database;
use crate::metoffice::MetOfficeClient;

// The nightly batch runs once a day, early enough for the "good weekend
// coming" messages to wait in the chat at breakfast time.
const DAILY_CHECK_HOUR: u32 = 1;
const DAILY_CHECK_MINUTE: u32 = 10;

/// The first daily-check instant strictly after `after`.
pub fn next_daily_run(after: DateTime<Utc>) -> DateTime<Utc> {
    let check_time =
        NaiveTime::from_hms_opt(DAILY_CHECK_HOUR, DAILY_CHECK_MINUTE, 0).unwrap_or_default();
    let today = after.date_naive().and_time(check_time).and_utc();

    if today > after {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Background task: evaluates every ready bookmark once a day and delivers
/// the notifications. A failed round is logged and the task simply waits for
/// the next day.
pub async fn daily_check_task(bot: Bot, db: Database, metoffice: MetOfficeClient) {
    loop {
        let now = Utc::now();
        let next = next_daily_run(now);
        log::info!("Next scheduled weather check at {}", next);

        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        match check_weather(&db, &metoffice, None).await {
            Ok(reports) => {
                log::info!(
                    "Scheduled weather check done, {} notification(s) to send",
                    reports.len()
                );
                deliver_reports(&bot, &reports).await;
            }
            Err(e) => log::error!("Scheduled weather check failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_run_is_later_today_before_the_check_time() {
        let now = Utc.with_ymd_and_hms(2019, 10, 4, 0, 30, 0).unwrap();
        let next = next_daily_run(now);
        assert_eq!(next, Utc.with_ymd_and_hms(2019, 10, 4, 1, 10, 0).unwrap());
    }

    #[test]
    fn next_run_rolls_over_to_tomorrow_after_the_check_time() {
        let now = Utc.with_ymd_and_hms(2019, 10, 4, 1, 10, 0).unwrap();
        let next = next_daily_run(now);
        assert_eq!(next, Utc.with_ymd_and_hms(2019, 10, 5, 1, 10, 0).unwrap());

        let evening = Utc.with_ymd_and_hms(2019, 10, 4, 23, 59, 0).unwrap();
        assert_eq!(
            next_daily_run(evening),
            Utc.with_ymd_and_hms(2019, 10, 5, 1, 10, 0).unwrap()
        );
    }
}
