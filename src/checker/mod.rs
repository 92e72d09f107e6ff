//! Forecast matcher: walks the ready bookmarks, pulls the multi-day forecast
//! for each one and classifies every day against the owner's weather
//! envelope. Composition is separated from delivery so the rules stay plain
//! functions: [`check_weather`] only decides and formats, the caller sends.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use chrono::{Datelike, NaiveDate, Weekday};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup};

use crate::database::Database;
use crate::graphics::weather_icon;
use crate::metoffice::{MetOfficeClient, METOFFICE_DATE_FORMAT};
use crate::models::{Bookmark, CheckPeriod};

/// A day with at least this precipitation probability (%) counts as rainy no
/// matter what the user asked for. Deliberately a named constant, not a
/// per-bookmark setting.
pub const RAIN_PROBABILITY_LIMIT: i64 = 40;

/// Friday is included on purpose: for the audience of this bot the weekend
/// starts on Friday.
pub const WEEKEND_DAYS: [Weekday; 3] = [Weekday::Fri, Weekday::Sat, Weekday::Sun];

/// Callback data prefix of the "stop observing" button under a notification.
pub const BUTTON_DELETE_BOOKMARK: &str = "del_bookmark:";

// Pause between provider calls so the batch never looks like a flood to any
// rate limiter on the other side. A courtesy, not a correctness requirement.
const PACING_DELAY: Duration = Duration::from_secs(1);

const WEATHER_TYPE_NOT_USED: i64 = 4;

/// The numeric figures of one forecast day. Each one defaults to zero when
/// the provider left it out or sent something unparseable; one bad field
/// never spoils the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayFigures {
    pub feels_like_temp: i64,
    pub wind_noon: i64,
    pub precip_probability: i64,
    pub weather_type: i64,
}

pub fn parse_number_figures(rep: &HashMap<String, String>) -> DayFigures {
    let int = |key: &str| rep.get(key).and_then(|v| v.parse().ok());

    DayFigures {
        feels_like_temp: int("FDm").unwrap_or(0),
        wind_noon: int("Gn").unwrap_or(0),
        precip_probability: int("PPd").unwrap_or(0),
        weather_type: int("W").unwrap_or(WEATHER_TYPE_NOT_USED),
    }
}

/// Should we bother the user about this weekday given their day filter?
pub fn should_bother_for_weekday(period: CheckPeriod, weekday: Weekday) -> bool {
    period == CheckPeriod::AllDays || WEEKEND_DAYS.contains(&weekday)
}

/// The suitability predicate. All three comparisons are strict.
pub fn is_suitable(figures: &DayFigures, bookmark: &Bookmark) -> bool {
    figures.feels_like_temp > bookmark.lowest_temp
        && figures.wind_noon < bookmark.max_wind_speed
        && figures.precip_probability < RAIN_PROBABILITY_LIMIT
}

/// Met Office location names come in shouting caps; turn "MILTON KEYNES"
/// into "Milton Keynes".
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One composed notification: all the suitable days of one bookmark.
#[derive(Debug, Clone)]
pub struct GoodWeatherReport {
    pub bookmark_id: i64,
    pub chat_id: ChatId,
    pub location_name: String,
    pub text: String,
}

/// Evaluates the forecast for every ready bookmark (all users, or one user's
/// when `user_id` is given). A failed fetch or an unparseable day only skips
/// that bookmark or day; siblings are still evaluated. Returns one report per
/// bookmark that had at least one suitable day — the caller knows "something
/// was found" by the list being non-empty.
pub async fn check_weather(
    db: &Database,
    metoffice: &MetOfficeClient,
    user_id: Option<i64>,
) -> Result<Vec<GoodWeatherReport>> {
    let bookmarks = db.ready_bookmarks(user_id).await?;
    let mut reports = Vec::new();

    for (i, bookmark) in bookmarks.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(PACING_DELAY).await;
        }

        let forecast = match metoffice.daily_forecast(&bookmark.location_id).await {
            Ok(forecast) => forecast,
            Err(e) => {
                log::warn!(
                    "Forecast fetch failed for location {} (bookmark {}, user {}), skipping: {}",
                    bookmark.location_id,
                    bookmark.id,
                    bookmark.user_id,
                    e
                );
                continue;
            }
        };

        let location_name = match db.location_by_id(&bookmark.location_id).await? {
            Some(location) => location.name,
            None => forecast.site_rep.dv.location.name.clone(),
        };

        let mut buffer = String::new();
        for day in &forecast.site_rep.dv.location.periods {
            let date = match NaiveDate::parse_from_str(&day.value, METOFFICE_DATE_FORMAT) {
                Ok(date) => date,
                Err(e) => {
                    log::warn!(
                        "Can't parse forecast date {:?}, this day is ignored: {}",
                        day.value,
                        e
                    );
                    continue;
                }
            };

            if !should_bother_for_weekday(bookmark.check_period, date.weekday()) {
                continue;
            }

            let Some(day_rep) = day.rep.first() else {
                log::warn!("Forecast day {} carries no observations, skipping", day.value);
                continue;
            };

            let figures = parse_number_figures(day_rep);
            log::debug!(
                "Bookmark {} at {}: temp {} (min {}), wind {} (max {}), precip {} -> suitable: {}",
                bookmark.id,
                date,
                figures.feels_like_temp,
                bookmark.lowest_temp,
                figures.wind_noon,
                bookmark.max_wind_speed,
                figures.precip_probability,
                is_suitable(&figures, bookmark)
            );

            if is_suitable(&figures, bookmark) {
                buffer.push_str(&format!(
                    " - {} in {} at {} (day temp {}˚C, wind is {}mph and precipitation probability is {}%)\n",
                    weather_icon(figures.weather_type),
                    title_case(&location_name),
                    date.format("%d %b %Y, %a"),
                    figures.feels_like_temp,
                    figures.wind_noon,
                    figures.precip_probability,
                ));
            }
        }

        if !buffer.is_empty() {
            reports.push(GoodWeatherReport {
                bookmark_id: bookmark.id,
                chat_id: ChatId(bookmark.chat_id),
                location_name: title_case(&location_name),
                text: format!("Hey, good weather will be at:\n\n{}", buffer),
            });
        }
    }

    Ok(reports)
}

/// Sends the composed notifications, each with a button to stop observing
/// that bookmark. Delivery failures are logged, never escalated.
pub async fn deliver_reports(bot: &Bot, reports: &[GoodWeatherReport]) {
    for report in reports {
        let message = match bot.send_message(report.chat_id, &report.text).await {
            Ok(message) => message,
            Err(e) => {
                log::error!(
                    "Can't deliver a weather notification to chat {}: {}",
                    report.chat_id,
                    e
                );
                continue;
            }
        };

        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            format!("❌ Stop observing {}", report.location_name),
            format!("{}{}", BUTTON_DELETE_BOOKMARK, report.bookmark_id),
        )]]);

        if let Err(e) = bot
            .edit_message_reply_markup(report.chat_id, message.id)
            .reply_markup(keyboard)
            .await
        {
            log::error!("Can't attach the stop-observing button: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SiteLocation;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bookmark(lowest_temp: i64, max_wind_speed: i64) -> Bookmark {
        Bookmark {
            id: 1,
            user_id: 111,
            chat_id: 500,
            location_id: "3772".to_string(),
            max_wind_speed,
            lowest_temp,
            check_period: CheckPeriod::AllDays,
            is_ready: true,
        }
    }

    #[test]
    fn weekday_filter_full_table() {
        use CheckPeriod::*;
        use Weekday::*;

        let cases = [
            (WeekendsOnly, Mon, false),
            (WeekendsOnly, Tue, false),
            (WeekendsOnly, Wed, false),
            (WeekendsOnly, Thu, false),
            // Friday is almost not a working day in fact :)
            (WeekendsOnly, Fri, true),
            (WeekendsOnly, Sat, true),
            (WeekendsOnly, Sun, true),
            (AllDays, Mon, true),
            (AllDays, Tue, true),
            (AllDays, Wed, true),
            (AllDays, Thu, true),
            (AllDays, Fri, true),
            (AllDays, Sat, true),
            (AllDays, Sun, true),
        ];

        for (period, weekday, expected) in cases {
            assert_eq!(
                should_bother_for_weekday(period, weekday),
                expected,
                "period {:?}, weekday {:?}",
                period,
                weekday
            );
        }
    }

    #[test]
    fn suitability_boundaries_are_strict() {
        let bm = bookmark(10, 15);

        let ok = DayFigures {
            feels_like_temp: 15,
            wind_noon: 10,
            precip_probability: 20,
            weather_type: 1,
        };
        assert!(is_suitable(&ok, &bm));

        // equality fails on every bound
        assert!(!is_suitable(&DayFigures { feels_like_temp: 10, ..ok }, &bm));
        assert!(!is_suitable(&DayFigures { wind_noon: 15, ..ok }, &bm));
        assert!(!is_suitable(&DayFigures { precip_probability: 40, ..ok }, &bm));

        // one step inside the bounds passes
        assert!(is_suitable(&DayFigures { feels_like_temp: 11, ..ok }, &bm));
        assert!(is_suitable(&DayFigures { wind_noon: 14, ..ok }, &bm));
        assert!(is_suitable(&DayFigures { precip_probability: 39, ..ok }, &bm));
    }

    #[test]
    fn missing_or_garbage_figures_default_to_zero() {
        let mut rep = HashMap::new();
        rep.insert("FDm".to_string(), "fifteen".to_string());
        rep.insert("Gn".to_string(), "12".to_string());
        // PPd absent entirely

        let figures = parse_number_figures(&rep);
        assert_eq!(figures.feels_like_temp, 0);
        assert_eq!(figures.wind_noon, 12, "sibling fields still parse");
        assert_eq!(figures.precip_probability, 0);
        assert_eq!(figures.weather_type, WEATHER_TYPE_NOT_USED);
    }

    #[test]
    fn title_case_tames_shouting_names() {
        assert_eq!(title_case("HEATHROW"), "Heathrow");
        assert_eq!(title_case("MILTON KEYNES"), "Milton Keynes");
        assert_eq!(title_case(""), "");
    }

    async fn db_with_ready_bookmark(location_id: &str, name: &str) -> Database {
        let db = Database::open_in_memory().await;
        db.insert_locations(&[SiteLocation {
            id: location_id.to_string(),
            name: name.to_string(),
            region: "se".to_string(),
            auth_area: "Greater London".to_string(),
            national_park: String::new(),
            latitude: String::new(),
            longitude: String::new(),
            elevation: String::new(),
        }])
        .await
        .unwrap();

        db.create_unfinished_bookmark(111, 500).await.unwrap();
        let bm = db.unfinished_bookmark(111).await.unwrap().unwrap();
        db.set_bookmark_location(bm.id, location_id).await.unwrap();
        db.set_bookmark_max_wind_speed(bm.id, 15).await.unwrap();
        db.set_bookmark_lowest_temp(bm.id, 10).await.unwrap();
        db.mark_bookmark_ready(bm.id).await.unwrap();
        db
    }

    // 2019-10-04 was a Friday.
    const DAILY_BODY: &str = r#"{"SiteRep":{"DV":{"type":"Forecast","Location":{
        "i":"3772","name":"HEATHROW","Period":[
            {"type":"Day","value":"2019-10-04Z",
             "Rep":[{"$":"Day","FDm":"15","Gn":"10","PPd":"20","W":"1"},{"$":"Night"}]},
            {"type":"Day","value":"2019-10-05Z",
             "Rep":[{"$":"Day","FDm":"15","Gn":"10","PPd":"45","W":"12"},{"$":"Night"}]},
            {"type":"Day","value":"not-a-date",
             "Rep":[{"$":"Day","FDm":"30","Gn":"0","PPd":"0","W":"1"}]}
        ]}}}}"#;

    #[tokio::test]
    async fn suitable_days_are_aggregated_and_rainy_ones_excluded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/data/val/wxfcs/all/json/3772"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(DAILY_BODY, "application/json"))
            .mount(&server)
            .await;

        let db = db_with_ready_bookmark("3772", "HEATHROW").await;
        let client = MetOfficeClient::with_base_url("test-key", server.uri());

        let reports = check_weather(&db, &client, None).await.unwrap();
        assert_eq!(reports.len(), 1);

        let report = &reports[0];
        assert_eq!(report.chat_id, ChatId(500));
        assert_eq!(report.location_name, "Heathrow");
        assert!(report.text.contains("04 Oct 2019, Fri"));
        assert!(report.text.contains("day temp 15˚C"));
        // the rainy sibling day and the unparseable one are left out
        assert!(!report.text.contains("05 Oct 2019"));
        assert_eq!(report.text.matches(" - ").count(), 1);
    }

    #[tokio::test]
    async fn weekend_filter_drops_weekdays() {
        let server = MockServer::start().await;
        // 2019-10-02 was a Wednesday; same figures as the suitable Friday.
        let body = r#"{"SiteRep":{"DV":{"type":"Forecast","Location":{
            "i":"3772","name":"HEATHROW","Period":[
                {"type":"Day","value":"2019-10-02Z",
                 "Rep":[{"$":"Day","FDm":"15","Gn":"10","PPd":"20","W":"1"}]}
            ]}}}}"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let db = db_with_ready_bookmark("3772", "HEATHROW").await;
        let bm = db.ready_bookmarks(None).await.unwrap().remove(0);
        db.set_bookmark_check_period(bm.id, CheckPeriod::WeekendsOnly)
            .await
            .unwrap();

        let client = MetOfficeClient::with_base_url("test-key", server.uri());
        let reports = check_weather(&db, &client, None).await.unwrap();
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_skips_the_bookmark_but_not_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/public/data/val/wxfcs/all/json/1111"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/public/data/val/wxfcs/all/json/3772"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(DAILY_BODY, "application/json"))
            .mount(&server)
            .await;

        let db = db_with_ready_bookmark("3772", "HEATHROW").await;
        db.insert_locations(&[SiteLocation {
            id: "1111".to_string(),
            name: "Broken".to_string(),
            region: String::new(),
            auth_area: String::new(),
            national_park: String::new(),
            latitude: String::new(),
            longitude: String::new(),
            elevation: String::new(),
        }])
        .await
        .unwrap();
        db.create_unfinished_bookmark(222, 600).await.unwrap();
        let bm = db.unfinished_bookmark(222).await.unwrap().unwrap();
        db.set_bookmark_location(bm.id, "1111").await.unwrap();
        db.set_bookmark_max_wind_speed(bm.id, 50).await.unwrap();
        db.mark_bookmark_ready(bm.id).await.unwrap();

        let client = MetOfficeClient::with_base_url("test-key", server.uri());
        let reports = check_weather(&db, &client, None).await.unwrap();

        // only the healthy bookmark reports anything
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].chat_id, ChatId(500));
    }

    #[tokio::test]
    async fn single_user_scope_ignores_other_owners() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(DAILY_BODY, "application/json"))
            .mount(&server)
            .await;

        let db = db_with_ready_bookmark("3772", "HEATHROW").await;
        let client = MetOfficeClient::with_base_url("test-key", server.uri());

        let reports = check_weather(&db, &client, Some(999)).await.unwrap();
        assert!(reports.is_empty());

        let reports = check_weather(&db, &client, Some(111)).await.unwrap();
        assert_eq!(reports.len(), 1);
    }
}
