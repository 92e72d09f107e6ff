use std::error::Error;

use teloxide::prelude::*;
use teloxide::types::{ChatId, ReplyMarkup};

use crate::checker::{check_weather, deliver_reports};
use crate::database::Database;
use crate::graphics::{five_day_table, render_day_detail};
use crate::handlers::utils::{escape_markdown_v2, send_markdown, send_text, APOLOGY};
use crate::metoffice::MetOfficeClient;
use crate::wizard::Wizard;
use crate::Command;

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    db: Database,
    metoffice: MetOfficeClient,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let chat_id = msg.chat.id;
    let Some(user) = msg.from.as_ref() else {
        // channel posts and the like carry no sender, nothing to do
        return Ok(());
    };
    let user_id = user.id.0 as i64;

    match cmd {
        Command::Start => {
            send_text(
                &bot,
                chat_id,
                "Hey! In order to begin, you should add at least one site location where \
                 you would like to observe a weather. Click /add",
            )
            .await?;
        }

        Command::Help => {
            send_text(
                &bot,
                chat_id,
                "This bot supports the following commands:\n\
                 /start - shows start message\n\
                 /help - this command\n\
                 /add - add new place to watch\n\
                 /locations - list saved places\n\
                 /now - detailed forecast for today for all the saved places\n\
                 /forecast - show the forecast for all saved places within 5 days\n\
                 /check - check saved places for good weather right now\n\
                 /about - information about this bot\n\
                 /reset - reset the inner state for current user\n\
                 /deleteall - delete all saved places",
            )
            .await?;
        }

        Command::About => {
            send_text(
                &bot,
                chat_id,
                "The bot is designed to notify you when the weather in selected places \
                 will be nice within the next days. This can be helpful for everyone who \
                 tries to avoid rain and windy weather, such as motorcyclists, \
                 photographers, hikers and so on. Simply save a few places you are \
                 interested in, specify the wind speed and temperature limits and the bot \
                 will notify you when a weather forecast matches your expectations. \
                 Have fun.\n\n\
                 This bot works in UK only and uses data from metoffice.gov.uk\n\n\
                 Please start with the /add command.",
            )
            .await?;
        }

        Command::Add => handle_add(&bot, chat_id, user_id, &db).await?,
        Command::Locations => handle_locations(&bot, chat_id, user_id, &db).await?,
        Command::Forecast => handle_forecast(&bot, chat_id, user_id, &db, &metoffice).await?,
        Command::Now => handle_now(&bot, chat_id, user_id, &db, &metoffice).await?,
        Command::Check => handle_check(&bot, chat_id, user_id, &db, &metoffice).await?,

        Command::Reset => {
            db.delete_user_state(user_id).await?;
            db.delete_unfinished_bookmarks(user_id).await?;
            bot.send_message(
                chat_id,
                "Ok, I dropped the unfinished registration. Call /add to start again.",
            )
            .reply_markup(ReplyMarkup::kb_remove())
            .await?;
        }

        Command::DeleteAll => {
            db.delete_user_state(user_id).await?;
            db.delete_all_bookmarks(user_id).await?;
            send_text(&bot, chat_id, "All your saved locations were removed.").await?;
        }
    }

    Ok(())
}

/// Initiates adding a new location: a fresh wizard, whatever was in flight.
async fn handle_add(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    db: &Database,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if let Err(e) = Wizard::start(db, user_id, chat_id.0).await {
        log::error!("Can't start the wizard for user {}: {}", user_id, e);
        send_text(bot, chat_id, APOLOGY).await?;
        return Ok(());
    }

    send_text(
        bot,
        chat_id,
        "Ok, let's add a location where you want to monitor a weather. Start typing \
         the bot name followed by a place name and suggestions will appear.\n\
         Example: @weather_observer_bot London",
    )
    .await?;

    Ok(())
}

async fn handle_locations(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    db: &Database,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let bookmarks = db.bookmarks_for_user(user_id).await?;
    if bookmarks.is_empty() {
        send_text(bot, chat_id, "You have no saved locations yet, call /add").await?;
        return Ok(());
    }

    let mut buffer = String::from("Saved locations:\n");
    for bookmark in &bookmarks {
        let name = match db.location_by_id(&bookmark.location_id).await? {
            Some(location) => location.name,
            None => bookmark.location_id.clone(),
        };
        if bookmark.is_ready {
            buffer.push_str(&format!(
                "● {} (wind below {} mph, temperature above {}˚C)\n",
                name, bookmark.max_wind_speed, bookmark.lowest_temp
            ));
        } else {
            buffer.push_str("● (registration in progress, call /add to restart)\n");
        }
    }

    send_text(bot, chat_id, &buffer).await?;
    Ok(())
}

/// Five-day table per saved place.
async fn handle_forecast(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    db: &Database,
    metoffice: &MetOfficeClient,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let bookmarks = db.ready_bookmarks(Some(user_id)).await?;
    if bookmarks.is_empty() {
        send_text(bot, chat_id, "You have no saved locations yet, call /add").await?;
        return Ok(());
    }

    for bookmark in &bookmarks {
        let forecast = match metoffice.daily_forecast(&bookmark.location_id).await {
            Ok(forecast) => forecast,
            Err(e) => {
                log::warn!(
                    "Daily forecast fetch failed for location {}: {}",
                    bookmark.location_id,
                    e
                );
                send_text(bot, chat_id, APOLOGY).await?;
                continue;
            }
        };

        let name = crate::checker::title_case(&forecast.site_rep.dv.location.name);
        let table = five_day_table(&forecast);
        if table.is_empty() {
            log::warn!(
                "Unexpected daily forecast shape for location {}, no table rendered",
                bookmark.location_id
            );
            continue;
        }

        send_markdown(
            bot,
            chat_id,
            &format!("*{}*\n{}", escape_markdown_v2(&name), table),
        )
        .await?;
    }

    Ok(())
}

/// Today's 3-hourly plots per saved place.
async fn handle_now(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    db: &Database,
    metoffice: &MetOfficeClient,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let bookmarks = db.ready_bookmarks(Some(user_id)).await?;
    if bookmarks.is_empty() {
        send_text(bot, chat_id, "You have no saved locations yet, call /add").await?;
        return Ok(());
    }

    for bookmark in &bookmarks {
        let forecast = match metoffice.three_hourly_forecast(&bookmark.location_id).await {
            Ok(forecast) => forecast,
            Err(e) => {
                log::warn!(
                    "3-hourly forecast fetch failed for location {}: {}",
                    bookmark.location_id,
                    e
                );
                send_text(bot, chat_id, APOLOGY).await?;
                continue;
            }
        };

        let Some(today) = forecast.site_rep.dv.location.periods.first() else {
            log::warn!(
                "Empty 3-hourly forecast for location {}",
                bookmark.location_id
            );
            continue;
        };

        let name = crate::checker::title_case(&forecast.site_rep.dv.location.name);
        send_markdown(
            bot,
            chat_id,
            &format!(
                "*{}*\n{}",
                escape_markdown_v2(&name),
                render_day_detail(&today.rep)
            ),
        )
        .await?;
    }

    Ok(())
}

/// On-demand matcher run for one user, with the "nothing found" fallback the
/// nightly batch doesn't need.
async fn handle_check(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    db: &Database,
    metoffice: &MetOfficeClient,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let reports = match check_weather(db, metoffice, Some(user_id)).await {
        Ok(reports) => reports,
        Err(e) => {
            log::error!("On-demand weather check failed for user {}: {}", user_id, e);
            send_text(bot, chat_id, APOLOGY).await?;
            return Ok(());
        }
    };

    if reports.is_empty() {
        send_text(
            bot,
            chat_id,
            "No good weather at your saved locations in the upcoming days, sorry.",
        )
        .await?;
        return Ok(());
    }

    deliver_reports(bot, &reports).await;
    Ok(())
}
