use std::error::Error;

use teloxide::prelude::*;

use crate::checker::BUTTON_DELETE_BOOKMARK;
use crate::database::Database;
use crate::handlers::utils::{send_text, APOLOGY};

/// Handles the inline buttons under notifications; today that is only
/// "stop observing", which drops the bookmark behind the notification.
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    db: Database,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(data) = q.data.as_deref() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let Some(ref message) = q.message else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    if let Some(raw_id) = data.strip_prefix(BUTTON_DELETE_BOOKMARK) {
        let Ok(bookmark_id) = raw_id.parse::<i64>() else {
            log::error!("Malformed delete-bookmark callback data: {:?}", data);
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        };

        match delete_bookmark(&db, bookmark_id).await {
            Ok(name) => {
                bot.answer_callback_query(q.id.clone()).await?;
                // take the button away so a second tap does nothing
                if let Err(e) = bot
                    .edit_message_reply_markup(chat_id, message_id)
                    .await
                {
                    log::warn!("Can't remove the stop-observing button: {}", e);
                }
                send_text(
                    &bot,
                    chat_id,
                    &format!("Ok, I will not watch {} for you anymore.", name),
                )
                .await?;
            }
            Err(e) => {
                log::error!("Can't delete bookmark {}: {}", bookmark_id, e);
                bot.answer_callback_query(q.id.clone()).await?;
                send_text(&bot, chat_id, APOLOGY).await?;
            }
        }
    } else {
        log::warn!("Unknown callback data: {:?}", data);
        bot.answer_callback_query(q.id.clone()).await?;
    }

    Ok(())
}

/// Returns the display name of the removed place for the confirmation.
async fn delete_bookmark(db: &Database, bookmark_id: i64) -> Result<String, sqlx::Error> {
    let name = match db.bookmark_by_id(bookmark_id).await? {
        Some(bookmark) => match db.location_by_id(&bookmark.location_id).await? {
            Some(location) => crate::checker::title_case(&location.name),
            None => bookmark.location_id,
        },
        None => "this location".to_string(),
    };

    db.delete_bookmark(bookmark_id).await?;
    Ok(name)
}
