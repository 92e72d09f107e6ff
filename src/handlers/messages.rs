use std::error::Error;

use teloxide::prelude::*;
use teloxide::types::ReplyMarkup;

use crate::database::Database;
use crate::handlers::utils::{day_filter_keyboard, send_text, APOLOGY};
use crate::models::WizardState;
use crate::wizard::Wizard;

/// Free-text messages belong to the registration wizard while one is in
/// flight; outside of that the bot only points at the commands.
pub async fn message_handler(
    bot: Bot,
    msg: Message,
    db: Database,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(text) = msg.text() else {
        send_text(
            &bot,
            msg.chat.id,
            "I understand text only. Call /help for the list of commands.",
        )
        .await?;
        return Ok(());
    };

    // commands are already handled by the command branch
    if text.starts_with('/') {
        return Ok(());
    }

    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;

    let mut wizard = match Wizard::load(&db, user_id).await {
        Ok(wizard) => wizard,
        Err(e) => {
            log::error!("Can't load the wizard state for user {}: {}", user_id, e);
            send_text(&bot, msg.chat.id, APOLOGY).await?;
            return Ok(());
        }
    };

    let reply = match wizard.advance(text).await {
        Ok(Some(reply)) => reply,
        Ok(None) => {
            // no registration in flight, a duplicate after the end included
            send_text(
                &bot,
                msg.chat.id,
                "I'm not sure what you mean. Call /add to watch a new location or \
                 /help for the list of commands.",
            )
            .await?;
            return Ok(());
        }
        Err(e) => {
            log::error!("Wizard step failed for user {}: {}", user_id, e);
            send_text(&bot, msg.chat.id, APOLOGY).await?;
            return Ok(());
        }
    };

    // the day-filter question comes with its two answer buttons; the final
    // reply takes the keyboard away again
    let mut request = bot.send_message(msg.chat.id, reply);
    match wizard.current_state() {
        WizardState::AwaitingDayFilter => {
            request = request.reply_markup(day_filter_keyboard());
        }
        WizardState::Finished => {
            request = request.reply_markup(ReplyMarkup::kb_remove());
        }
        _ => {}
    }
    request.await?;

    Ok(())
}
