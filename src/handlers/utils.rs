use teloxide::prelude::*;
use teloxide::types::{ChatId, KeyboardButton, KeyboardMarkup, Message, ParseMode, ReplyMarkup};

use crate::wizard::{BUTTON_ALL_DAYS, BUTTON_ONLY_WEEKENDS};

pub const APOLOGY: &str = "Sorry, internal error occurred, please try again later";

/// Escapes the MarkdownV2 special characters.
pub fn escape_markdown_v2(text: &str) -> String {
    let specials = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut out = String::with_capacity(text.len() * 2);

    for ch in text.chars() {
        if specials.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

pub async fn send_text(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
) -> Result<Message, teloxide::RequestError> {
    bot.send_message(chat_id, text).await
}

/// For messages carrying pre-rendered code-fence blocks (tables, plots);
/// anything outside the fences must already be escaped.
pub async fn send_markdown(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
) -> Result<Message, teloxide::RequestError> {
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .await
}

/// The two-button reply keyboard of the wizard's day-filter question.
pub fn day_filter_keyboard() -> ReplyMarkup {
    ReplyMarkup::Keyboard(
        KeyboardMarkup::new(vec![vec![
            KeyboardButton::new(BUTTON_ALL_DAYS),
            KeyboardButton::new(BUTTON_ONLY_WEEKENDS),
        ]])
        .resize_keyboard()
        .one_time_keyboard(),
    )
}
