use std::error::Error;

use teloxide::prelude::*;
use teloxide::types::{
    InlineQueryResult, InlineQueryResultArticle, InputMessageContent, InputMessageContentText,
};

use crate::database::Database;
use crate::wizard::LOCATION_ID_PREFIX;

const MAX_SUGGESTIONS: i64 = 10;

/// Answers "@bot <place>" typed in any chat with matching catalog entries.
/// Picking one sends the `loc:<id>` token the wizard's location step expects.
pub async fn inline_query_handler(
    bot: Bot,
    q: InlineQuery,
    db: Database,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let query = q.query.trim();
    if query.is_empty() {
        bot.answer_inline_query(q.id, vec![]).await?;
        return Ok(());
    }

    let locations = match db.search_locations(query, MAX_SUGGESTIONS).await {
        Ok(locations) => locations,
        Err(e) => {
            log::error!("Location search failed for {:?}: {}", query, e);
            bot.answer_inline_query(q.id, vec![]).await?;
            return Ok(());
        }
    };

    let answers = locations
        .into_iter()
        .map(|loc| {
            let mut description = format!("{}, {}, UK", loc.auth_area, loc.region.to_uppercase());
            if !loc.national_park.is_empty() {
                description = format!("{}, {}", loc.national_park, description);
            }

            let content = InputMessageContent::Text(InputMessageContentText::new(format!(
                "{}{}",
                LOCATION_ID_PREFIX, loc.id
            )));

            InlineQueryResult::Article(
                InlineQueryResultArticle::new(loc.id, loc.name, content).description(description),
            )
        })
        .collect::<Vec<_>>();

    bot.answer_inline_query(q.id, answers).cache_time(3).await?;

    Ok(())
}
