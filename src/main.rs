use std::path::Path;

use teloxide::{prelude::*, utils::command::BotCommands};

mod checker;
mod config;
mod database;
mod graphics;
mod handlers;
mod metoffice;
mod models;
mod wizard;

use crate::config::Config;
use crate::database::Database;
use crate::handlers::{
    callback_handler, command_handler, inline_query_handler, message_handler,
};
use crate::metoffice::MetOfficeClient;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "show the start message")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "add a new place to watch")]
    Add,
    #[command(description = "list saved places")]
    Locations,
    #[command(description = "five day forecast for all saved places")]
    Forecast,
    #[command(description = "detailed forecast for today")]
    Now,
    #[command(description = "check saved places for good weather right now")]
    Check,
    #[command(description = "reset the current registration")]
    Reset,
    #[command(description = "delete all saved places")]
    DeleteAll,
    #[command(description = "information about this bot")]
    About,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting weather watcher bot...");

    let config = Config::from_env()?;

    let db = Database::new(&config.database_url).await?;
    db.init().await?;
    log::info!("✅ Database initialized");

    if let Some(path) = &config.site_list_path {
        let inserted = db.seed_locations_from_file(Path::new(path)).await?;
        if inserted > 0 {
            log::info!("Seeded the location catalog with {} sites", inserted);
        }
    }

    let metoffice = MetOfficeClient::new(config.metoffice_api_key.clone());
    let bot = Bot::from_env();

    // nightly check over all users' ready bookmarks
    tokio::spawn(handlers::daily_check_task(
        bot.clone(),
        db.clone(),
        metoffice.clone(),
    ));

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_inline_query().endpoint(inline_query_handler))
        .branch(Update::filter_message().endpoint(message_handler));

    log::info!("🚀 Starting dispatcher...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![db, metoffice])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
