use std::env;

use anyhow::{Context, Result};

const METOFFICE_API_KEY_ENV: &str = "METOFFICE_API_KEY";
const DATABASE_URL_ENV: &str = "DATABASE_URL";
const SITE_LIST_PATH_ENV: &str = "SITE_LIST_PATH";

const DEFAULT_DATABASE_URL: &str = "sqlite://weather.db";

/// Environment-driven settings. The bot token itself is consumed by
/// `Bot::from_env()` (TELOXIDE_TOKEN).
#[derive(Clone, Debug)]
pub struct Config {
    pub metoffice_api_key: String,
    pub database_url: String,
    /// Optional Met Office sitelist JSON to seed the location catalog from.
    pub site_list_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let metoffice_api_key = env::var(METOFFICE_API_KEY_ENV)
            .with_context(|| format!("{} must be set", METOFFICE_API_KEY_ENV))?;

        let database_url =
            env::var(DATABASE_URL_ENV).unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let site_list_path = env::var(SITE_LIST_PATH_ENV).ok();

        Ok(Config {
            metoffice_api_key,
            database_url,
            site_list_path,
        })
    }
}
