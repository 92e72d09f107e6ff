pub mod types;

use std::time::Duration;

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use thiserror::Error;

pub use crate::metoffice::types::{Root, METOFFICE_DATE_FORMAT};

const DATAPOINT_BASE_URL: &str = "http://datapoint.metoffice.gov.uk";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
// Fetches are idempotent, so a transparent retry on transient failures is safe.
const RETRIES: u32 = 1;

#[derive(Debug, Error)]
pub enum MetOfficeError {
    #[error("DataPoint request failed: {0}")]
    Request(#[from] reqwest_middleware::Error),
    #[error("DataPoint answered with status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed DataPoint document: {0}")]
    Decode(#[from] reqwest::Error),
}

/// Resolution of the forecast feed: one period per day, or eight 3-hour
/// periods per day.
#[derive(Debug, Clone, Copy)]
pub enum Resolution {
    Daily,
    ThreeHourly,
}

impl Resolution {
    fn as_query(self) -> &'static str {
        match self {
            Resolution::Daily => "daily",
            Resolution::ThreeHourly => "3hourly",
        }
    }
}

#[derive(Clone)]
pub struct MetOfficeClient {
    http: ClientWithMiddleware,
    base_url: String,
    api_key: String,
}

impl MetOfficeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DATAPOINT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(RETRIES);

        let http = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub async fn daily_forecast(&self, location_id: &str) -> Result<Root, MetOfficeError> {
        self.forecast(location_id, Resolution::Daily).await
    }

    pub async fn three_hourly_forecast(&self, location_id: &str) -> Result<Root, MetOfficeError> {
        self.forecast(location_id, Resolution::ThreeHourly).await
    }

    async fn forecast(
        &self,
        location_id: &str,
        resolution: Resolution,
    ) -> Result<Root, MetOfficeError> {
        let url = format!(
            "{}/public/data/val/wxfcs/all/json/{}",
            self.base_url, location_id
        );

        let response = self
            .http
            .get(&url)
            .query(&[("res", resolution.as_query()), ("key", self.api_key.as_str())])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MetOfficeError::Status(response.status()));
        }

        Ok(response.json::<Root>().await?)
    }
}
