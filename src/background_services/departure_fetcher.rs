//! Responsible for fetching the next departure of a stop from the Wiener Linien API
use std::future::Future;

use reqwest::Client;
use tracing::{Instrument, debug, info_span, warn};

use crate::model::wl_api_model::{Departure, MonitorResponse};

pub const DEFAULT_API_URL: &str =
    "https://www.wienerlinien.at/ogd_realtime/monitor?rbl={rbl}&sender={apikey}";

/// Anything that can tell us the next departure of a stop
pub trait DepartureSource {
    fn fetch_departure(
        &self,
        stop_id: &str,
    ) -> impl Future<Output = Result<Departure, FetchError>> + Send;
}

#[derive(Debug)]
pub struct WienerLinienClient {
    client: Client,
    url_template: String,
    api_key: String,
}

impl WienerLinienClient {
    /// `url_template` must contain the `{rbl}` and `{apikey}` placeholders
    pub fn new(url_template: impl Into<String>, api_key: impl Into<String>) -> Self {
        WienerLinienClient {
            client: Client::new(),
            url_template: url_template.into(),
            api_key: api_key.into(),
        }
    }

    pub fn url_for(&self, stop_id: &str) -> String {
        self.url_template
            .replace("{apikey}", &self.api_key)
            .replace("{rbl}", stop_id)
    }
}

impl DepartureSource for WienerLinienClient {
    #[tracing::instrument(err, skip(self))]
    async fn fetch_departure(&self, stop_id: &str) -> Result<Departure, FetchError> {
        let response = self
            .client
            .get(self.url_for(stop_id))
            .send()
            .instrument(info_span!("Fetching departures"))
            .await?
            .error_for_status()?;

        let body = response
            .text()
            .instrument(info_span!("Reading body of response"))
            .await?;

        parse_departure(body)
    }
}

/// Best effort extraction of the first departure from a monitor response
pub fn parse_departure(body: String) -> Result<Departure, FetchError> {
    let response: MonitorResponse = match serde_json::from_str(&body) {
        Ok(response) => response,
        Err(source) => {
            return Err(FetchError::ParsingError { source, body });
        }
    };

    if let Some(message) = &response.message {
        if message.is_ok() {
            debug!(server_time = ?message.server_time, "api message {:?}", message.value);
        } else {
            warn!(
                code = ?message.message_code,
                "api returned message {:?}",
                message.value
            );
        }
    }

    Departure::try_from(response).map_err(FetchError::MissingField)
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("error fetching the departures \n{}", source)]
    HttpRequestError {
        #[from]
        source: reqwest::Error,
    },

    #[error("error parsing the departures \n{} \n{}", source, body)]
    ParsingError {
        source: serde_json::Error,
        body: String,
    },

    #[error("response is missing {0}")]
    MissingField(&'static str),
}
