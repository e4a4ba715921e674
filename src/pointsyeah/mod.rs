//! PointsYeah explorer APIs (reward flights and reward hotels)

pub mod flight_api;
pub mod hotel_api;
pub mod hotel_location;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_retry::RetryIf;

#[cfg(test)]
use mockall::automock;

use crate::error::{Result, TravelAssistantError};
use crate::retry::RetryPolicy;

pub use flight_api::{FlightSearchParams, FlightSearchResponse};
pub use hotel_api::{HotelApiEnvelope, HotelSearchParams, HotelSearchResponse};

const FLIGHT_SEARCH_PATH: &str = "/v2/beta/explorer/search";
const HOTEL_SEARCH_PATH: &str = "/v2/beta/hotel/explorer/search";
const BROWSER_ORIGIN: &str = "https://beta.pointsyeah.com";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PointsYeahApi: Send + Sync {
    async fn search_flights(&self, params: &FlightSearchParams) -> Result<FlightSearchResponse>;
    async fn search_hotels(&self, params: &HotelSearchParams) -> Result<HotelSearchResponse>;
}

pub struct PointsYeahClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl PointsYeahClient {
    pub fn new(client: Client, base_url: &str, api_key: Option<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            retry,
        }
    }

    /// POST a JSON body the way the PointsYeah web app does (text/plain, browser headers)
    async fn post<B, R>(&self, service: &'static str, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let payload = serde_json::to_string(body)?;
        tracing::debug!(service, url = %url, body = %payload, "PointsYeah request");

        let action = || self.post_once(service, &url, payload.clone());
        let result = RetryIf::spawn(
            self.retry.strategy(),
            action,
            |e: &TravelAssistantError| {
                let retry = e.is_retryable();
                if retry {
                    tracing::warn!(service, "Retrying after error: {}", e);
                }
                retry
            },
        )
        .await;

        if let Err(e) = &result {
            tracing::error!(service, "Request failed: {}", e);
        }
        result
    }

    async fn post_once<R: DeserializeOwned>(
        &self,
        service: &'static str,
        url: &str,
        payload: String,
    ) -> Result<R> {
        let mut request = self
            .client
            .post(url)
            .header(ACCEPT, "*/*")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
            .header(ORIGIN, BROWSER_ORIGIN)
            .header(REFERER, format!("{BROWSER_ORIGIN}/"))
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .body(payload);
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| {
                TravelAssistantError::Http(format!("Failed to parse {service} API response: {e}"))
            });
        }

        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 401 {
            return Err(TravelAssistantError::Unauthorized(format!(
                "{service} API requires authentication. Please configure POINTSYEAH_API_KEY in environment variables."
            )));
        }
        Err(TravelAssistantError::Upstream {
            service: service.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PointsYeahApi for PointsYeahClient {
    async fn search_flights(&self, params: &FlightSearchParams) -> Result<FlightSearchResponse> {
        let response: FlightSearchResponse = self
            .post("PointsYeah Flight", FLIGHT_SEARCH_PATH, params)
            .await?;
        tracing::info!(
            "PointsYeah returned {} total flights, showing {}",
            response.total,
            response.results.len()
        );
        Ok(response)
    }

    async fn search_hotels(&self, params: &HotelSearchParams) -> Result<HotelSearchResponse> {
        let envelope: HotelApiEnvelope = self
            .post("PointsYeah Hotel", HOTEL_SEARCH_PATH, params)
            .await?;
        tracing::info!(
            code = envelope.code,
            "PointsYeah returned {} total hotels, showing {}",
            envelope.data.total,
            envelope.data.results.len()
        );
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn empty_api_key_is_ignored() {
        let client = PointsYeahClient::new(
            Client::new(),
            "https://api.pointsyeah.com/",
            Some(String::new()),
            RetryPolicy::none(),
        );
        assert!(client.api_key.is_none());
        assert_eq!(client.base_url, "https://api.pointsyeah.com");
    }

    #[tokio::test]
    async fn connection_failure_surfaces_as_error() {
        let http = Client::builder()
            .timeout(Duration::from_secs(2))
            .no_proxy()
            .build()
            .expect("client");
        let client = PointsYeahClient::new(http, "http://127.0.0.1:9", None, RetryPolicy::none());
        let params = flight_api::FlightSearchInput::for_route("LAX", "PVG", "2026-12-01")
            .to_api_params();
        let err = client.search_flights(&params).await.expect_err("must fail");
        assert!(err.is_retryable());
    }
}
