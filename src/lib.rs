pub mod airports;
pub mod config;
pub mod conversation;
pub mod error;
pub mod handlers;
pub mod iata;
pub mod models;
pub mod pointsyeah;
pub mod proxy;
pub mod retry;
pub mod serpapi;
pub mod service;
pub mod system_prompt;
pub mod tools;
pub mod transport;

use std::sync::Arc;

use crate::airports::AirportMap;
use crate::config::Config;
use crate::error::{Result, TravelAssistantError};
use crate::handlers::AppState;
use crate::iata::{AliasTable, IataResolver};
use crate::pointsyeah::{PointsYeahApi, PointsYeahClient};
use crate::proxy::ProxyConfiguration;
use crate::retry::RetryPolicy;
use crate::serpapi::SerpApiClient;
use crate::service::ChatService;
use crate::tools::{
    CashFlightSearchTool, DatetimeTool, RewardFlightSearchTool, RewardHotelSearchTool,
    ToolRegistry,
};
use crate::transport::{LlmTransport, Transport};

/// Wire clients, resolver and tools from configuration
pub fn build_app_state(cfg: &Config) -> Result<AppState> {
    let retry = RetryPolicy::from_config(&cfg.retry);

    let proxy = ProxyConfiguration::from_config(cfg);
    let llm_client = proxy.build_client(cfg.llm_timeout())?;
    let llm_base_url = proxy.llm_base_url(&cfg.llm.base_url);
    let transport: Arc<dyn Transport> = Arc::new(LlmTransport::new(
        llm_client,
        cfg.llm.api_key.clone(),
        &llm_base_url,
        retry.clone(),
    ));

    let tools_client = reqwest::Client::builder()
        .timeout(cfg.tools_timeout())
        .build()
        .map_err(|e| TravelAssistantError::Config(format!("Failed to build HTTP client: {e}")))?;

    let airports = Arc::new(AirportMap::load_or_bundled(cfg.airports.path.as_deref())?);
    tracing::info!(airports = airports.len(), "Airport dataset loaded");
    let aliases = AliasTable::default().merge(&cfg.airports.aliases);
    let resolver = Arc::new(IataResolver::with_aliases(airports, aliases));
    let min_confidence = cfg.tools.min_airport_confidence;

    let pointsyeah: Arc<dyn PointsYeahApi> = Arc::new(PointsYeahClient::new(
        tools_client.clone(),
        &cfg.tools.pointsyeah_base_url,
        cfg.tools.pointsyeah_api_key.clone(),
        retry,
    ));

    let mut registry = ToolRegistry::new()
        .with(Arc::new(RewardFlightSearchTool::new(
            pointsyeah.clone(),
            resolver.clone(),
            min_confidence,
        )))
        .with(Arc::new(RewardHotelSearchTool::new(pointsyeah)))
        .with(Arc::new(DatetimeTool));

    match cfg.tools.serpapi_api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => registry.register(Arc::new(CashFlightSearchTool::new(
            Arc::new(SerpApiClient::new(
                tools_client,
                &cfg.tools.serpapi_base_url,
                key.to_string(),
            )),
            resolver,
            min_confidence,
        ))),
        None => tracing::info!("SERPAPI_API_KEY not set, cash flight search disabled"),
    }

    let default_timezone = cfg.tools.default_timezone.parse().unwrap_or_else(|_| {
        tracing::warn!(
            timezone = %cfg.tools.default_timezone,
            "Invalid default timezone, using UTC"
        );
        chrono_tz::UTC
    });

    Ok(AppState {
        service: Arc::new(ChatService::new(transport, registry, &cfg.llm)),
        default_timezone,
        llm_configured: !cfg.llm.api_key.is_empty(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cash_flight_tool_requires_serpapi_key() {
        let mut cfg = Config::default();
        let state = build_app_state(&cfg).expect("state");
        assert_eq!(
            state.service.tools().names(),
            vec!["pointsYeahFlightSearch", "pointsYeahHotelSearch", "datetimeCalculator"]
        );
        assert!(!state.llm_configured);

        cfg.tools.serpapi_api_key = Some("key".to_string());
        cfg.llm.api_key = "llm-key".to_string();
        cfg.tools.default_timezone = "Asia/Shanghai".to_string();
        let state = build_app_state(&cfg).expect("state");
        assert!(state.service.tools().names().contains(&"flightSearch"));
        assert!(state.llm_configured);
        assert_eq!(state.default_timezone, chrono_tz::Asia::Shanghai);
    }
}
