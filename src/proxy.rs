use reqwest::{Client, Proxy};
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, TravelAssistantError};

pub const DEFAULT_CHINA_PROXY_URL: &str = "https://api.genai.gd.edu.kg/google";

/// How outbound LLM traffic leaves the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyMode {
    /// Relay service that fronts the Gemini API under its own base URL
    Relay { base_url: String },
    /// Forward proxy applied at the HTTP client
    Forward { url: String, socks: bool },
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfiguration {
    pub needs_proxy: bool,
    pub china_proxy_url: String,
    pub traditional_proxy: Option<String>,
}

impl ProxyConfiguration {
    /// Proxies are a development convenience; production always connects directly
    pub fn from_config(cfg: &Config) -> Self {
        let is_development = !cfg.is_production();
        let needs_proxy = is_development
            && (cfg.proxy.use_china_proxy || cfg.proxy.china_proxy_url.is_some());
        let china_proxy_url = cfg
            .proxy
            .china_proxy_url
            .clone()
            .unwrap_or_else(|| DEFAULT_CHINA_PROXY_URL.to_string());
        let traditional_proxy = if is_development {
            cfg.proxy.http_proxy.clone().filter(|p| !p.is_empty())
        } else {
            None
        };

        Self {
            needs_proxy,
            china_proxy_url,
            traditional_proxy,
        }
    }

    pub fn mode(&self) -> ProxyMode {
        if self.needs_proxy {
            ProxyMode::Relay {
                base_url: format!("{}/v1beta/openai", self.china_proxy_url.trim_end_matches('/')),
            }
        } else if let Some(url) = &self.traditional_proxy {
            ProxyMode::Forward {
                url: url.clone(),
                socks: is_socks(url),
            }
        } else {
            ProxyMode::Direct
        }
    }

    /// Base URL for chat completions, honouring relay mode
    pub fn llm_base_url(&self, configured: &str) -> String {
        match self.mode() {
            ProxyMode::Relay { base_url } => base_url,
            _ => configured.trim_end_matches('/').to_string(),
        }
    }

    /// HTTP client for the LLM backend
    pub fn build_client(&self, timeout: Duration) -> Result<Client> {
        let mut builder = Client::builder().timeout(timeout);

        match self.mode() {
            ProxyMode::Relay { base_url } => {
                tracing::info!(relay = %base_url, "Using relay proxy service for LLM traffic");
            }
            ProxyMode::Forward { url, socks } => {
                let kind = if socks { "socks" } else { "http" };
                tracing::info!(kind, "Using forward proxy for LLM traffic");
                let proxy = Proxy::all(url.as_str()).map_err(|e| {
                    TravelAssistantError::Config(format!("Invalid proxy URL: {e}"))
                })?;
                builder = builder.proxy(proxy);
            }
            ProxyMode::Direct => {
                tracing::info!("Using direct connection (no proxy)");
                builder = builder.no_proxy();
            }
        }

        builder
            .build()
            .map_err(|e| TravelAssistantError::Config(format!("Failed to build HTTP client: {e}")))
    }
}

fn is_socks(url: &str) -> bool {
    ["socks://", "socks4://", "socks5://", "socks5h://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}
