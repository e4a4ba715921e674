use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for the travel assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    pub retry: RetryConfig,
    pub tools: ToolsConfig,
    #[serde(default)]
    pub airports: AirportsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub bind: String,
    /// "development" or "production"; proxies are only honoured outside production
    pub environment: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    /// OpenAI-compatible chat completions base URL (without `/chat/completions`)
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_tool_rounds: usize,
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub preset: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub use_china_proxy: bool,
    #[serde(default)]
    pub china_proxy_url: Option<String>,
    /// Forward proxy (http://, https://, socks://, socks4://, socks5://)
    #[serde(default)]
    pub http_proxy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_base: f64,
    pub jitter_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub pointsyeah_base_url: String,
    #[serde(default)]
    pub pointsyeah_api_key: Option<String>,
    pub serpapi_base_url: String,
    #[serde(default)]
    pub serpapi_api_key: Option<String>,
    /// Lowest resolver confidence a tool accepts as an unambiguous airport
    pub min_airport_confidence: u8,
    /// IANA zone used when the client does not send one
    pub default_timezone: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AirportsConfig {
    /// Dataset override; the bundled dataset is used when absent
    #[serde(default)]
    pub path: Option<String>,
    /// Extra colloquial aliases merged over the built-in table
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env.local", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::warn!(
                "No .env file found in any expected location - continuing with env vars only"
            );
        }

        let config_path =
            env::var("TRAVEL_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {}", config_path);
                        config
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse config file {}: {} - using defaults",
                            config_path,
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();
        // Preset last so it wins over an explicit temperature
        config.apply_llm_preset();

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup (the process environment in production)
    pub(crate) fn apply_overrides_from<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(bind) = get("TRAVEL_HTTP_BIND") {
            self.server.bind = bind;
        }
        if let Some(token) = get("TRAVEL_BEARER_TOKEN") {
            self.server.bearer_token = Some(token);
        }
        if let Some(app_env) = get("APP_ENV").or_else(|| get("NODE_ENV")) {
            self.server.environment = app_env;
        }

        // LLM overrides
        if let Some(api_key) = get("GOOGLE_GENERATIVE_AI_API_KEY").or_else(|| get("LLM_API_KEY"))
        {
            self.llm.api_key = api_key;
        }
        if let Some(model) = get("GOOGLE_MODEL_NAME").or_else(|| get("LLM_MODEL")) {
            self.llm.model = model;
        }
        if let Some(base_url) = get("LLM_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(rounds) = get("LLM_MAX_TOOL_ROUNDS") {
            if let Ok(n) = rounds.parse() {
                self.llm.max_tool_rounds = n;
            }
        }
        if let Some(preset) = get("LLM_PRESET") {
            self.llm.preset = Some(preset);
        }

        // Proxy overrides
        if let Some(flag) = get("USE_CHINA_PROXY") {
            self.proxy.use_china_proxy = flag.eq_ignore_ascii_case("true");
        }
        if let Some(url) = get("CHINA_PROXY_URL") {
            self.proxy.china_proxy_url = Some(url);
        }
        if let Some(url) = get("HTTP_PROXY")
            .or_else(|| get("HTTPS_PROXY"))
            .or_else(|| get("ALL_PROXY"))
        {
            self.proxy.http_proxy = Some(url);
        }

        // Retry overrides
        if let Some(attempts) = get("TRAVEL_RETRY_MAX_ATTEMPTS") {
            if let Ok(n) = attempts.parse() {
                self.retry.max_attempts = n;
            }
        }
        if let Some(jitter) = get("TRAVEL_RETRY_JITTER_FACTOR") {
            if let Ok(jitter_val) = jitter.parse() {
                self.retry.jitter_factor = jitter_val;
            }
        }

        // Tool overrides
        if let Some(key) = get("SERPAPI_API_KEY") {
            self.tools.serpapi_api_key = Some(key);
        }
        if let Some(key) = get("POINTSYEAH_API_KEY") {
            self.tools.pointsyeah_api_key = Some(key);
        }
        if let Some(tz) = get("DEFAULT_TIMEZONE") {
            self.tools.default_timezone = tz;
        }
        if let Some(conf) = get("MIN_AIRPORT_CONFIDENCE") {
            if let Ok(v) = conf.parse() {
                self.tools.min_airport_confidence = v;
            }
        }

        // Airport dataset override
        if let Some(path) = get("AIRPORTS_PATH") {
            self.airports.path = Some(path);
        }
    }

    fn apply_llm_preset(&mut self) {
        if let Some(ref preset_raw) = self.llm.preset {
            let preset = preset_raw.to_lowercase();
            let temperature = match preset.as_str() {
                // Deterministic tool use
                "fast" => 0.2,
                "balanced" => 0.7,
                // Looser itinerary suggestions
                "creative" => 1.0,
                other => {
                    tracing::warn!("Unknown llm preset: {}. Using existing temperature.", other);
                    return;
                }
            };
            self.llm.temperature = temperature;
            tracing::info!("Applied llm preset '{}': temperature={}", preset, temperature);
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.llm.api_key.is_empty() {
            return Err("GOOGLE_GENERATIVE_AI_API_KEY environment variable must be set".into());
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err("llm.temperature must be between 0.0 and 2.0".into());
        }
        if self.llm.max_tool_rounds == 0 {
            return Err("llm.max_tool_rounds cannot be 0".into());
        }
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts cannot be 0".into());
        }
        if self.retry.jitter_factor < 0.0 || self.retry.jitter_factor > 1.0 {
            return Err("Retry jitter factor must be between 0.0 and 1.0".into());
        }
        if self.tools.min_airport_confidence > 100 {
            return Err("tools.min_airport_confidence must be between 0 and 100".into());
        }
        if self.tools.default_timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(format!(
                "tools.default_timezone '{}' is not an IANA time zone",
                self.tools.default_timezone
            )
            .into());
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.environment.eq_ignore_ascii_case("production")
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.request_timeout_seconds)
    }

    pub fn tools_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.request_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "travel-assistant".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                bind: "127.0.0.1:3000".to_string(),
                environment: "development".to_string(),
                bearer_token: None,
            },
            llm: LlmConfig {
                api_key: String::new(),
                model: "gemini-2.5-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
                temperature: 0.7,
                max_tokens: 4096,
                max_tool_rounds: 5,
                request_timeout_seconds: 60,
                preset: None,
            },
            proxy: ProxyConfig::default(),
            retry: RetryConfig {
                max_attempts: 3,
                initial_delay_ms: 200,
                max_delay_ms: 5000,
                backoff_base: 2.0,
                jitter_factor: 0.2,
            },
            tools: ToolsConfig {
                pointsyeah_base_url: "https://api.pointsyeah.com".to_string(),
                pointsyeah_api_key: None,
                serpapi_base_url: "https://serpapi.com".to_string(),
                serpapi_api_key: None,
                min_airport_confidence: 50,
                default_timezone: "UTC".to_string(),
                request_timeout_seconds: 30,
            },
            airports: AirportsConfig::default(),
        }
    }
}
