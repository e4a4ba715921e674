//! Tools the model can call. Every execution yields a JSON result, never an error.

pub mod cash_flights;
pub mod datetime;
pub mod reward_flights;
pub mod reward_hotels;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use schemars::JsonSchema;
use schemars::generate::SchemaSettings;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::iata::{IataMatch, IataResolver, format_matches};
use crate::models::ToolDefinition;

pub use cash_flights::CashFlightSearchTool;
pub use datetime::DatetimeTool;
pub use reward_flights::RewardFlightSearchTool;
pub use reward_hotels::RewardHotelSearchTool;

/// Per-request facts a tool may depend on
#[derive(Debug, Clone, Copy)]
pub struct ToolContext {
    pub timezone: Tz,
    pub now: DateTime<Utc>,
}

impl ToolContext {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            now: Utc::now(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.timezone).date_naive()
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON Schema for the arguments
    fn parameters(&self) -> Value;
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Value;
}

/// Inline, self-contained schema; the OpenAI-compatible Gemini endpoint does not follow `$ref`
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let schema = SchemaSettings::draft07()
        .with(|s| s.inline_subschemas = true)
        .into_generator()
        .into_root_schema_for::<T>();
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.remove("definitions");
    }
    value
}

pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, Value> {
    serde_json::from_value(args).map_err(|e| {
        tracing::warn!(tool, "Invalid tool arguments: {}", e);
        failure(
            format!("Invalid arguments: {e}"),
            format!("Invalid arguments for {tool}"),
        )
    })
}

pub fn failure(error: impl Into<String>, summary: impl Into<String>) -> Value {
    json!({
        "success": false,
        "error": error.into(),
        "summary": summary.into(),
    })
}

/// Runtime twin of the `#[schemars(range(...))]` bounds advertised to the model
pub fn check_range(field: &str, value: Option<u64>, min: u64, max: Option<u64>) -> Result<(), String> {
    let Some(value) = value else {
        return Ok(());
    };
    let within = value >= min && max.is_none_or(|max| value <= max);
    if within {
        return Ok(());
    }
    Err(match max {
        Some(max) => format!("{field} must be between {min} and {max} (got {value})"),
        None => format!("{field} must be at least {min} (got {value})"),
    })
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("{field} ({value}) must be a valid date in YYYY-MM-DD format"))
}

/// Outcome of turning a free-text location into one IATA code
#[derive(Debug, Clone, PartialEq)]
pub enum AirportResolution {
    Resolved(String),
    /// Nothing above the confidence floor; the candidates found, possibly none
    Unresolved(Vec<IataMatch>),
}

pub fn resolve_airport(resolver: &IataResolver, input: &str, min_confidence: u8) -> AirportResolution {
    let matches = resolver.resolve(input);
    match matches.first() {
        Some(top) if top.confidence >= min_confidence => {
            tracing::info!(input, iata = %top.iata, confidence = top.confidence, "Resolved airport");
            AirportResolution::Resolved(top.iata.clone())
        }
        _ => {
            tracing::info!(input, candidates = matches.len(), "Could not resolve airport");
            AirportResolution::Unresolved(matches)
        }
    }
}

/// `\n\nDeparture "Foo" - No good matches found. Did you mean one of these?\n...`
pub fn describe_unresolved(side: &str, input: &str, matches: &[IataMatch]) -> String {
    let mut text = format!("\n\n{side} \"{input}\" - No good matches found.");
    if !matches.is_empty() {
        text.push_str(" Did you mean one of these?\n");
        text.push_str(&format_matches(matches));
    }
    text
}

/// 45000 -> "45,000"
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Trims trailing zeros: 5.6 -> "5.6", 120.0 -> "120"
pub fn format_amount(amount: f64) -> String {
    let rounded = (amount * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        let s = format!("{rounded:.2}");
        s.trim_end_matches('0').to_string()
    }
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        tracing::info!(tool = tool.name(), "Registered tool");
        self.tools.push(tool);
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition::function(t.name(), t.description(), t.parameters()))
            .collect()
    }

    pub async fn execute(&self, name: &str, args: Value, ctx: &ToolContext) -> Value {
        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => tool.execute(args, ctx).await,
            None => {
                tracing::warn!(tool = name, "Model called an unknown tool");
                failure(
                    format!("Unknown tool: {name}"),
                    format!("Tool {name} is not available"),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airports::AirportMap;

    #[test]
    fn thousands_separator() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(45000), "45,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn amounts() {
        assert_eq!(format_amount(120.0), "120");
        assert_eq!(format_amount(5.6), "5.6");
        assert_eq!(format_amount(5.678), "5.68");
    }

    #[test]
    fn resolution_respects_confidence_floor() {
        let resolver = IataResolver::new(Arc::new(AirportMap::bundled().expect("bundled")));
        assert_eq!(
            resolve_airport(&resolver, "Shanghai", 50),
            AirportResolution::Resolved("PVG".to_string())
        );
        // Country-only matches score 40
        match resolve_airport(&resolver, "Thailand", 50) {
            AirportResolution::Unresolved(matches) => assert_eq!(matches[0].iata, "BKK"),
            other => panic!("expected unresolved, got {other:?}"),
        }
        assert_eq!(
            resolve_airport(&resolver, "Atlantis", 50),
            AirportResolution::Unresolved(vec![])
        );
    }

    #[test]
    fn unresolved_description() {
        assert_eq!(
            describe_unresolved("Arrival", "Atlantis", &[]),
            "\n\nArrival \"Atlantis\" - No good matches found."
        );
    }

    #[test]
    fn today_uses_request_timezone() {
        let now = DateTime::parse_from_rfc3339("2026-03-01T20:00:00Z")
            .expect("valid")
            .with_timezone(&Utc);
        let ctx = ToolContext {
            timezone: chrono_tz::Asia::Shanghai,
            now,
        };
        assert_eq!(ctx.today(), NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid"));
    }

    #[tokio::test]
    async fn registry_dispatches_and_rejects_unknown() {
        let mut tool = MockTool::new();
        tool.expect_name().return_const("echo");
        tool.expect_execute()
            .returning(|args, _| json!({"success": true, "echo": args}));

        let registry = ToolRegistry::new().with(Arc::new(tool));
        let ctx = ToolContext::new(chrono_tz::UTC);

        let out = registry.execute("echo", json!({"a": 1}), &ctx).await;
        assert_eq!(out["echo"]["a"], 1);

        let missing = registry.execute("nope", json!({}), &ctx).await;
        assert_eq!(missing["success"], false);
        assert_eq!(missing["error"], "Unknown tool: nope");
    }
}
