use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{
    AirportResolution, Tool, ToolContext, check_range, describe_unresolved, failure,
    format_amount, format_thousands, parameters_schema, parse_args, parse_date, resolve_airport,
};
use crate::iata::IataResolver;
use crate::pointsyeah::PointsYeahApi;
use crate::pointsyeah::flight_api::{FlightSearchInput, FlightSearchResponse, is_anywhere};

pub const NAME: &str = "pointsYeahFlightSearch";

pub struct RewardFlightSearchTool {
    api: Arc<dyn PointsYeahApi>,
    resolver: Arc<IataResolver>,
    min_confidence: u8,
}

impl RewardFlightSearchTool {
    pub fn new(api: Arc<dyn PointsYeahApi>, resolver: Arc<IataResolver>, min_confidence: u8) -> Self {
        Self {
            api,
            resolver,
            min_confidence,
        }
    }

    fn validate_dates(input: &FlightSearchInput) -> Result<(), String> {
        let outbound = parse_date("outboundDate", &input.outbound_date)?;
        if let Some(end) = input.end_date.as_deref().filter(|d| !d.is_empty()) {
            let end = parse_date("endDate", end)?;
            if end < outbound {
                return Err(format!(
                    "End date ({end}) must not be before outbound date ({outbound})"
                ));
            }
        }
        Ok(())
    }

    fn validate_ranges(input: &FlightSearchInput) -> Result<(), String> {
        check_range("seats", input.seats.map(u64::from), 1, Some(9))?;
        check_range("page", input.page.map(u64::from), 1, None)?;
        check_range("page_size", input.page_size.map(u64::from), 1, Some(50))?;
        check_range(
            "premium_cabin_percentage",
            input.premium_cabin_percentage.map(u64::from),
            0,
            Some(100),
        )
    }

    /// Replace free-text locations with IATA codes, or explain why that failed
    fn resolve_route(&self, input: &FlightSearchInput) -> Result<(String, String), Value> {
        let departure = resolve_airport(&self.resolver, &input.departure_id, self.min_confidence);
        let anywhere = is_anywhere(&input.arrival_id);
        let arrival = if anywhere {
            AirportResolution::Resolved("anywhere".to_string())
        } else {
            resolve_airport(&self.resolver, &input.arrival_id, self.min_confidence)
        };

        match (departure, arrival) {
            (AirportResolution::Resolved(dep), AirportResolution::Resolved(arr)) => Ok((dep, arr)),
            (departure, arrival) => {
                let mut error = "Could not resolve airports:".to_string();
                if let AirportResolution::Unresolved(matches) = &departure {
                    error.push_str(&describe_unresolved("Departure", &input.departure_id, matches));
                }
                if let AirportResolution::Unresolved(matches) = &arrival {
                    error.push_str(&describe_unresolved("Arrival", &input.arrival_id, matches));
                }
                let mut summary = format!(
                    "Failed to resolve airport codes for departure: \"{}\"",
                    input.departure_id
                );
                if !anywhere {
                    summary.push_str(&format!(" and arrival: \"{}\"", input.arrival_id));
                }
                Err(failure(error, summary))
            }
        }
    }
}

fn summarize(
    original: &FlightSearchInput,
    resolved: &FlightSearchInput,
    data: &FlightSearchResponse,
) -> String {
    let anywhere = is_anywhere(&original.arrival_id);
    let origin = format!("{} ({})", original.departure_id, resolved.departure_id);

    if data.results.is_empty() {
        let destination = if anywhere {
            "anywhere".to_string()
        } else {
            format!("{} ({})", original.arrival_id, resolved.arrival_id)
        };
        let through = resolved
            .end_date
            .as_ref()
            .filter(|d| !d.is_empty())
            .map(|d| format!(" (through {d})"))
            .unwrap_or_default();
        return format!(
            "No reward flights found from {origin} to {destination} on {}{through}. Try adjusting your search criteria like cabin class, programs, or dates.",
            resolved.outbound_date
        );
    }

    let destination = if anywhere {
        "various destinations".to_string()
    } else {
        format!("{} ({})", original.arrival_id, resolved.arrival_id)
    };
    // First minimum wins on ties
    let best_miles = data
        .results
        .iter()
        .fold(&data.results[0], |min, r| if r.miles < min.miles { r } else { min });
    let best_tax = data
        .results
        .iter()
        .fold(&data.results[0], |min, r| if r.tax < min.tax { r } else { min });

    format!(
        "Found {} total reward flights (showing {}) from {origin} to {destination}. \
         Best miles: {} miles + ${} taxes ({} {}). \
         Lowest taxes: ${} + {} miles.",
        data.total,
        data.results.len(),
        format_thousands(best_miles.miles),
        format_amount(best_miles.tax),
        best_miles.program,
        best_miles.cabin,
        format_amount(best_tax.tax),
        format_thousands(best_tax.miles),
    )
}

#[async_trait]
impl Tool for RewardFlightSearchTool {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Search for reward flights using PointsYeah API - specializes in finding award flights using points/miles from various loyalty programs and credit card transfer partners. This tool returns raw flight data including miles required, taxes, transfer partner options, and airline programs."
    }

    fn parameters(&self) -> Value {
        parameters_schema::<FlightSearchInput>()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Value {
        let input: FlightSearchInput = match parse_args(NAME, args) {
            Ok(input) => input,
            Err(fail) => return fail,
        };
        tracing::info!(
            departure = %input.departure_id,
            arrival = %input.arrival_id,
            date = %input.outbound_date,
            today = %ctx.today(),
            "Executing reward flight search"
        );

        if let Err(error) = Self::validate_ranges(&input) {
            return failure(error.clone(), format!("Invalid flight search parameters: {error}"));
        }
        if let Err(error) = Self::validate_dates(&input) {
            return failure(error.clone(), format!("Invalid flight dates: {error}"));
        }

        let (departure, arrival) = match self.resolve_route(&input) {
            Ok(route) => route,
            Err(fail) => return fail,
        };

        let resolved = FlightSearchInput {
            departure_id: departure,
            arrival_id: arrival,
            ..input.clone()
        };
        let params = resolved.to_api_params();

        match self.api.search_flights(&params).await {
            Ok(data) => {
                let summary = summarize(&input, &resolved, &data);
                tracing::info!(summary = %summary, "Reward flight search complete");
                json!({
                    "success": true,
                    "pointsyeah_data": data,
                    "summary": summary,
                    "search_params": resolved,
                })
            }
            Err(e) => {
                tracing::error!("PointsYeah flight search error: {}", e);
                json!({
                    "success": false,
                    "error": e.to_string(),
                    "summary": format!("Failed to search reward flights: {e}"),
                    "search_params": resolved,
                })
            }
        }
    }
}
