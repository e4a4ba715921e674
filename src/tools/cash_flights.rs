use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{
    AirportResolution, Tool, ToolContext, describe_unresolved, failure, format_amount,
    parameters_schema, parse_args, parse_date, resolve_airport,
};
use crate::iata::IataResolver;
use crate::serpapi::{CashFlightApi, CashFlightSearchInput, FlightResult};

pub const NAME: &str = "flightSearch";

/// Cash fares through Google Flights; registered only when a SerpAPI key exists
pub struct CashFlightSearchTool {
    api: Arc<dyn CashFlightApi>,
    resolver: Arc<IataResolver>,
    min_confidence: u8,
}

impl CashFlightSearchTool {
    pub fn new(api: Arc<dyn CashFlightApi>, resolver: Arc<IataResolver>, min_confidence: u8) -> Self {
        Self {
            api,
            resolver,
            min_confidence,
        }
    }
}

fn summarize(input: &CashFlightSearchInput, flights: &[FlightResult]) -> String {
    let route = format!("{} to {}", input.departure_id, input.arrival_id);
    let cheapest = flights
        .iter()
        .filter(|f| f.price > 0.0)
        .min_by(|a, b| a.price.total_cmp(&b.price));
    match cheapest {
        Some(f) => format!(
            "Found {} flight options from {route} on {}. Cheapest: ${} ({}).",
            flights.len(),
            input.outbound_date,
            format_amount(f.price),
            f.flights
                .iter()
                .map(|s| s.airline.as_str())
                .collect::<Vec<_>>()
                .join(" / "),
        ),
        None if flights.is_empty() => format!(
            "No flights found from {route} on {}. Try different dates or nearby airports.",
            input.outbound_date
        ),
        None => format!(
            "Found {} flight options from {route} on {} (no prices listed).",
            flights.len(),
            input.outbound_date
        ),
    }
}

#[async_trait]
impl Tool for CashFlightSearchTool {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Search for cash-fare flights between two airports using Google Flights. Accepts IATA codes or city names and returns itineraries with prices, airlines, segment times and a booking link."
    }

    fn parameters(&self) -> Value {
        parameters_schema::<CashFlightSearchInput>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Value {
        let input: CashFlightSearchInput = match parse_args(NAME, args) {
            Ok(input) => input,
            Err(fail) => return fail,
        };

        if let Err(error) = parse_date("outboundDate", &input.outbound_date) {
            return failure(error, format!("Invalid outbound date: {}", input.outbound_date));
        }
        if let Some(ret) = input.return_date.as_deref().filter(|d| !d.is_empty()) {
            if let Err(error) = parse_date("returnDate", ret) {
                return failure(error, format!("Invalid return date: {ret}"));
            }
        }

        let departure = resolve_airport(&self.resolver, &input.departure_id, self.min_confidence);
        let arrival = resolve_airport(&self.resolver, &input.arrival_id, self.min_confidence);
        let (departure, arrival) = match (departure, arrival) {
            (AirportResolution::Resolved(d), AirportResolution::Resolved(a)) => (d, a),
            (departure, arrival) => {
                let mut error = "Could not resolve airports:".to_string();
                if let AirportResolution::Unresolved(m) = &departure {
                    error.push_str(&describe_unresolved("Departure", &input.departure_id, m));
                }
                if let AirportResolution::Unresolved(m) = &arrival {
                    error.push_str(&describe_unresolved("Arrival", &input.arrival_id, m));
                }
                return failure(
                    error,
                    format!(
                        "Failed to resolve airport codes for departure: \"{}\" and arrival: \"{}\"",
                        input.departure_id, input.arrival_id
                    ),
                );
            }
        };

        let resolved = CashFlightSearchInput {
            departure_id: departure,
            arrival_id: arrival,
            ..input
        };

        match self.api.search_flights(&resolved).await {
            Ok(flights) => {
                let summary = summarize(&resolved, &flights);
                json!({
                    "success": true,
                    "flights": flights,
                    "summary": summary,
                    "search_params": resolved,
                })
            }
            Err(e) => {
                tracing::error!("Flight search error: {}", e);
                failure(e.to_string(), format!("Failed to search flights: {e}"))
            }
        }
    }
}
