//! SerpAPI Google Flights engine (cash fares)

use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::error::{Result, TravelAssistantError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CashFlightSearchInput {
    /// Departure airport - IATA code (e.g., LAX) or city name (e.g., Los Angeles)
    #[serde(rename = "departureId")]
    pub departure_id: String,
    /// Arrival airport - IATA code (e.g., PVG) or city name (e.g., Shanghai)
    #[serde(rename = "arrivalId")]
    pub arrival_id: String,
    /// Departure date in YYYY-MM-DD format
    #[serde(rename = "outboundDate")]
    pub outbound_date: String,
    /// Return date in YYYY-MM-DD format (round trips only)
    #[serde(rename = "returnDate", default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    /// Trip type: 1 = Round trip, 2 = One way, 3 = Multi-city
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 3))]
    pub trip_type: Option<u8>,
    /// Currency code. Default: USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Language code. Default: en
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Country code for localization. Default: us
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl CashFlightSearchInput {
    /// Query string for `GET /search.json`
    pub fn query(&self, api_key: &str) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("engine", "google_flights".to_string()),
            ("departure_id", self.departure_id.clone()),
            ("arrival_id", self.arrival_id.clone()),
            ("outbound_date", self.outbound_date.clone()),
        ];
        if let Some(date) = self.return_date.as_ref().filter(|d| !d.is_empty()) {
            query.push(("return_date", date.clone()));
        }
        if let Some(kind) = self.trip_type {
            query.push(("type", kind.to_string()));
        }
        query.push(("currency", self.currency.clone().unwrap_or_else(|| "USD".to_string())));
        query.push(("hl", self.language.clone().unwrap_or_else(|| "en".to_string())));
        query.push(("gl", self.country.clone().unwrap_or_else(|| "us".to_string())));
        query.push(("api_key", api_key.to_string()));
        query
    }
}

// Normalized result

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentAirport {
    pub id: String,
    pub name: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSegment {
    pub departure_airport: SegmentAirport,
    pub arrival_airport: SegmentAirport,
    pub duration: u64,
    pub airline: String,
    pub airline_logo: String,
    pub flight_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legroom: Option<String>,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightResult {
    pub departure_airport: AirportRef,
    pub arrival_airport: AirportRef,
    pub flights: Vec<FlightSegment>,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub book_link: String,
}

// Raw SerpAPI payload, only the parts we read

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAirport {
    id: Option<String>,
    name: Option<String>,
    time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSegment {
    departure_airport: Option<RawAirport>,
    arrival_airport: Option<RawAirport>,
    duration: Option<u64>,
    airline: Option<String>,
    airline_logo: Option<String>,
    flight_number: Option<String>,
    legroom: Option<String>,
    extensions: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOption {
    flights: Vec<RawSegment>,
    price: Option<f64>,
    #[serde(rename = "type")]
    kind: Option<String>,
    airline_logo: Option<String>,
    booking_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSearchResult {
    error: Option<String>,
    best_flights: Vec<RawOption>,
    other_flights: Vec<RawOption>,
}

fn or_unknown(value: Option<&String>, fallback: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

fn segment_airport(raw: Option<&RawAirport>) -> SegmentAirport {
    SegmentAirport {
        id: or_unknown(raw.and_then(|a| a.id.as_ref()), "unknown"),
        name: or_unknown(raw.and_then(|a| a.name.as_ref()), "Unknown Airport"),
        time: or_unknown(raw.and_then(|a| a.time.as_ref()), "unknown"),
    }
}

fn normalize(option: RawOption) -> Option<FlightResult> {
    let first = option.flights.first()?;
    let last = option.flights.last()?;
    let departure = segment_airport(first.departure_airport.as_ref());
    let arrival = segment_airport(last.arrival_airport.as_ref());

    let flights = option
        .flights
        .iter()
        .map(|segment| FlightSegment {
            departure_airport: segment_airport(segment.departure_airport.as_ref()),
            arrival_airport: segment_airport(segment.arrival_airport.as_ref()),
            duration: segment.duration.unwrap_or(0),
            airline: or_unknown(segment.airline.as_ref(), "Unknown Airline"),
            airline_logo: segment
                .airline_logo
                .clone()
                .or_else(|| option.airline_logo.clone())
                .unwrap_or_default(),
            flight_number: or_unknown(segment.flight_number.as_ref(), "unknown"),
            legroom: segment.legroom.clone(),
            extensions: segment.extensions.clone().unwrap_or_default(),
        })
        .collect();

    Some(FlightResult {
        departure_airport: AirportRef {
            id: departure.id,
            name: departure.name,
        },
        arrival_airport: AirportRef {
            id: arrival.id,
            name: arrival.name,
        },
        flights,
        price: option.price.unwrap_or(0.0),
        kind: or_unknown(option.kind.as_ref(), "unknown"),
        book_link: format!(
            "https://www.google.com/travel/flights/booking?token={}",
            option.booking_token.unwrap_or_default()
        ),
    })
}

/// Flatten best + other flights, skipping options without segments
fn flatten(raw: RawSearchResult) -> Result<Vec<FlightResult>> {
    if let Some(error) = raw.error {
        return Err(TravelAssistantError::Upstream {
            service: "SerpAPI".to_string(),
            status: 200,
            body: error,
        });
    }
    Ok(raw
        .best_flights
        .into_iter()
        .chain(raw.other_flights)
        .filter_map(|option| {
            let normalized = normalize(option);
            if normalized.is_none() {
                tracing::warn!("Skipping SerpAPI flight option without segments");
            }
            normalized
        })
        .collect())
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CashFlightApi: Send + Sync {
    async fn search_flights(&self, input: &CashFlightSearchInput) -> Result<Vec<FlightResult>>;
}

pub struct SerpApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SerpApiClient {
    pub fn new(client: Client, base_url: &str, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl CashFlightApi for SerpApiClient {
    async fn search_flights(&self, input: &CashFlightSearchInput) -> Result<Vec<FlightResult>> {
        tracing::debug!(
            departure = %input.departure_id,
            arrival = %input.arrival_id,
            date = %input.outbound_date,
            "SerpAPI flight search"
        );
        let response = self
            .client
            .get(format!("{}/search.json", self.base_url))
            .query(&input.query(&self.api_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TravelAssistantError::Upstream {
                service: "SerpAPI".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let raw: RawSearchResult = response.json().await?;
        let flights = flatten(raw)?;
        tracing::info!("SerpAPI returned {} flight options", flights.len());
        Ok(flights)
    }
}
