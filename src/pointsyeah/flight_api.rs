use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Bank {
    Amex,
    Chase,
    Citi,
    #[serde(rename = "Capital One")]
    CapitalOne,
    #[serde(rename = "WF")]
    WellsFargo,
}

impl Bank {
    pub const ALL: [Bank; 5] = [
        Bank::Amex,
        Bank::Chase,
        Bank::Citi,
        Bank::CapitalOne,
        Bank::WellsFargo,
    ];
}

/// Airline loyalty programs, serialized as their two-letter codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Program {
    #[serde(rename = "AM")]
    Aeromexico,
    #[serde(rename = "AV")]
    Avianca,
    #[serde(rename = "AC")]
    AirCanada,
    #[serde(rename = "KL")]
    Klm,
    #[serde(rename = "QF")]
    Qantas,
    #[serde(rename = "B6")]
    JetBlue,
    #[serde(rename = "DL")]
    Delta,
    #[serde(rename = "VS")]
    VirginAtlantic,
    #[serde(rename = "EK")]
    Emirates,
    #[serde(rename = "EY")]
    Etihad,
    #[serde(rename = "IB")]
    Iberia,
    #[serde(rename = "SQ")]
    SingaporeAirlines,
    #[serde(rename = "UA")]
    United,
    #[serde(rename = "TK")]
    Turkish,
    #[serde(rename = "AA")]
    American,
    #[serde(rename = "TP")]
    TapPortugal,
    #[serde(rename = "AY")]
    Finnair,
    #[serde(rename = "AR")]
    AerolineasArgentinas,
    #[serde(rename = "AS")]
    Alaska,
}

impl Program {
    pub const ALL: [Program; 19] = [
        Program::Aeromexico,
        Program::Avianca,
        Program::AirCanada,
        Program::Klm,
        Program::Qantas,
        Program::JetBlue,
        Program::Delta,
        Program::VirginAtlantic,
        Program::Emirates,
        Program::Etihad,
        Program::Iberia,
        Program::SingaporeAirlines,
        Program::United,
        Program::Turkish,
        Program::American,
        Program::TapPortugal,
        Program::Finnair,
        Program::AerolineasArgentinas,
        Program::Alaska,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TripType {
    Beach,
    City,
    Family,
    Fishing,
    Golf,
    Foodie,
    Honeymoon,
    Mountain,
    #[serde(rename = "Off beaten path")]
    OffBeatenPath,
    #[serde(rename = "Scuba Diving")]
    ScubaDiving,
    Ski,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum FlightSort {
    #[default]
    #[serde(rename = "miles")]
    Miles,
    #[serde(rename = "-miles")]
    MilesDesc,
    #[serde(rename = "tax")]
    Tax,
    #[serde(rename = "-updated_at")]
    NewestFirst,
}

pub const DEFAULT_CABINS: [&str; 4] = ["Economy", "Premium Economy", "Business", "First"];
const DEFAULT_PREMIUM_CABIN_PERCENTAGE: u8 = 60;
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Reward flight search as the model asks for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FlightSearchInput {
    /// Departure airport - can be IATA code (e.g., LAX, PVG, NRT) or city name (e.g., Los Angeles, Shanghai, Tokyo)
    #[serde(rename = "departureId")]
    pub departure_id: String,
    /// Arrival airport - can be IATA code (e.g., LAX, PVG, NRT), city name (e.g., Los Angeles, Shanghai, Tokyo), or "anywhere" for flexible destinations
    #[serde(rename = "arrivalId")]
    pub arrival_id: String,
    /// Departure date in YYYY-MM-DD format
    #[serde(rename = "outboundDate")]
    pub outbound_date: String,
    /// End date in YYYY-MM-DD format (for date range searches, leave empty for single date)
    #[serde(rename = "endDate", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Credit card transfer partners: Amex (American Express), Chase, Citi, Capital One, WF (Wells Fargo). Default: all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banks: Option<Vec<Bank>>,
    /// Airline programs: AM (Aeromexico), AV (Avianca), AC (Air Canada), KL (KLM), QF (Qantas), B6 (JetBlue), DL (Delta), VS (Virgin Atlantic), EK (Emirates), EY (Etihad), IB (Iberia), SQ (Singapore), UA (United), TK (Turkish), AA (American), TP (TAP), AY (Finnair), AR (Aerolineas), AS (Alaska)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programs: Option<Vec<Program>>,
    /// Cabin classes to search. Options: ["Economy", "Premium Economy", "Business", "First"]. Default includes all cabin classes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cabins: Option<Vec<String>>,
    /// Minimum percentage of premium cabin (Business/First) segments required (0-100). Default: 60
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(max = 100))]
    pub premium_cabin_percentage: Option<u8>,
    /// Maximum miles/points required for the flight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_points: Option<u64>,
    /// Minimum miles/points required for the flight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_points: Option<u64>,
    /// Maximum flight duration in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u64>,
    /// Minimum flight duration in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<u64>,
    /// Maximum taxes/fees in dollars
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tax: Option<f64>,
    /// Minimum taxes/fees in dollars
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_tax: Option<f64>,
    /// Trip type/category for destination recommendations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip: Option<TripType>,
    /// Sort results: "miles" (ascending), "-miles" (descending), "tax" (ascending), "-updated_at" (newest first). Default: "miles"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<FlightSort>,
    /// Number of seats needed (1-9). Default: 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 9))]
    pub seats: Option<u8>,
    /// Only show flights departing on weekends (Friday-Sunday). Default: false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekend_only: Option<bool>,
    /// Include collected flight data. Default: true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<bool>,
    /// Page number for results (starting from 1). Default: 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub page: Option<u32>,
    /// Number of results per page (1-50). Default: 10
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 50))]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlightLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airports: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anywhere: Option<bool>,
}

impl FlightLocation {
    fn airport(code: &str) -> Self {
        Self {
            airports: Some(vec![code.to_string()]),
            anywhere: None,
        }
    }

    fn anywhere() -> Self {
        Self {
            airports: None,
            anywhere: Some(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

/// Body of `POST /v2/beta/explorer/search`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightSearchParams {
    pub departure: FlightLocation,
    pub arrival: FlightLocation,
    pub start_date: String,
    pub end_date: String,
    pub banks: Vec<Bank>,
    pub programs: Vec<Program>,
    pub cabins: Vec<String>,
    pub premium_cabin_percentage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_points: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_points: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_tax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip: Option<TripType>,
    pub sort: FlightSort,
    pub pagination: Pagination,
    pub seats: u8,
    pub weekend_only: bool,
    pub collection: bool,
}

pub fn is_anywhere(location: &str) -> bool {
    location.trim().eq_ignore_ascii_case("anywhere")
}

impl FlightSearchInput {
    pub fn for_route(departure: &str, arrival: &str, outbound_date: &str) -> Self {
        Self {
            departure_id: departure.to_string(),
            arrival_id: arrival.to_string(),
            outbound_date: outbound_date.to_string(),
            end_date: None,
            banks: None,
            programs: None,
            cabins: None,
            premium_cabin_percentage: None,
            max_points: None,
            min_points: None,
            max_duration: None,
            min_duration: None,
            max_tax: None,
            min_tax: None,
            trip: None,
            sort: None,
            seats: None,
            weekend_only: None,
            collection: None,
            page: None,
            page_size: None,
        }
    }

    /// Fill in the explorer defaults. Expects already-resolved airport codes.
    pub fn to_api_params(&self) -> FlightSearchParams {
        let arrival = if is_anywhere(&self.arrival_id) {
            FlightLocation::anywhere()
        } else {
            FlightLocation::airport(&self.arrival_id)
        };

        FlightSearchParams {
            departure: FlightLocation::airport(&self.departure_id),
            arrival,
            start_date: self.outbound_date.clone(),
            end_date: self
                .end_date
                .clone()
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| self.outbound_date.clone()),
            banks: self.banks.clone().unwrap_or_else(|| Bank::ALL.to_vec()),
            programs: self.programs.clone().unwrap_or_else(|| Program::ALL.to_vec()),
            cabins: self
                .cabins
                .clone()
                .unwrap_or_else(|| DEFAULT_CABINS.iter().map(|c| c.to_string()).collect()),
            premium_cabin_percentage: self
                .premium_cabin_percentage
                .unwrap_or(DEFAULT_PREMIUM_CABIN_PERCENTAGE),
            max_points: self.max_points,
            min_points: self.min_points,
            max_duration: self.max_duration,
            min_duration: self.min_duration,
            max_tax: self.max_tax,
            min_tax: self.min_tax,
            trip: self.trip,
            sort: self.sort.unwrap_or_default(),
            pagination: Pagination {
                page: self.page.unwrap_or(1),
                page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            },
            seats: self.seats.unwrap_or(1),
            weekend_only: self.weekend_only.unwrap_or(false),
            collection: self.collection.unwrap_or(true),
        }
    }
}

// Response shapes. Every field defaults so a partial payload still parses.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerAirport {
    pub code: String,
    pub city: String,
    pub country_name: String,
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOption {
    pub bank: String,
    pub bonus_percentage: f64,
    pub url: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardFlight {
    /// Airline program code, e.g. "DL"
    pub program: String,
    pub departure_date: String,
    pub departure: ExplorerAirport,
    pub arrival: ExplorerAirport,
    pub miles: u64,
    pub tax: f64,
    pub cabin: String,
    pub detail_url: String,
    pub stops: u32,
    pub seats: u32,
    pub duration: u64,
    pub premium_cabin_percentage: f64,
    pub created_at: i64,
    pub updated_at: i64,
    pub transfer: Vec<TransferOption>,
    pub img: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightSearchResponse {
    pub total: u64,
    pub results: Vec<RewardFlight>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_every_omitted_field() {
        let params = FlightSearchInput::for_route("LAX", "PVG", "2026-12-01").to_api_params();
        let body = serde_json::to_value(&params).expect("serializes");

        assert_eq!(body["departure"], json!({"airports": ["LAX"]}));
        assert_eq!(body["arrival"], json!({"airports": ["PVG"]}));
        assert_eq!(body["end_date"], "2026-12-01");
        assert_eq!(body["banks"], json!(["Amex", "Chase", "Citi", "Capital One", "WF"]));
        assert_eq!(body["programs"].as_array().map(Vec::len), Some(19));
        assert_eq!(body["programs"][5], "B6");
        assert_eq!(
            body["cabins"],
            json!(["Economy", "Premium Economy", "Business", "First"])
        );
        assert_eq!(body["premium_cabin_percentage"], 60);
        assert_eq!(body["sort"], "miles");
        assert_eq!(body["pagination"], json!({"page": 1, "page_size": 10}));
        assert_eq!(body["seats"], 1);
        assert_eq!(body["weekend_only"], false);
        assert_eq!(body["collection"], true);
        assert!(body.get("max_points").is_none());
        assert!(body.get("trip").is_none());
    }

    #[test]
    fn anywhere_arrival() {
        let params = FlightSearchInput::for_route("SFO", "Anywhere", "2026-12-01").to_api_params();
        assert_eq!(params.arrival, FlightLocation::anywhere());
    }

    #[test]
    fn model_arguments_deserialize() {
        let args = json!({
            "departureId": "Shanghai",
            "arrivalId": "Tokyo",
            "outboundDate": "2026-11-20",
            "endDate": "2026-11-25",
            "programs": ["UA", "AS"],
            "trip": "Off beaten path",
            "sort": "-updated_at",
            "premium_cabin_percentage": 0,
            "collection": false
        });
        let input: FlightSearchInput = serde_json::from_value(args).expect("parses");
        assert_eq!(input.programs, Some(vec![Program::United, Program::Alaska]));
        assert_eq!(input.trip, Some(TripType::OffBeatenPath));

        let params = input.to_api_params();
        assert_eq!(params.end_date, "2026-11-25");
        assert_eq!(params.sort, FlightSort::NewestFirst);
        assert_eq!(params.premium_cabin_percentage, 0);
        assert!(!params.collection);
    }

    #[test]
    fn partial_response_parses() {
        let raw = json!({
            "total": 2,
            "results": [
                {"program": "DL", "miles": 45000, "tax": 5.6, "cabin": "Economy",
                 "departure": {"code": "LAX", "city": "Los Angeles"}},
                {"program": "VS", "miles": 30000, "tax": 120.0}
            ]
        });
        let resp: FlightSearchResponse = serde_json::from_value(raw).expect("parses");
        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.results[0].departure.code, "LAX");
        assert!(resp.results[1].transfer.is_empty());
    }
}
