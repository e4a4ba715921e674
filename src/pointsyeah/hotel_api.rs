use schemars::JsonSchema;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::flight_api::{Pagination, TransferOption, is_anywhere};
use super::hotel_location::{HotelLocationObject, resolve_city_location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HotelProgram {
    Hilton,
    Hyatt,
    Ihg,
    Marriott,
}

impl HotelProgram {
    pub const ALL: [HotelProgram; 4] = [
        HotelProgram::Hilton,
        HotelProgram::Hyatt,
        HotelProgram::Ihg,
        HotelProgram::Marriott,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum HotelBank {
    Amex,
    Bilt,
    #[serde(rename = "Capital One")]
    CapitalOne,
    Chase,
    Citi,
    #[serde(rename = "WF")]
    WellsFargo,
}

impl HotelBank {
    pub const ALL: [HotelBank; 6] = [
        HotelBank::Amex,
        HotelBank::Bilt,
        HotelBank::CapitalOne,
        HotelBank::Chase,
        HotelBank::Citi,
        HotelBank::WellsFargo,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum HotelSort {
    /// Cents per point
    #[default]
    #[serde(rename = "cpp")]
    Cpp,
    #[serde(rename = "cash")]
    Cash,
    #[serde(rename = "-cash")]
    CashDesc,
    #[serde(rename = "distance")]
    Distance,
    #[serde(rename = "points")]
    Points,
    #[serde(rename = "-points")]
    PointsDesc,
    #[serde(rename = "-updated_at")]
    NewestFirst,
}

impl HotelSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            HotelSort::Cpp => "cpp",
            HotelSort::Cash => "cash",
            HotelSort::CashDesc => "-cash",
            HotelSort::Distance => "distance",
            HotelSort::Points => "points",
            HotelSort::PointsDesc => "-points",
            HotelSort::NewestFirst => "-updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Amenity {
    PetFriendly,
    FreeParking,
    FreeAirportsShuttle,
    Resort,
    AmazingBathtub,
    AllInclusive,
    InfinitePool,
    PlungePool,
    KidsClub,
    WaterSlide,
    Golf,
    CityCenter,
    ClubLounge,
}

const DEFAULT_PAGE_SIZE: u32 = 17;

/// Reward hotel search as the model asks for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HotelSearchInput {
    /// Destination city or location (e.g., "Tokyo", "New York", "Paris"). Leave empty to search anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Check-in date in YYYY-MM-DD format
    #[serde(rename = "checkInDate")]
    pub check_in_date: String,
    /// Check-out date in YYYY-MM-DD format
    #[serde(rename = "checkOutDate")]
    pub check_out_date: String,
    /// Hotel loyalty programs to search (hilton, hyatt, ihg, marriott)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programs: Option<Vec<HotelProgram>>,
    /// Credit card transfer partners
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banks: Option<Vec<HotelBank>>,
    /// Desired hotel amenities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<Amenity>>,
    /// Maximum points per night
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_points: Option<u64>,
    /// Maximum cash price per night
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u64>,
    /// Search weekend dates only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekend_only: Option<bool>,
    /// Search holiday periods only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holiday_only: Option<bool>,
    /// Search suite rooms only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suit_only: Option<bool>,
    /// Sort results by: cpp (cents per point), cash, distance, points, or updated_at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<HotelSort>,
    /// Page number for pagination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub page: Option<u32>,
    /// Number of results per page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 50))]
    pub page_size: Option<u32>,
}

/// Where to search. Serializes to the shapes the explorer accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum HotelLocation {
    /// `{}`
    Unspecified,
    /// `{"anywhere": true}`
    Anywhere,
    /// Full location object with coordinates
    Resolved(HotelLocationObject),
    /// `{"city": "..."}` for cities without coordinates
    City(String),
}

impl HotelLocation {
    pub fn from_destination(destination: Option<&str>) -> Self {
        let Some(dest) = destination.map(str::trim).filter(|d| !d.is_empty()) else {
            return HotelLocation::Unspecified;
        };
        if is_anywhere(dest) {
            return HotelLocation::Anywhere;
        }
        match resolve_city_location(dest) {
            Some(location) => {
                tracing::debug!(destination = %dest, value = %location.value, "Resolved hotel destination");
                HotelLocation::Resolved(location)
            }
            None => {
                tracing::debug!(destination = %dest, "No location object for destination, using city name");
                HotelLocation::City(dest.to_string())
            }
        }
    }
}

impl Serialize for HotelLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HotelLocation::Resolved(location) => location.serialize(serializer),
            HotelLocation::Unspecified => serializer.serialize_map(Some(0))?.end(),
            HotelLocation::Anywhere => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("anywhere", &true)?;
                map.end()
            }
            HotelLocation::City(city) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("city", city)?;
                map.end()
            }
        }
    }
}

/// Body of `POST /v2/beta/hotel/explorer/search`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotelSearchParams {
    pub location: HotelLocation,
    pub start_date: String,
    pub end_date: String,
    pub weekend_only: bool,
    pub holiday_only: bool,
    pub max_points: u64,
    /// The explorer spells it `max_prices`
    pub max_prices: u64,
    pub suit_only: bool,
    pub amenities: Vec<Amenity>,
    pub programs: Vec<HotelProgram>,
    pub free_night_certificate: Vec<String>,
    pub sort: HotelSort,
    pub tag: Vec<String>,
    pub banks: Vec<HotelBank>,
    pub pagination: Pagination,
}

impl HotelSearchInput {
    pub fn to_api_params(&self) -> HotelSearchParams {
        HotelSearchParams {
            location: HotelLocation::from_destination(self.destination.as_deref()),
            start_date: self.check_in_date.clone(),
            end_date: self.check_out_date.clone(),
            weekend_only: self.weekend_only.unwrap_or(false),
            holiday_only: self.holiday_only.unwrap_or(false),
            max_points: self.max_points.unwrap_or(0),
            max_prices: self.max_price.unwrap_or(0),
            suit_only: self.suit_only.unwrap_or(false),
            amenities: self.amenities.clone().unwrap_or_default(),
            programs: self
                .programs
                .clone()
                .unwrap_or_else(|| HotelProgram::ALL.to_vec()),
            free_night_certificate: Vec::new(),
            sort: self.sort.unwrap_or_default(),
            tag: Vec::new(),
            banks: self.banks.clone().unwrap_or_else(|| HotelBank::ALL.to_vec()),
            pagination: Pagination {
                page: self.page.unwrap_or(1),
                page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyLocation {
    pub city: String,
    pub address: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelBrand {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelProperty {
    pub ota: Vec<String>,
    pub code: String,
    pub name: String,
    pub tags: Vec<String>,
    pub brand: HotelBrand,
    pub image: String,
    pub program: String,
    pub calendar: bool,
    pub category: String,
    pub location: PropertyLocation,
    pub amenities: Vec<String>,
    pub property_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardHotel {
    pub points: u64,
    pub cash_price: f64,
    pub room_type: String,
    pub property: HotelProperty,
    pub featured: bool,
    pub transfer: Vec<TransferOption>,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelSearchResponse {
    pub total: u64,
    pub results: Vec<RewardHotel>,
}

/// The hotel explorer wraps its payload as `{code, data}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HotelApiEnvelope {
    pub code: i64,
    pub data: HotelSearchResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(destination: Option<&str>) -> HotelSearchInput {
        serde_json::from_value(json!({
            "destination": destination,
            "checkInDate": "2026-12-01",
            "checkOutDate": "2026-12-03"
        }))
        .expect("parses")
    }

    #[test]
    fn defaults_fill_every_omitted_field() {
        let body = serde_json::to_value(input(Some("Tokyo")).to_api_params()).expect("serializes");
        assert_eq!(body["location"]["country_code"], "JP");
        assert_eq!(body["location"]["dest_type"], "city");
        assert_eq!(body["start_date"], "2026-12-01");
        assert_eq!(body["end_date"], "2026-12-03");
        assert_eq!(body["max_points"], 0);
        assert_eq!(body["max_prices"], 0);
        assert_eq!(body["programs"], json!(["hilton", "hyatt", "ihg", "marriott"]));
        assert_eq!(
            body["banks"],
            json!(["Amex", "Bilt", "Capital One", "Chase", "Citi", "WF"])
        );
        assert_eq!(body["amenities"], json!([]));
        assert_eq!(body["free_night_certificate"], json!([]));
        assert_eq!(body["tag"], json!([]));
        assert_eq!(body["sort"], "cpp");
        assert_eq!(body["pagination"], json!({"page": 1, "page_size": 17}));
    }

    #[test]
    fn location_shapes() {
        let shape = |dest: Option<&str>| {
            serde_json::to_value(input(dest).to_api_params().location).expect("serializes")
        };
        assert_eq!(shape(None), json!({}));
        assert_eq!(shape(Some("  ")), json!({}));
        assert_eq!(shape(Some("ANYWHERE")), json!({"anywhere": true}));
        assert_eq!(shape(Some("Reykjavik")), json!({"city": "Reykjavik"}));
        assert_eq!(shape(Some("hongkong"))["city"], "Hong Kong");
    }

    #[test]
    fn amenities_use_snake_case() {
        let raw = json!({
            "checkInDate": "2026-12-01",
            "checkOutDate": "2026-12-03",
            "amenities": ["free_airports_shuttle", "club_lounge"],
            "sort": "-points",
            "max_price": 300
        });
        let input: HotelSearchInput = serde_json::from_value(raw).expect("parses");
        let params = input.to_api_params();
        assert_eq!(params.amenities, vec![Amenity::FreeAirportsShuttle, Amenity::ClubLounge]);
        assert_eq!(params.sort, HotelSort::PointsDesc);
        assert_eq!(params.max_prices, 300);
    }

    #[test]
    fn envelope_unwraps() {
        let raw = json!({
            "code": 0,
            "data": {
                "total": 1,
                "results": [{
                    "points": 40000,
                    "cash_price": 512.5,
                    "room_type": "Standard King",
                    "property": {"name": "Park Hyatt Tokyo", "program": "hyatt",
                                 "brand": {"code": "PH", "name": "Park Hyatt"}}
                }]
            }
        });
        let envelope: HotelApiEnvelope = serde_json::from_value(raw).expect("parses");
        assert_eq!(envelope.data.total, 1);
        assert_eq!(envelope.data.results[0].property.brand.name, "Park Hyatt");
    }
}
