use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::{Deserialize, Serialize};

/// Search radius the explorer uses for a city, in meters
const CITY_RADIUS: u32 = 30_000;
const MIN_FUZZY_LEN: usize = 4;

/// Location object the hotel explorer expects for a city search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelLocationObject {
    pub value: String,
    pub longitude: f64,
    pub latitude: f64,
    pub dest_type: String,
    pub country_code: String,
    pub city: String,
    pub label: String,
    pub distance: u32,
}

impl HotelLocationObject {
    fn city(value: &str, city: &str, country_code: &str, longitude: f64, latitude: f64) -> Self {
        Self {
            value: value.to_string(),
            longitude,
            latitude,
            dest_type: "city".to_string(),
            country_code: country_code.to_string(),
            city: city.to_string(),
            label: city.to_string(),
            distance: CITY_RADIUS,
        }
    }
}

/// (key, value, city, country code, longitude, latitude)
type CityEntry = (&'static str, &'static str, &'static str, &'static str, f64, f64);

// Sorted by key so fuzzy ties resolve the same way every run
const CITY_LOCATIONS: &[CityEntry] = &[
    ("beijing", "Beijing, Beijing Area, China", "Beijing", "CN", 116.4074, 39.9042),
    ("chengdu", "Chengdu, Sichuan, China", "Chengdu", "CN", 104.0668, 30.5728),
    ("dubai", "Dubai, Dubai, United Arab Emirates", "Dubai", "AE", 55.2708, 25.2048),
    ("guangzhou", "Guangzhou, Guangdong, China", "Guangzhou", "CN", 113.2644, 23.1291),
    ("hangzhou", "Hangzhou, Zhejiang, China", "Hangzhou", "CN", 120.1551, 30.2741),
    ("hong kong", "Hong Kong, Hong Kong SAR", "Hong Kong", "HK", 114.1694, 22.3193),
    ("london", "London, England, United Kingdom", "London", "GB", -0.1276, 51.5074),
    ("los angeles", "Los Angeles, California, United States", "Los Angeles", "US", -118.2437, 34.0522),
    ("new york", "New York, New York, United States", "New York", "US", -74.0059, 40.7128),
    ("paris", "Paris, Île-de-France, France", "Paris", "FR", 2.3522, 48.8566),
    ("shanghai", "Shanghai, Shanghai Area, China", "Shanghai", "CN", 121.4763, 31.229422),
    ("shenzhen", "Shenzhen, Guangdong, China", "Shenzhen", "CN", 114.0579, 22.5431),
    ("singapore", "Singapore, Singapore", "Singapore", "SG", 103.8198, 1.3521),
    ("tokyo", "Tokyo, Tokyo Prefecture, Japan", "Tokyo", "JP", 139.6503, 35.6762),
    ("xi'an", "Xi'an, Shaanxi, China", "Xi'an", "CN", 108.9402, 34.2619),
    ("xian", "Xi'an, Shaanxi, China", "Xi'an", "CN", 108.9402, 34.2619),
];

fn build(entry: &CityEntry) -> HotelLocationObject {
    let (_, value, city, country_code, longitude, latitude) = *entry;
    HotelLocationObject::city(value, city, country_code, longitude, latitude)
}

/// Cities that resolve to a full location object
pub fn available_cities() -> Vec<&'static str> {
    CITY_LOCATIONS.iter().map(|entry| entry.0).collect()
}

/// Exact (case-insensitive) lookup, then a fuzzy pass for near-miss spellings
/// such as "hongkong" or "newyork".
pub fn resolve_city_location(name: &str) -> Option<HotelLocationObject> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(entry) = CITY_LOCATIONS.iter().find(|entry| entry.0 == needle) {
        return Some(build(entry));
    }

    fuzzy_city(&needle).map(|entry| {
        tracing::debug!(input = %name, city = entry.0, "Fuzzy-matched hotel destination");
        build(entry)
    })
}

fn fuzzy_city(needle: &str) -> Option<&'static CityEntry> {
    let needle_len = needle.chars().count();
    if needle_len < MIN_FUZZY_LEN {
        return None;
    }

    let matcher = SkimMatcherV2::default();
    let mut best: Option<(i64, &'static CityEntry)> = None;
    for entry in CITY_LOCATIONS {
        let key_len = entry.0.chars().count();
        // Short fragments of long names are too ambiguous
        if needle_len * 10 < key_len * 7 {
            continue;
        }
        if let Some(score) = matcher.fuzzy_match(entry.0, needle) {
            if best.is_none_or(|(top, _)| score > top) {
                best = Some((score, entry));
            }
        }
    }
    best.map(|(_, entry)| entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_lookup_is_case_insensitive() {
        let loc = resolve_city_location("  Tokyo ").expect("tokyo");
        assert_eq!(loc.country_code, "JP");
        assert_eq!(loc.dest_type, "city");
        assert_eq!(loc.distance, 30_000);
    }

    #[test]
    fn xian_spellings_share_a_location() {
        assert_eq!(resolve_city_location("Xi'an"), resolve_city_location("xian"));
    }

    #[test]
    fn near_miss_spellings_resolve() {
        assert_eq!(
            resolve_city_location("HongKong").map(|l| l.city),
            Some("Hong Kong".to_string())
        );
        assert_eq!(
            resolve_city_location("newyork").map(|l| l.city),
            Some("New York".to_string())
        );
        assert_eq!(
            resolve_city_location("londn").map(|l| l.city),
            Some("London".to_string())
        );
    }

    #[test]
    fn unknown_or_short_input_is_none() {
        assert!(resolve_city_location("Reykjavik").is_none());
        assert!(resolve_city_location("lon").is_none());
        assert!(resolve_city_location("").is_none());
    }

    #[test]
    fn table_keys_are_sorted() {
        let cities = available_cities();
        let mut sorted = cities.clone();
        sorted.sort();
        assert_eq!(cities, sorted);
    }
}
