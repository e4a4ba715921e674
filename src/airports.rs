//! Static airport reference data keyed by IATA code
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, TravelAssistantError};

const BUNDLED_AIRPORTS: &str = include_str!("../data/airports.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportRecord {
    pub iata: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icao: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Read-only airport lookup. Built once at startup and shared behind an `Arc`.
///
/// Backed by a `BTreeMap`, so iteration is always in IATA order.
#[derive(Debug, Clone, Default)]
pub struct AirportMap {
    airports: BTreeMap<String, AirportRecord>,
}

pub fn is_iata_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

impl AirportMap {
    /// Parse the `{ "PVG": { "iata": "PVG", ... } }` dataset format.
    /// Entries whose key is not a valid code or disagrees with the record are skipped.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let parsed: BTreeMap<String, AirportRecord> = serde_json::from_str(raw)?;
        let mut airports = BTreeMap::new();
        let mut skipped = 0usize;

        for (key, record) in parsed {
            if !is_iata_code(&key) || record.iata != key {
                tracing::warn!(key = %key, iata = %record.iata, "Skipping invalid airport entry");
                skipped += 1;
                continue;
            }
            airports.insert(key, record);
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} invalid airport entries", skipped);
        }
        Ok(Self { airports })
    }

    /// Dataset compiled into the binary
    pub fn bundled() -> Result<Self> {
        Self::from_json_str(BUNDLED_AIRPORTS)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            TravelAssistantError::Config(format!(
                "Failed to read airport dataset {}: {e}",
                path.display()
            ))
        })?;
        let map = Self::from_json_str(&raw)?;
        tracing::info!("Loaded {} airports from {}", map.len(), path.display());
        Ok(map)
    }

    /// Dataset override when configured, bundled dataset otherwise
    pub fn load_or_bundled(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::bundled(),
        }
    }

    pub fn from_records(records: impl IntoIterator<Item = AirportRecord>) -> Self {
        let airports = records
            .into_iter()
            .filter(|r| is_iata_code(&r.iata))
            .map(|r| (r.iata.clone(), r))
            .collect();
        Self { airports }
    }

    pub fn get(&self, iata: &str) -> Option<&AirportRecord> {
        self.airports.get(iata)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AirportRecord> {
        self.airports.values()
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    /// Serialize back to the keyed dataset format
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.airports)?)
    }
}

/// Row counts from a CSV import
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CsvImportStats {
    pub rows: usize,
    pub with_iata: usize,
}

fn csv_field(columns: &[&str], index: usize) -> Option<String> {
    columns
        .get(index)
        .map(|c| c.trim().trim_matches('"').trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// OurAirports-style export: col 0 IATA, 1 ICAO, 2 name, 9 country, 10 city.
/// The header row is skipped, as are rows with fewer than 11 columns or no valid IATA code.
pub fn parse_airports_csv(content: &str) -> (AirportMap, CsvImportStats) {
    let mut stats = CsvImportStats::default();
    let mut records = Vec::new();
    for line in content.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let columns: Vec<&str> = line.split(',').collect();
        if columns.len() < 11 {
            continue;
        }
        stats.rows += 1;

        let Some(iata) = csv_field(&columns, 0).filter(|c| is_iata_code(c)) else {
            continue;
        };
        stats.with_iata += 1;
        records.push(AirportRecord {
            iata,
            icao: csv_field(&columns, 1),
            name: csv_field(&columns, 2).unwrap_or_default(),
            city: csv_field(&columns, 10),
            country: csv_field(&columns, 9),
        });
    }
    (AirportMap::from_records(records), stats)
}
