use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::airports::{AirportMap, AirportRecord};

/// Results at or below this score are noise
const NOISE_THRESHOLD: u8 = 30;
const MAX_RESULTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IataMatch {
    pub iata: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// 0-100 heuristic, not a probability
    pub confidence: u8,
}

impl IataMatch {
    fn from_record(record: &AirportRecord, confidence: u8) -> Self {
        Self {
            iata: record.iata.clone(),
            name: record.name.clone(),
            city: record.city.clone(),
            country: record.country.clone(),
            confidence,
        }
    }
}

/// Colloquial names that airports or cities are known by, keyed by lowercase city
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let pairs: &[(&str, &[&str])] = &[
            ("shanghai", &["pudong", "hongqiao"]),
            ("beijing", &["capital", "peking"]),
            ("guangzhou", &["canton"]),
            ("shenzhen", &["bao'an"]),
            ("tokyo", &["narita", "haneda"]),
            ("osaka", &["kansai", "itami"]),
            ("nagoya", &["chubu"]),
            ("new york", &["jfk", "laguardia", "newark"]),
            ("los angeles", &["lax"]),
            ("san francisco", &["sfo"]),
            ("chicago", &["o'hare", "midway"]),
            ("washington", &["dulles", "reagan"]),
            ("london", &["heathrow", "gatwick", "stansted", "luton"]),
            ("paris", &["charles de gaulle", "cdg", "orly"]),
            ("rome", &["fiumicino", "ciampino"]),
            ("milan", &["malpensa", "linate"]),
            ("berlin", &["tegel", "schoenefeld", "brandenburg"]),
        ];
        let entries = pairs
            .iter()
            .map(|(city, aliases)| {
                (
                    city.to_string(),
                    aliases.iter().map(|a| a.to_string()).collect(),
                )
            })
            .collect();
        Self { entries }
    }
}

impl AliasTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add aliases from configuration; keys and values are normalized to lowercase
    pub fn merge(mut self, extra: &BTreeMap<String, Vec<String>>) -> Self {
        for (city, aliases) in extra {
            let slot = self.entries.entry(city.trim().to_lowercase()).or_default();
            for alias in aliases {
                let alias = alias.trim().to_lowercase();
                if !alias.is_empty() && !slot.contains(&alias) {
                    slot.push(alias);
                }
            }
        }
        self
    }

    pub fn aliases_for(&self, term: &str) -> &[String] {
        self.entries.get(term).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// One heuristic the scorer evaluates against a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    CityExact,
    /// A query token equals a name token (only when the name contains the full term)
    NameWord,
    NameStartsWith,
    NameContains,
    CityStartsWith,
    CityContains,
    CountryContains,
    /// A known alias for the term appears in the name or city
    Alias,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringRule {
    pub kind: RuleKind,
    pub score: u8,
}

pub fn default_rules() -> Vec<ScoringRule> {
    use RuleKind::*;
    [
        (CityExact, 95),
        (NameWord, 85),
        (NameStartsWith, 80),
        (NameContains, 70),
        (CityStartsWith, 75),
        (CityContains, 60),
        (CountryContains, 40),
        (Alias, 65),
    ]
    .into_iter()
    .map(|(kind, score)| ScoringRule { kind, score })
    .collect()
}

/// Lowercased view of a candidate, computed once per record
struct Candidate {
    name: String,
    city: String,
    country: String,
}

impl Candidate {
    fn new(record: &AirportRecord) -> Self {
        Self {
            name: record.name.to_lowercase(),
            city: record.city.as_deref().unwrap_or_default().to_lowercase(),
            country: record.country.as_deref().unwrap_or_default().to_lowercase(),
        }
    }
}

impl RuleKind {
    fn matches(self, term: &str, aliases: &[String], c: &Candidate) -> bool {
        match self {
            RuleKind::CityExact => c.city == term,
            RuleKind::NameWord => {
                c.name.contains(term)
                    && term
                        .split_whitespace()
                        .any(|t| c.name.split_whitespace().any(|w| w == t))
            }
            RuleKind::NameStartsWith => c.name.starts_with(term),
            RuleKind::NameContains => c.name.contains(term),
            RuleKind::CityStartsWith => c.city.starts_with(term),
            RuleKind::CityContains => c.city.contains(term),
            RuleKind::CountryContains => c.country.contains(term),
            RuleKind::Alias => aliases
                .iter()
                .any(|a| c.name.contains(a.as_str()) || c.city.contains(a.as_str())),
        }
    }
}

/// Maps free-text places ("Shanghai", "heathrow", "lax") to ranked airports
#[derive(Debug, Clone)]
pub struct IataResolver {
    airports: Arc<AirportMap>,
    aliases: AliasTable,
    rules: Vec<ScoringRule>,
}

impl IataResolver {
    pub fn new(airports: Arc<AirportMap>) -> Self {
        Self::with_aliases(airports, AliasTable::default())
    }

    pub fn with_aliases(airports: Arc<AirportMap>, aliases: AliasTable) -> Self {
        Self {
            airports,
            aliases,
            rules: default_rules(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<ScoringRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn airports(&self) -> &AirportMap {
        &self.airports
    }

    /// Up to five candidates, highest confidence first. Never fails; no match is an empty vec.
    pub fn resolve(&self, input: &str) -> Vec<IataMatch> {
        let term = input.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }

        if term.len() == 3 && term.bytes().all(|b| b.is_ascii_lowercase()) {
            let code = term.to_ascii_uppercase();
            if let Some(record) = self.airports.get(&code) {
                return vec![IataMatch::from_record(record, 100)];
            }
        }

        let aliases = self.aliases.aliases_for(&term);
        let mut matches: Vec<IataMatch> = self
            .airports
            .iter()
            .filter_map(|record| {
                let score = self.score(&term, aliases, &Candidate::new(record));
                (score > NOISE_THRESHOLD).then(|| IataMatch::from_record(record, score))
            })
            .collect();

        // Stable: equal scores keep IATA order
        matches.sort_by(|a, b| b.confidence.cmp(&a.confidence));
        matches.truncate(MAX_RESULTS);
        matches
    }

    fn score(&self, term: &str, aliases: &[String], candidate: &Candidate) -> u8 {
        self.rules
            .iter()
            .filter(|rule| rule.kind.matches(term, aliases, candidate))
            .map(|rule| rule.score)
            .max()
            .unwrap_or(0)
    }

    pub fn best_match(&self, input: &str) -> Option<String> {
        self.resolve(input).into_iter().next().map(|m| m.iata)
    }
}

/// One line per match: `PVG - Shanghai Pudong International Airport (Shanghai), China [95%]`
pub fn format_matches(matches: &[IataMatch]) -> String {
    if matches.is_empty() {
        return "No airports found".to_string();
    }

    matches
        .iter()
        .map(|m| {
            let mut line = format!("{} - {}", m.iata, m.name);
            if let Some(city) = m.city.as_deref().filter(|c| !c.is_empty()) {
                line.push_str(&format!(" ({city})"));
            }
            if let Some(country) = m.country.as_deref().filter(|c| !c.is_empty()) {
                line.push_str(&format!(", {country}"));
            }
            line.push_str(&format!(" [{}%]", m.confidence));
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
