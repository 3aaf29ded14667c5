//! Record filters applied before the engine runs.
//!
//! The engine has no notion of region or of FAOSTAT aggregate areas; callers
//! narrow the record collection here and pass the result on.

use crate::engine::BalanceRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Country search results are capped at this many names.
pub const MAX_COUNTRY_RESULTS: usize = 200;

/// FAOSTAT areas that duplicate or overlap a sovereign country entry.
pub const SPECIAL_AREA_MARKERS: [&str; 3] = [", mainland", "Taiwan Province of", "(Kingdom of the)"];

const AFRICA: [&str; 10] = [
    "Nigeria",
    "Egypt",
    "Algeria",
    "Morocco",
    "Tunisia",
    "Kenya",
    "Ethiopia",
    "Ghana",
    "Senegal",
    "South Africa",
];

const EU: [&str; 12] = [
    "Germany",
    "France",
    "Italy",
    "Spain",
    "Netherlands",
    "Belgium",
    "Poland",
    "Portugal",
    "Greece",
    "Austria",
    "Sweden",
    "Finland",
];

/// Region presets offered to dashboard users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Region {
    #[default]
    All,
    Africa,
    #[serde(rename = "EU")]
    Eu,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::All => "All",
            Region::Africa => "Africa",
            Region::Eu => "EU",
        }
    }

    /// Countries in the preset, `None` for [`Region::All`].
    pub fn countries(&self) -> Option<&'static [&'static str]> {
        match self {
            Region::All => None,
            Region::Africa => Some(&AFRICA[..]),
            Region::Eu => Some(&EU[..]),
        }
    }

    pub fn contains(&self, country: &str) -> bool {
        match self.countries() {
            None => true,
            Some(members) => members.contains(&country),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Region::All),
            "africa" => Ok(Region::Africa),
            "eu" => Ok(Region::Eu),
            other => Err(format!("unknown region '{}': expected All, Africa or EU", other)),
        }
    }
}

/// True for FAOSTAT aggregate or duplicate areas such as "China, mainland".
pub fn is_special_area(country: &str) -> bool {
    let lower = country.to_lowercase();
    SPECIAL_AREA_MARKERS
        .iter()
        .any(|marker| lower.contains(&marker.to_lowercase()))
}

/// Combined pre-engine predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub region: Region,
    /// Case-insensitive exact commodity name.
    pub commodity: Option<String>,
    pub drop_special_areas: bool,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self {
            drop_special_areas: true,
            ..Default::default()
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_commodity(mut self, commodity: impl Into<String>) -> Self {
        self.commodity = Some(commodity.into());
        self
    }

    pub fn keep_special_areas(mut self) -> Self {
        self.drop_special_areas = false;
        self
    }

    pub fn matches(&self, record: &BalanceRecord) -> bool {
        if self.drop_special_areas && is_special_area(record.country()) {
            return false;
        }
        if !self.region.contains(record.country()) {
            return false;
        }
        match &self.commodity {
            Some(commodity) => {
                record.commodity().trim().to_lowercase() == commodity.trim().to_lowercase()
            }
            None => true,
        }
    }

    pub fn apply(&self, records: &[BalanceRecord]) -> Vec<BalanceRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Sorted distinct commodity names.
pub fn list_commodities(records: &[BalanceRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.commodity().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted distinct country names containing `query` (case-insensitive),
/// special areas hidden, at most [`MAX_COUNTRY_RESULTS`].
pub fn search_countries(records: &[BalanceRecord], query: Option<&str>) -> Vec<String> {
    let needle = query.map(|q| q.trim().to_lowercase());
    records
        .iter()
        .map(|r| r.country())
        .filter(|c| !is_special_area(c))
        .filter(|c| match &needle {
            Some(n) => c.to_lowercase().contains(n.as_str()),
            None => true,
        })
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(MAX_COUNTRY_RESULTS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BalanceInput;

    fn record(country: &str, commodity: &str) -> BalanceRecord {
        BalanceRecord::from_input(BalanceInput::new(country, commodity, 1.0, 1.0, 0.0)).unwrap()
    }

    fn sample() -> Vec<BalanceRecord> {
        vec![
            record("Egypt", "Wheat"),
            record("Egypt", "Maize (corn)"),
            record("France", "Wheat"),
            record("China, mainland", "Wheat"),
            record("China, Taiwan Province of", "Maize (corn)"),
            record("Netherlands (Kingdom of the)", "Wheat"),
            record("Japan", "Wheat"),
        ]
    }

    #[test]
    fn test_special_areas() {
        assert!(is_special_area("China, mainland"));
        assert!(is_special_area("China, Taiwan Province of"));
        assert!(is_special_area("Netherlands (Kingdom of the)"));
        assert!(!is_special_area("China"));
    }

    #[test]
    fn test_region_filter() {
        let records = sample();
        let africa = RecordFilter::new().with_region(Region::Africa).apply(&records);
        assert_eq!(africa.len(), 2);
        let eu = RecordFilter::new().with_region(Region::Eu).apply(&records);
        assert_eq!(eu.len(), 1);
        assert_eq!(eu[0].country(), "France");
    }

    #[test]
    fn test_commodity_filter_case_insensitive() {
        let records = sample();
        let wheat = RecordFilter::new().with_commodity("WHEAT").apply(&records);
        let countries: Vec<&str> = wheat.iter().map(|r| r.country()).collect();
        assert_eq!(countries, vec!["Egypt", "France", "Japan"]);
    }

    #[test]
    fn test_keep_special_areas() {
        let records = sample();
        assert_eq!(RecordFilter::new().apply(&records).len(), 4);
        assert_eq!(
            RecordFilter::new().keep_special_areas().apply(&records).len(),
            7
        );
    }

    #[test]
    fn test_region_parsing() {
        assert_eq!("africa".parse::<Region>().unwrap(), Region::Africa);
        assert_eq!("EU".parse::<Region>().unwrap(), Region::Eu);
        assert!("Asia".parse::<Region>().is_err());
    }

    #[test]
    fn test_listing_helpers() {
        let records = sample();
        assert_eq!(list_commodities(&records), vec!["Maize (corn)", "Wheat"]);
        assert_eq!(
            search_countries(&records, None),
            vec!["Egypt", "France", "Japan"]
        );
        assert_eq!(search_countries(&records, Some("an")), vec!["France", "Japan"]);
    }
}
