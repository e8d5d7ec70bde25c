use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading the region reference table
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("Failed to read region table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Region table is empty")]
    Empty,
}

/// Standardized codes for one administrative region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionCode {
    pub postal_code: String,
    pub fips: String,
}

#[derive(Debug, Deserialize)]
struct RegionRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Postal Code")]
    postal_code: String,
    #[serde(rename = "FIPS")]
    fips: String,
}

/// Static state-name to region-code table, joined on exact name
#[derive(Debug, Clone)]
pub struct RegionTable {
    by_name: HashMap<String, RegionCode>,
}

const US_STATES: &[(&str, &str, &str)] = &[
    ("Alabama", "AL", "01"),
    ("Alaska", "AK", "02"),
    ("Arizona", "AZ", "04"),
    ("Arkansas", "AR", "05"),
    ("California", "CA", "06"),
    ("Colorado", "CO", "08"),
    ("Connecticut", "CT", "09"),
    ("Delaware", "DE", "10"),
    ("District of Columbia", "DC", "11"),
    ("Florida", "FL", "12"),
    ("Georgia", "GA", "13"),
    ("Hawaii", "HI", "15"),
    ("Idaho", "ID", "16"),
    ("Illinois", "IL", "17"),
    ("Indiana", "IN", "18"),
    ("Iowa", "IA", "19"),
    ("Kansas", "KS", "20"),
    ("Kentucky", "KY", "21"),
    ("Louisiana", "LA", "22"),
    ("Maine", "ME", "23"),
    ("Maryland", "MD", "24"),
    ("Massachusetts", "MA", "25"),
    ("Michigan", "MI", "26"),
    ("Minnesota", "MN", "27"),
    ("Mississippi", "MS", "28"),
    ("Missouri", "MO", "29"),
    ("Montana", "MT", "30"),
    ("Nebraska", "NE", "31"),
    ("Nevada", "NV", "32"),
    ("New Hampshire", "NH", "33"),
    ("New Jersey", "NJ", "34"),
    ("New Mexico", "NM", "35"),
    ("New York", "NY", "36"),
    ("North Carolina", "NC", "37"),
    ("North Dakota", "ND", "38"),
    ("Ohio", "OH", "39"),
    ("Oklahoma", "OK", "40"),
    ("Oregon", "OR", "41"),
    ("Pennsylvania", "PA", "42"),
    ("Rhode Island", "RI", "44"),
    ("South Carolina", "SC", "45"),
    ("South Dakota", "SD", "46"),
    ("Tennessee", "TN", "47"),
    ("Texas", "TX", "48"),
    ("Utah", "UT", "49"),
    ("Vermont", "VT", "50"),
    ("Virginia", "VA", "51"),
    ("Washington", "WA", "53"),
    ("West Virginia", "WV", "54"),
    ("Wisconsin", "WI", "55"),
    ("Wyoming", "WY", "56"),
];

impl RegionTable {
    /// The 50 U.S. states plus the District of Columbia
    pub fn us_states() -> Self {
        let by_name = US_STATES
            .iter()
            .map(|(name, postal, fips)| {
                (
                    name.to_string(),
                    RegionCode {
                        postal_code: postal.to_string(),
                        fips: fips.to_string(),
                    },
                )
            })
            .collect();
        Self { by_name }
    }

    /// Load a `Name,Postal Code,FIPS` CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, RegionError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut by_name = HashMap::new();
        for row in reader.deserialize::<RegionRow>() {
            let row = row?;
            by_name.insert(
                row.name,
                RegionCode {
                    postal_code: row.postal_code,
                    fips: row.fips,
                },
            );
        }

        if by_name.is_empty() {
            return Err(RegionError::Empty);
        }
        Ok(Self { by_name })
    }

    pub fn lookup(&self, state: &str) -> Option<&RegionCode> {
        self.by_name.get(state)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
