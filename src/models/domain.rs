use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Stable identifier of a record: its zero-based position in the ingested input
pub type RowId = usize;

/// Operating status of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveStatus {
    Active,
    Inactive,
    Unknown,
}

impl ActiveStatus {
    /// Parse the feed's string encoding (`TRUE`, `True`, `false`, ...)
    ///
    /// Anything other than a case-insensitive `true`/`false` is `Unknown`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("true") => ActiveStatus::Active,
            Some(value) if value.eq_ignore_ascii_case("false") => ActiveStatus::Inactive,
            _ => ActiveStatus::Unknown,
        }
    }

    /// Canonical string encoding, empty for unknown
    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveStatus::Active => "True",
            ActiveStatus::Inactive => "False",
            ActiveStatus::Unknown => "",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ActiveStatus::Unknown)
    }
}

/// One row as it arrives from the aggregated feed, before any cleaning
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawRecord {
    pub name: Option<String>,
    pub platform: Option<String>,
    pub sub_platform: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub active: Option<String>,
    /// Columns outside the core schema, passed through untouched
    pub extra: BTreeMap<String, String>,
}

/// A cleaned restaurant listing flowing through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct RestaurantRecord {
    pub row_id: RowId,
    pub name: String,
    pub platform: Arc<str>,
    pub sub_platform: Arc<str>,
    pub latitude: f64,
    pub longitude: f64,
    pub active: ActiveStatus,
    pub city: Arc<str>,
    pub state: Arc<str>,
    pub country: Arc<str>,
    pub postal_code: Arc<str>,
    /// Name-cluster label, scoped to the record's locality. Never persisted.
    pub group_id: Option<usize>,
    pub extra: BTreeMap<String, String>,
}

impl RestaurantRecord {
    pub fn locality(&self) -> Locality {
        Locality {
            city: Arc::clone(&self.city),
            state: Arc::clone(&self.state),
        }
    }

    /// Render the record back into the raw feed representation
    pub fn to_raw(&self) -> RawRecord {
        let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());

        RawRecord {
            name: Some(self.name.clone()),
            platform: non_empty(&*self.platform),
            sub_platform: non_empty(&*self.sub_platform),
            latitude: Some(self.latitude.to_string()),
            longitude: Some(self.longitude.to_string()),
            active: non_empty(self.active.as_str()),
            extra: self.extra.clone(),
        }
    }
}

/// City/state pair that bounds name clustering
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locality {
    pub city: Arc<str>,
    pub state: Arc<str>,
}

/// Administrative labels returned by a reverse lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country_code: Option<String>,
}

/// Interns low-cardinality text so repeated values share one allocation
#[derive(Debug, Default)]
pub struct CategoryPool {
    values: HashSet<Arc<str>>,
}

impl CategoryPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, value: &str) -> Arc<str> {
        if let Some(existing) = self.values.get(value) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(value);
        self.values.insert(Arc::clone(&shared));
        shared
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}
