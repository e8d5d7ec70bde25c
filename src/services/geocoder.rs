use crate::models::Location;
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors that can occur with reverse geocoding
#[derive(Debug, Error)]
pub enum GeocoderError {
    #[error("Failed to read gazetteer: {0}")]
    Csv(#[from] csv::Error),

    #[error("Gazetteer contains no places")]
    EmptyGazetteer,

    #[error("Geocoder returned {actual} locations for {expected} coordinates")]
    BatchMismatch { expected: usize, actual: usize },
}

/// Maps coordinates to administrative labels
///
/// Implementations are loaded once and shared read-only across the run.
pub trait ReverseGeocoder: Send + Sync {
    /// Resolve a batch of `(latitude, longitude)` pairs, one location per input in order
    fn lookup_batch(&self, coordinates: &[(f64, f64)]) -> Result<Vec<Location>, GeocoderError>;
}

/// A labeled point of the gazetteer
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    pub name: String,
    /// State-level label
    pub admin1: String,
    /// County-level label, used as the city label
    pub admin2: String,
    #[serde(rename = "cc")]
    pub country_code: String,
}

type IndexedPoint = GeomWithData<[f64; 3], usize>;

/// Nearest-known-place reverse geocoder over a GeoNames-style gazetteer
pub struct Gazetteer {
    places: Vec<Place>,
    tree: RTree<IndexedPoint>,
}

/// Project onto the unit sphere so Euclidean nearest equals great-circle nearest
fn to_unit_sphere(latitude: f64, longitude: f64) -> [f64; 3] {
    let lat = latitude.to_radians();
    let lon = longitude.to_radians();
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn label(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl Gazetteer {
    pub fn from_places(places: Vec<Place>) -> Result<Self, GeocoderError> {
        if places.is_empty() {
            return Err(GeocoderError::EmptyGazetteer);
        }

        let points = places
            .iter()
            .enumerate()
            .map(|(index, place)| {
                GeomWithData::new(to_unit_sphere(place.latitude, place.longitude), index)
            })
            .collect();

        Ok(Self {
            places,
            tree: RTree::bulk_load(points),
        })
    }

    /// Load a CSV with `lat,lon,name,admin1,admin2,cc` columns
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, GeocoderError> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        let places = reader
            .deserialize::<Place>()
            .collect::<Result<Vec<_>, _>>()?;

        info!(path = %path.display(), places = places.len(), "gazetteer loaded");
        Self::from_places(places)
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Closest known place to a coordinate
    pub fn nearest(&self, latitude: f64, longitude: f64) -> Option<&Place> {
        self.tree
            .nearest_neighbor(&to_unit_sphere(latitude, longitude))
            .map(|point| &self.places[point.data])
    }
}

impl ReverseGeocoder for Gazetteer {
    fn lookup_batch(&self, coordinates: &[(f64, f64)]) -> Result<Vec<Location>, GeocoderError> {
        Ok(coordinates
            .par_iter()
            .map(|&(lat, lon)| match self.nearest(lat, lon) {
                Some(place) => Location {
                    city: label(&place.admin2),
                    state: label(&place.admin1),
                    country_code: label(&place.country_code),
                },
                None => Location::default(),
            })
            .collect())
    }
}
