// Unit tests for Restaurant Dedup

use geo::{GeodesicDestination, Point};
use restaurant_dedup::core::{
    agglomerative::{cluster_labels, Linkage},
    clustering::NameClusterer,
    distance::{geodesic_distance, haversine_distance, DistanceMetric},
    merger::find_geo_duplicates,
    normalizer::{normalize, normalize_name},
};
use restaurant_dedup::models::{ActiveStatus, RawRecord, RestaurantRecord};
use restaurant_dedup::services::CharNgramEmbedder;
use std::collections::BTreeMap;
use std::sync::Arc;

fn create_record(row_id: usize, lat: f64, lon: f64) -> RestaurantRecord {
    RestaurantRecord {
        row_id,
        name: "joes pizza".to_string(),
        platform: Arc::from("doordash"),
        sub_platform: Arc::from("web"),
        latitude: lat,
        longitude: lon,
        active: ActiveStatus::Active,
        city: Arc::from("New York County"),
        state: Arc::from("New York"),
        country: Arc::from("US"),
        postal_code: Arc::from("NY"),
        group_id: Some(0),
        extra: BTreeMap::new(),
    }
}

#[test]
fn test_geodesic_distance_zero() {
    let distance = geodesic_distance(40.7128, -74.0060, 40.7128, -74.0060);
    assert!(distance < 1e-9);
}

#[test]
fn test_haversine_distance_manhattan_to_brooklyn() {
    // Manhattan to Brooklyn is approximately 5-10 km
    let manhattan_lat = 40.7580;
    let manhattan_lon = -73.9855;
    let brooklyn_lat = 40.6782;
    let brooklyn_lon = -73.9442;

    let distance = haversine_distance(manhattan_lat, manhattan_lon, brooklyn_lat, brooklyn_lon);
    assert!(distance > 5.0 && distance < 15.0);
}

#[test]
fn test_threshold_boundary_200m() {
    let origin = Point::new(-74.0, 40.0);
    let at_200 = origin.geodesic_destination(30.0, 200.0);
    let at_201 = origin.geodesic_destination(30.0, 201.0);

    let a = create_record(0, 40.0, -74.0);
    let b = create_record(1, at_200.y(), at_200.x());
    let c = create_record(2, at_201.y(), at_201.x());

    // B is exactly 200m from A and is dropped
    let dropped = find_geo_duplicates(&[a.clone(), b], 0.2, DistanceMetric::Geodesic);
    assert_eq!(dropped, vec![1]);

    // C is 201m from A and is kept
    let dropped = find_geo_duplicates(&[a, c], 0.2, DistanceMetric::Geodesic);
    assert!(dropped.is_empty());
}

#[test]
fn test_merger_always_keeps_one() {
    for size in 1..25 {
        let cluster: Vec<RestaurantRecord> = (0..size)
            .map(|i| create_record(i, 40.0 + (i % 4) as f64 * 0.0005, -74.0))
            .collect();

        let dropped = find_geo_duplicates(&cluster, 0.2, DistanceMetric::Geodesic);

        assert!(dropped.len() <= size - 1, "size {} dropped {}", size, dropped.len());
        assert!(!dropped.contains(&0));
    }
}

#[test]
fn test_merger_keeps_far_apart_points() {
    let cluster: Vec<RestaurantRecord> = (0..5)
        .map(|i| create_record(i, 40.0 + i as f64 * 0.01, -74.0))
        .collect();

    assert!(find_geo_duplicates(&cluster, 0.2, DistanceMetric::Haversine).is_empty());
}

#[test]
fn test_clustering_empty_group() {
    let embedder = CharNgramEmbedder::hashed(50, 1, 3).unwrap();
    let clusterer = NameClusterer::new(Arc::new(embedder), 0.3, Linkage::Ward);

    let labels = clusterer.cluster(&[]).unwrap();
    assert!(labels.is_empty());
}

#[test]
fn test_cluster_labels_are_dense_and_ordered() {
    let points = vec![vec![3.0, 0.0], vec![0.0, 0.0], vec![3.0, 0.01], vec![9.0, 9.0]];

    let labels = cluster_labels(&points, 0.3, Linkage::Ward);

    assert_eq!(labels, vec![0, 1, 0, 2]);
}

#[test]
fn test_looser_threshold_gives_fewer_clusters() {
    let points: Vec<Vec<f32>> = (0..12).map(|i| vec![i as f32 * 0.25]).collect();

    let count = |threshold: f64| {
        cluster_labels(&points, threshold, Linkage::Ward)
            .into_iter()
            .max()
            .map_or(0, |max| max + 1)
    };

    assert!(count(0.1) >= count(0.5));
    assert!(count(0.5) >= count(2.0));
    assert_eq!(count(0.1), 12);
    assert_eq!(count(100.0), 1);
}

#[test]
fn test_normalize_name_strips_punctuation() {
    assert_eq!(normalize_name("Joe's Pizza & Grill!"), "joes pizza  grill");
    assert_eq!(normalize_name("  TACO-TOWN  "), "tacotown");
}

#[test]
fn test_range_invariant_holds() {
    let rows: Vec<RawRecord> = ["-90", "-89.9", "0", "45.5", "90", "90.0001", "-120", "1e3", "", "x"]
        .iter()
        .enumerate()
        .map(|(i, lat)| RawRecord {
            name: Some(format!("Place {}", i)),
            platform: Some("doordash".to_string()),
            latitude: Some(lat.to_string()),
            longitude: Some("-74.0".to_string()),
            active: Some("TRUE".to_string()),
            ..RawRecord::default()
        })
        .collect();

    let (records, stats) = normalize(rows);

    assert_eq!(records.len(), 5);
    assert_eq!(stats.out_of_range, 3);
    for record in &records {
        assert!(record.latitude >= -90.0 && record.latitude <= 90.0);
        assert!(record.longitude.is_finite());
    }
}
