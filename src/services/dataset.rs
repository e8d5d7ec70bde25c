use crate::models::{RawRecord, RestaurantRecord};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

/// Columns every input table must carry
pub const REQUIRED_COLUMNS: [&str; 6] = ["name", "platform", "sub_platform", "latitude", "longitude", "active"];

/// Leading columns of every output table
pub const OUTPUT_COLUMNS: [&str; 10] = [
    "name",
    "platform",
    "sub_platform",
    "latitude",
    "longitude",
    "active",
    "city",
    "state",
    "country",
    "postal_code",
];

/// Errors that can occur while reading or writing listing tables
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

/// Read a listing table from a CSV file
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<RawRecord>, DatasetError> {
    read_records_from(File::open(path)?)
}

/// Read a listing table from any CSV source
///
/// Empty cells are missing values. Columns outside the core schema land in `extra`.
pub fn read_records_from<R: Read>(reader: R) -> Result<Vec<RawRecord>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader.headers()?.clone();

    let position = |column: &str| headers.iter().position(|header| header.trim() == column);
    let mut required = [0usize; 6];
    for (slot, column) in required.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = position(column).ok_or_else(|| DatasetError::MissingColumn(column.to_string()))?;
    }
    let [name, platform, sub_platform, latitude, longitude, active] = required;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cell = |index: usize| {
            row.get(index)
                .filter(|value| !value.trim().is_empty())
                .map(str::to_string)
        };

        let extra = headers
            .iter()
            .enumerate()
            .filter(|(index, _)| !required.contains(index))
            .filter_map(|(index, header)| {
                cell(index).map(|value| (header.trim().to_string(), value))
            })
            .collect();

        records.push(RawRecord {
            name: cell(name),
            platform: cell(platform),
            sub_platform: cell(sub_platform),
            latitude: cell(latitude),
            longitude: cell(longitude),
            active: cell(active),
            extra,
        });
    }

    Ok(records)
}

/// Write cleaned records to a CSV file
pub fn write_records<P: AsRef<Path>>(path: P, records: &[RestaurantRecord]) -> Result<(), DatasetError> {
    write_records_to(File::create(path)?, records)
}

/// Write cleaned records as CSV
///
/// Core and enrichment columns first, then every extra column in name order.
/// The clustering label is internal and never written.
pub fn write_records_to<W: Write>(writer: W, records: &[RestaurantRecord]) -> Result<(), DatasetError> {
    let extra_columns: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.extra.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(OUTPUT_COLUMNS.iter().copied().chain(extra_columns.iter().copied()))?;

    for record in records {
        let mut row: Vec<String> = vec![
            record.name.clone(),
            record.platform.to_string(),
            record.sub_platform.to_string(),
            record.latitude.to_string(),
            record.longitude.to_string(),
            record.active.as_str().to_string(),
            record.city.to_string(),
            record.state.to_string(),
            record.country.to_string(),
            record.postal_code.to_string(),
        ];
        row.extend(extra_columns.iter().map(|column| lookup(&record.extra, column)));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

fn lookup(extra: &BTreeMap<String, String>, column: &str) -> String {
    extra.get(column).cloned().unwrap_or_default()
}
