use crate::error::MapError;
use crate::types::HealthRecord;
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const REQUIRED_COLUMNS: [&str; 4] = ["latitude", "longitude", "region", "health_metric"];
pub const INFO_COLUMN: &str = "additional_info";

pub fn load_table(path: &Path) -> Result<Vec<HealthRecord>, MapError> {
    let file = File::open(path)?;
    read_table(file)
}

/// Parse CSV rows into typed records. Column presence is checked before any
/// row is read; field values are validated here so malformed data is reported
/// with its row and column instead of failing later in rendering.
pub fn read_table<R: Read>(reader: R) -> Result<Vec<HealthRecord>, MapError> {
    let mut rdr = ReaderBuilder::new().from_reader(reader);
    let headers = rdr.headers()?.clone();

    // Map column names to indices for lookup by name
    let col_indices: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_string(), i))
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !col_indices.contains_key(**col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(MapError::MissingColumns { missing });
    }

    let lat_idx = col_indices["latitude"];
    let lon_idx = col_indices["longitude"];
    let region_idx = col_indices["region"];
    let metric_idx = col_indices["health_metric"];
    let info_idx = col_indices.get(INFO_COLUMN).copied();

    let mut records = Vec::new();

    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let row = i + 1; // 1-based data rows, header excluded

        let latitude = parse_float(&record, lat_idx, "latitude", row)?;
        let longitude = parse_float(&record, lon_idx, "longitude", row)?;
        let health_metric = parse_float(&record, metric_idx, "health_metric", row)?;
        let region = record.get(region_idx).unwrap_or("").to_string();
        let additional_info = info_idx
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        records.push(HealthRecord {
            latitude,
            longitude,
            region,
            health_metric,
            additional_info,
        });
    }

    Ok(records)
}

fn parse_float(
    record: &StringRecord,
    idx: usize,
    column: &str,
    row: usize,
) -> Result<f64, MapError> {
    let raw = record.get(idx).unwrap_or("");
    raw.trim().parse().map_err(|_| MapError::InvalidField {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}
