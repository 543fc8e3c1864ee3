//! Input records landed from the transit API and their CSV readers.
//!
//! Row numbers reported in errors count data rows from 1, header excluded.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NetworkError, NetworkResult};

/// Stop identifier marking an unlabeled waypoint, identified by coordinate only.
pub const SENTINEL_STOP_ID: i64 = 0;

pub const STOP_ID: &str = "StopID";
pub const LAT: &str = "Lat";
pub const LON: &str = "Lon";

/// Columns a path-detail dataset must carry to produce edges.
pub const PATH_DETAIL_COLUMNS: &[&str] = &[
    "DirectionText",
    STOP_ID,
    LAT,
    LON,
    "RouteID",
    "TripHeadsign",
    "StopNum",
];

/// One row of a stops dataset.
///
/// The parsed graph fields sit next to the untouched source row so the node
/// table can be written back with every original column.
#[derive(Debug, Clone, PartialEq)]
pub struct StopRecord {
    pub stop_id: i64,
    pub lat: f64,
    pub lon: f64,
    pub fields: StringRecord,
}

impl StopRecord {
    pub fn is_sentinel(&self) -> bool {
        self.stop_id == SENTINEL_STOP_ID
    }
}

/// A parsed stops dataset: the original header row plus its records in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct StopsDataset {
    pub name: String,
    pub headers: StringRecord,
    pub records: Vec<StopRecord>,
}

impl StopsDataset {
    pub fn from_path(path: &Path) -> NetworkResult<Self> {
        let file = File::open(path).map_err(|e| NetworkError::io(path, e))?;
        Self::from_reader(&path.display().to_string(), file)
    }

    pub fn from_reader<R: Read>(name: &str, reader: R) -> NetworkResult<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| NetworkError::csv(name, e))?
            .clone();

        let stop_idx = column_index(name, &headers, STOP_ID)?;
        let lat_idx = column_index(name, &headers, LAT)?;
        let lon_idx = column_index(name, &headers, LON)?;

        let mut records = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let row = i as u64 + 1;
            let fields = result.map_err(|e| NetworkError::csv(name, e))?;

            records.push(StopRecord {
                stop_id: parse_field(name, row, &fields, stop_idx, STOP_ID)?,
                lat: parse_field(name, row, &fields, lat_idx, LAT)?,
                lon: parse_field(name, row, &fields, lon_idx, LON)?,
                fields,
            });
        }

        debug!(dataset = name, rows = records.len(), "Stops dataset loaded");

        Ok(StopsDataset {
            name: name.to_string(),
            headers,
            records,
        })
    }
}

/// One stop visited by a route+direction, in traversal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDetailRecord {
    #[serde(rename = "RouteName", default)]
    pub route_name: Option<String>,
    #[serde(rename = "RouteID")]
    pub route_id: String,
    #[serde(rename = "DirectionNum", default)]
    pub direction_num: Option<String>,
    #[serde(rename = "DirectionText")]
    pub direction_text: String,
    #[serde(rename = "TripHeadsign")]
    pub trip_headsign: String,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Routes", default)]
    pub routes: Option<String>,
    #[serde(rename = "StopID")]
    pub stop_id: i64,
    #[serde(rename = "StopNum")]
    pub stop_num: u32,
}

impl PathDetailRecord {
    pub fn is_sentinel(&self) -> bool {
        self.stop_id == SENTINEL_STOP_ID
    }
}

/// A single route's path-detail rows, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct PathDetailDataset {
    pub name: String,
    pub records: Vec<PathDetailRecord>,
}

impl PathDetailDataset {
    pub fn from_path(path: &Path) -> NetworkResult<Self> {
        let file = File::open(path).map_err(|e| NetworkError::io(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_reader(&name, file)
    }

    pub fn from_reader<R: Read>(name: &str, reader: R) -> NetworkResult<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| NetworkError::csv(name, e))?
            .clone();

        for column in PATH_DETAIL_COLUMNS {
            column_index(name, &headers, column)?;
        }

        let mut records = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let row = i as u64 + 1;
            let raw = result.map_err(|e| NetworkError::csv(name, e))?;
            let record: PathDetailRecord =
                raw.deserialize(Some(&headers))
                    .map_err(|e| NetworkError::MalformedRow {
                        dataset: name.to_string(),
                        row,
                        reason: e.to_string(),
                    })?;
            records.push(record);
        }

        debug!(dataset = name, rows = records.len(), "Path-detail dataset loaded");

        Ok(PathDetailDataset {
            name: name.to_string(),
            records,
        })
    }
}

fn column_index(dataset: &str, headers: &StringRecord, column: &str) -> NetworkResult<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| NetworkError::MissingColumn {
            dataset: dataset.to_string(),
            column: column.to_string(),
        })
}

fn parse_field<T>(
    dataset: &str,
    row: u64,
    fields: &StringRecord,
    idx: usize,
    column: &str,
) -> NetworkResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = fields.get(idx).ok_or_else(|| NetworkError::MalformedRow {
        dataset: dataset.to_string(),
        row,
        reason: format!("no value for {column}"),
    })?;

    raw.trim().parse().map_err(|e: T::Err| NetworkError::MalformedRow {
        dataset: dataset.to_string(),
        row,
        reason: format!("{column} = {raw:?}: {e}"),
    })
}
