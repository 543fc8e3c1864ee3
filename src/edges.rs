//! Directed edge extraction from path-detail datasets.
//!
//! Each pair of adjacent rows sharing a direction label becomes one edge from
//! the earlier row to the later one. A change of direction label starts a new
//! path and no edge crosses it. Edges never span two datasets.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{NetworkError, NetworkResult};
use crate::index::CoordinateIndex;
use crate::records::{PathDetailDataset, PathDetailRecord};

pub const EDGE_TYPE: &str = "directed";
pub const EDGE_WEIGHT: u32 = 1;

/// Column order of the written edge table.
pub const EDGE_HEADERS: [&str; 8] = [
    "Source",
    "Target",
    "Type",
    "Weight",
    "RouteId",
    "DirectionText",
    "TripHeadSign",
    "PathSeq",
];

/// One hop between consecutive stops; provenance fields come from the source row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    #[serde(rename = "Source")]
    pub source: i64,
    #[serde(rename = "Target")]
    pub target: i64,
    #[serde(rename = "Type")]
    pub kind: &'static str,
    #[serde(rename = "Weight")]
    pub weight: u32,
    #[serde(rename = "RouteId")]
    pub route_id: String,
    #[serde(rename = "DirectionText")]
    pub direction_text: String,
    #[serde(rename = "TripHeadSign")]
    pub trip_headsign: String,
    #[serde(rename = "PathSeq")]
    pub path_seq: u32,
}

/// Accumulates edges across datasets, in dataset then row order.
pub struct EdgeTableBuilder<'a> {
    index: &'a CoordinateIndex,
    edges: Vec<Edge>,
    datasets: usize,
}

impl<'a> EdgeTableBuilder<'a> {
    pub fn new(index: &'a CoordinateIndex) -> Self {
        EdgeTableBuilder {
            index,
            edges: Vec::new(),
            datasets: 0,
        }
    }

    /// Extracts the edges of one dataset and appends them.
    ///
    /// On error nothing from this dataset is appended.
    #[tracing::instrument(skip_all, fields(dataset = %dataset.name, rows = dataset.records.len()))]
    pub fn add_dataset(&mut self, dataset: &PathDetailDataset) -> NetworkResult<usize> {
        let edges = extract_edges(&dataset.name, &dataset.records, self.index)?;
        let count = edges.len();
        debug!(edges = count, "Dataset processed");

        self.edges.extend(edges);
        self.datasets += 1;
        Ok(count)
    }

    pub fn finish(self) -> Vec<Edge> {
        info!(
            datasets = self.datasets,
            edges = self.edges.len(),
            "Edge table built"
        );
        self.edges
    }
}

/// Edges for a single dataset's rows.
pub fn extract_edges(
    dataset: &str,
    rows: &[PathDetailRecord],
    index: &CoordinateIndex,
) -> NetworkResult<Vec<Edge>> {
    let mut edges = Vec::new();

    for (i, pair) in rows.windows(2).enumerate() {
        let (prev, cur) = (&pair[0], &pair[1]);
        if prev.direction_text != cur.direction_text {
            continue;
        }

        let source = resolve(dataset, i, prev, index)?;
        let target = resolve(dataset, i + 1, cur, index)?;

        edges.push(Edge {
            source,
            target,
            kind: EDGE_TYPE,
            weight: EDGE_WEIGHT,
            route_id: prev.route_id.clone(),
            direction_text: prev.direction_text.clone(),
            trip_headsign: prev.trip_headsign.clone(),
            path_seq: prev.stop_num,
        });
    }

    Ok(edges)
}

fn resolve(
    dataset: &str,
    position: usize,
    row: &PathDetailRecord,
    index: &CoordinateIndex,
) -> NetworkResult<i64> {
    if !row.is_sentinel() {
        return Ok(row.stop_id);
    }
    index
        .lookup(row.lat, row.lon)
        .ok_or_else(|| NetworkError::UnresolvedCoordinate {
            dataset: dataset.to_string(),
            row: position as u64 + 1,
            lat: row.lat,
            lon: row.lon,
        })
}
