//! End-to-end network generation for one date.

use std::path::PathBuf;

use chrono::Local;
use tracing::info;

use crate::config::DataLayout;
use crate::edges::{Edge, EdgeTableBuilder};
use crate::error::NetworkResult;
use crate::index::CoordinateIndex;
use crate::locator::{DatePartition, locate_in_dir, locate_latest_per_route};
use crate::nodes::{IdPolicy, NodeTable};
use crate::output::{NetworkFileWriter, file_timestamp};
use crate::records::{PathDetailDataset, StopsDataset};

/// Node and edge tables for one date, built entirely in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub nodes: NodeTable,
    pub edges: Vec<Edge>,
}

/// Paths of the two files a run wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkFiles {
    pub nodes: PathBuf,
    pub edges: PathBuf,
}

/// Builds the network for `partition` from the datasets landed under `layout`.
///
/// Every input is located before any table is built; a missing stops file or
/// no path-detail landing for the date aborts the run. Each route contributes
/// only its latest landing of the day.
#[tracing::instrument(skip(layout, policy), fields(date = %partition.token()))]
pub fn build_network(
    layout: &DataLayout,
    partition: &DatePartition,
    policy: &IdPolicy,
) -> NetworkResult<Network> {
    let stops_path = locate_in_dir(&partition.month_dir(&layout.stops_root()), partition)?;

    let details_dir = partition.day_dir(&layout.path_details_root());
    let detail_files = locate_latest_per_route(&details_dir, partition)?;

    info!(
        stops = %stops_path.display(),
        path_details = detail_files.len(),
        "Datasets located"
    );

    let stops = StopsDataset::from_path(&stops_path)?;
    let nodes = NodeTable::build(&stops, policy)?;
    let index = CoordinateIndex::from_table(&nodes);

    let mut builder = EdgeTableBuilder::new(&index);
    for path in &detail_files {
        let dataset = PathDetailDataset::from_path(path)?;
        builder.add_dataset(&dataset)?;
    }
    let edges = builder.finish();

    Ok(Network { nodes, edges })
}

/// Builds the network for `date` (`MM-DD-YYYY`) and writes both tables.
pub fn generate_network_files(
    layout: &DataLayout,
    date: &str,
    policy: &IdPolicy,
) -> NetworkResult<NetworkFiles> {
    let partition = DatePartition::parse(date)?;
    let network = build_network(layout, &partition, policy)?;

    let writer = NetworkFileWriter::new(&layout.output_dir);
    let timestamp = file_timestamp(&Local::now());
    let (nodes, edges) = writer.write_network(&network.nodes, &network.edges, &timestamp)?;

    info!(
        nodes = %nodes.display(),
        edges = %edges.display(),
        "Network files generated"
    );
    Ok(NetworkFiles { nodes, edges })
}
