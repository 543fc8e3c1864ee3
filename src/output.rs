//! Persistence of node and edge tables as timestamped CSV files.
//!
//! Files land in `<output_dir>/network_data` as
//! `stops_nodes_<MM-DD-YYYY_HH-MM-SS>.csv` and
//! `stops_edges_<MM-DD-YYYY_HH-MM-SS>.csv`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use csv::{StringRecord, WriterBuilder};
use tracing::{info, warn};

use crate::edges::{EDGE_HEADERS, Edge};
use crate::error::{NetworkError, NetworkResult};
use crate::nodes::NodeTable;

pub const NETWORK_DATA_DIR: &str = "network_data";
pub const FILE_TIMESTAMP_FORMAT: &str = "%m-%d-%Y_%H-%M-%S";

/// Formats `now` the way landed and written files embed timestamps.
pub fn file_timestamp(now: &DateTime<Local>) -> String {
    now.format(FILE_TIMESTAMP_FORMAT).to_string()
}

pub struct NetworkFileWriter {
    dir: PathBuf,
}

impl NetworkFileWriter {
    pub fn new(output_dir: &Path) -> Self {
        NetworkFileWriter {
            dir: output_dir.join(NETWORK_DATA_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes both tables under one timestamp.
    ///
    /// Both tables are first written to hidden temporary files and only then
    /// renamed into place. Any failure removes whatever this call created, so
    /// a run leaves either both final files or neither.
    pub fn write_network(
        &self,
        nodes: &NodeTable,
        edges: &[Edge],
        timestamp: &str,
    ) -> NetworkResult<(PathBuf, PathBuf)> {
        fs::create_dir_all(&self.dir).map_err(|e| NetworkError::io(&self.dir, e))?;

        let nodes_path = self.dir.join(format!("stops_nodes_{timestamp}.csv"));
        let edges_path = self.dir.join(format!("stops_edges_{timestamp}.csv"));
        let nodes_tmp = temp_path(&nodes_path);
        let edges_tmp = temp_path(&edges_path);

        let written = write_nodes(&nodes_tmp, nodes).and_then(|()| write_edges(&edges_tmp, edges));
        if let Err(e) = written {
            discard(&nodes_tmp);
            discard(&edges_tmp);
            return Err(e);
        }

        if let Err(e) = fs::rename(&nodes_tmp, &nodes_path) {
            discard(&nodes_tmp);
            discard(&edges_tmp);
            return Err(NetworkError::io(&nodes_path, e));
        }
        if let Err(e) = fs::rename(&edges_tmp, &edges_path) {
            discard(&nodes_path);
            discard(&edges_tmp);
            return Err(NetworkError::io(&edges_path, e));
        }

        info!(path = %nodes_path.display(), rows = nodes.len(), "Node table saved");
        info!(path = %edges_path.display(), rows = edges.len(), "Edge table saved");
        Ok((nodes_path, edges_path))
    }
}

/// `<dir>/.<name>.tmp`, next to the final file so the rename stays on one filesystem.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial file"),
    }
}

fn write_nodes(path: &Path, table: &NodeTable) -> NetworkResult<()> {
    let name = path.display().to_string();
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| NetworkError::csv(&name, e))?;

    let mut header = StringRecord::from(vec!["Id"]);
    header.extend(table.headers.iter());
    writer
        .write_record(&header)
        .map_err(|e| NetworkError::csv(&name, e))?;

    for node in &table.nodes {
        let mut record = StringRecord::from(vec![node.id.to_string()]);
        record.extend(node.fields.iter());
        writer
            .write_record(&record)
            .map_err(|e| NetworkError::csv(&name, e))?;
    }
    writer.flush().map_err(|e| NetworkError::io(path, e))
}

fn write_edges(path: &Path, edges: &[Edge]) -> NetworkResult<()> {
    let name = path.display().to_string();
    let mut writer = WriterBuilder::new()
        .has_headers(false) // written explicitly so an empty table still has them
        .from_path(path)
        .map_err(|e| NetworkError::csv(&name, e))?;

    writer
        .write_record(EDGE_HEADERS)
        .map_err(|e| NetworkError::csv(&name, e))?;
    for edge in edges {
        writer
            .serialize(edge)
            .map_err(|e| NetworkError::csv(&name, e))?;
    }
    writer.flush().map_err(|e| NetworkError::io(path, e))
}
