//! Error taxonomy for network-graph construction.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("invalid date {date:?}: expected MM-DD-YYYY")]
    InvalidDate { date: String },

    #[error("no dataset for date {date:?} in {dir}")]
    MissingDataset { date: String, dir: String },

    #[error("{dataset}: missing required column {column:?}")]
    MissingColumn { dataset: String, column: String },

    #[error("{dataset}: malformed row {row}: {reason}")]
    MalformedRow {
        dataset: String,
        row: u64,
        reason: String,
    },

    #[error("{dataset}: row {row} has sentinel stop at ({lat}, {lon}) with no matching node")]
    UnresolvedCoordinate {
        dataset: String,
        row: u64,
        lat: f64,
        lon: f64,
    },

    #[error("synthetic node id {id} collides with an existing stop id")]
    IdCollision { id: i64 },

    #[error("node id stride must be positive, got {stride}")]
    InvalidStride { stride: i64 },

    #[error("synthetic node id for sentinel #{counter} overflows with stride {stride}")]
    IdOverflow { counter: i64, stride: i64 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {dataset}: {source}")]
    Csv {
        dataset: String,
        #[source]
        source: csv::Error,
    },
}

impl NetworkError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        NetworkError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub(crate) fn csv(dataset: &str, source: csv::Error) -> Self {
        NetworkError::Csv {
            dataset: dataset.to_string(),
            source,
        }
    }
}

pub type NetworkResult<T> = Result<T, NetworkError>;
