//! Node table construction from a stops dataset.

use std::collections::HashSet;

use csv::StringRecord;
use tracing::{info, warn};

use crate::error::{NetworkError, NetworkResult};
use crate::records::StopsDataset;

/// How synthetic node ids are handed out to sentinel stops.
///
/// The n-th sentinel stop (counting from 1, in input order) receives
/// `n * stride`. Nothing prevents a real stop id from equalling one of those
/// values; with `strict` set such a collision is an error, otherwise it is
/// logged and kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdPolicy {
    pub stride: i64,
    pub strict: bool,
}

impl Default for IdPolicy {
    fn default() -> Self {
        IdPolicy {
            stride: 10,
            strict: false,
        }
    }
}

/// A uniquely identified physical location.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i64,
    pub stop_id: i64,
    pub lat: f64,
    pub lon: f64,
    /// The stop row as landed, every original column.
    pub fields: StringRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeTable {
    /// Header of the source stops dataset; `Id` is prepended on output.
    pub headers: StringRecord,
    pub nodes: Vec<Node>,
}

impl NodeTable {
    #[tracing::instrument(skip_all, fields(dataset = %stops.name, stride = policy.stride, strict = policy.strict))]
    pub fn build(stops: &StopsDataset, policy: &IdPolicy) -> NetworkResult<Self> {
        if policy.stride <= 0 {
            return Err(NetworkError::InvalidStride {
                stride: policy.stride,
            });
        }

        let mut nodes: Vec<Node> = stops
            .records
            .iter()
            .map(|r| Node {
                id: r.stop_id,
                stop_id: r.stop_id,
                lat: r.lat,
                lon: r.lon,
                fields: r.fields.clone(),
            })
            .collect();

        let real_ids: HashSet<i64> = stops
            .records
            .iter()
            .filter(|r| !r.is_sentinel())
            .map(|r| r.stop_id)
            .collect();

        let mut counter = 0i64;
        let mut collisions = 0usize;
        for (node, record) in nodes.iter_mut().zip(&stops.records) {
            if !record.is_sentinel() {
                continue;
            }
            counter += 1;
            node.id = counter
                .checked_mul(policy.stride)
                .ok_or(NetworkError::IdOverflow {
                    counter,
                    stride: policy.stride,
                })?;

            if real_ids.contains(&node.id) {
                if policy.strict {
                    return Err(NetworkError::IdCollision { id: node.id });
                }
                collisions += 1;
                warn!(id = node.id, "Synthetic node id collides with a real stop id");
            }
        }

        info!(
            nodes = nodes.len(),
            synthetic = counter,
            collisions,
            "Node table built"
        );

        Ok(NodeTable {
            headers: stops.headers.clone(),
            nodes,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.nodes.iter().map(|n| n.id)
    }
}
