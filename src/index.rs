//! Exact-coordinate lookup of node ids.
//!
//! Matching is exact floating-point equality on both coordinates, the same
//! values the landed CSVs carry. No tolerance is applied.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::nodes::NodeTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CoordKey(u64, u64);

impl CoordKey {
    /// `None` for NaN, which never equals anything.
    fn new(lat: f64, lon: f64) -> Option<Self> {
        if lat.is_nan() || lon.is_nan() {
            return None;
        }
        Some(CoordKey(canonical_bits(lat), canonical_bits(lon)))
    }
}

// -0.0 == 0.0 but their bit patterns differ.
fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

#[derive(Debug, Clone, Default)]
pub struct CoordinateIndex {
    ids: HashMap<CoordKey, i64>,
}

impl CoordinateIndex {
    /// Indexes every node; where several share a coordinate the first in
    /// table order wins.
    pub fn from_table(table: &NodeTable) -> Self {
        let mut ids = HashMap::with_capacity(table.len());
        for node in &table.nodes {
            let Some(key) = CoordKey::new(node.lat, node.lon) else {
                continue;
            };
            if let Entry::Vacant(slot) = ids.entry(key) {
                slot.insert(node.id);
            }
        }
        CoordinateIndex { ids }
    }

    pub fn lookup(&self, lat: f64, lon: f64) -> Option<i64> {
        CoordKey::new(lat, lon).and_then(|key| self.ids.get(&key).copied())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::IdPolicy;
    use crate::records::StopsDataset;

    fn index(csv: &str) -> CoordinateIndex {
        let ds = StopsDataset::from_reader("stops.csv", csv.as_bytes()).unwrap();
        let table = NodeTable::build(&ds, &IdPolicy::default()).unwrap();
        CoordinateIndex::from_table(&table)
    }

    #[test]
    fn test_lookup_exact_match() {
        let idx = index("StopID,Lat,Lon\n0,1.0,2.0\n500,3.0,4.0\n0,5.0,6.0\n");

        assert_eq!(idx.lookup(1.0, 2.0), Some(10));
        assert_eq!(idx.lookup(3.0, 4.0), Some(500));
        assert_eq!(idx.lookup(5.0, 6.0), Some(20));
        assert_eq!(idx.len(), 3);
    }

    #[test]
    fn test_lookup_miss() {
        let idx = index("StopID,Lat,Lon\n0,1.0,2.0\n");

        assert_eq!(idx.lookup(2.0, 1.0), None);
        assert_eq!(idx.lookup(1.0, 2.0000001), None);
    }

    #[test]
    fn test_duplicate_coordinates_first_wins() {
        let idx = index("StopID,Lat,Lon\n700,38.9,-77.0\n0,38.9,-77.0\n800,38.9,-77.0\n");

        assert_eq!(idx.lookup(38.9, -77.0), Some(700));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_negative_zero_matches_zero() {
        let idx = index("StopID,Lat,Lon\n42,0.0,-0.0\n");
        assert_eq!(idx.lookup(-0.0, 0.0), Some(42));
    }

    #[test]
    fn test_nan_never_matches() {
        let idx = index("StopID,Lat,Lon\n42,NaN,1.0\n");
        assert!(idx.is_empty());
        assert_eq!(idx.lookup(f64::NAN, 1.0), None);
    }
}
