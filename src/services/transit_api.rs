//! Trait and response types for the transit API the datasets are landed from.
//!
//! Only the endpoints feeding network construction are modelled: key
//! validation, the stop list, the route list, and per-route path details.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::records::PathDetailRecord;

/// Abstraction over the transit API provider.
#[async_trait::async_trait]
pub trait TransitApi: Send + Sync {
    /// Whether the configured API key is accepted. Transport failures are
    /// errors; a rejected key is `Ok(false)`.
    async fn validate_key(&self) -> Result<bool>;

    /// Every bus stop.
    async fn stops(&self) -> Result<Vec<ApiStop>>;

    /// Every bus route variant.
    async fn routes(&self) -> Result<Vec<ApiRoute>>;

    /// Ordered stops and shape of a route variant, for `date` or today.
    async fn path_details(&self, route_id: &str, date: Option<NaiveDate>)
    -> Result<PathDetails>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StopsResponse {
    #[serde(rename = "Stops")]
    pub stops: Vec<ApiStop>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoutesResponse {
    #[serde(rename = "Routes")]
    pub routes: Vec<ApiRoute>,
}

/// A route variant, landed as-is as a row of the routes dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRoute {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "RouteID")]
    pub route_id: String,
    #[serde(rename = "LineDescription", default)]
    pub line_description: String,
}

/// A stop as the API reports it. `StopID` is `"0"` for unlabeled waypoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiStop {
    #[serde(rename = "StopID", deserialize_with = "string_or_number")]
    pub stop_id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "Routes", default)]
    pub routes: Vec<String>,
}

impl ApiStop {
    pub fn numeric_id(&self) -> Result<i64> {
        self.stop_id
            .trim()
            .parse()
            .with_context(|| format!("stop {:?} has a non-numeric StopID", self.name))
    }

    pub fn to_row(&self) -> Result<StopRow> {
        Ok(StopRow {
            stop_id: self.numeric_id()?,
            name: self.name.clone(),
            lat: self.lat,
            lon: self.lon,
            routes: self.routes.join(ROUTES_SEPARATOR),
        })
    }
}

/// Separator used when a stop's route list is flattened into one CSV field.
pub const ROUTES_SEPARATOR: &str = ";";

/// A landed row of the stops dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopRow {
    #[serde(rename = "StopID")]
    pub stop_id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "Routes")]
    pub routes: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PathDetails {
    #[serde(rename = "RouteID")]
    pub route_id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Direction0", default)]
    pub direction0: Option<PathDirection>,
    #[serde(rename = "Direction1", default)]
    pub direction1: Option<PathDirection>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PathDirection {
    #[serde(rename = "TripHeadsign", default)]
    pub trip_headsign: String,
    #[serde(rename = "DirectionText", default)]
    pub direction_text: String,
    #[serde(rename = "DirectionNum", deserialize_with = "string_or_number", default)]
    pub direction_num: String,
    #[serde(rename = "Shape", default)]
    pub shape: Vec<ShapePoint>,
    #[serde(rename = "Stops", default)]
    pub stops: Vec<ApiStop>,
}

/// One vertex of a direction's drawn path.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShapePoint {
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "SeqNum")]
    pub seq_num: u32,
}

/// A landed row of the path-details shapes dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeRow {
    #[serde(rename = "RouteName")]
    pub route_name: String,
    #[serde(rename = "RouteID")]
    pub route_id: String,
    #[serde(rename = "DirectionNum")]
    pub direction_num: String,
    #[serde(rename = "DirectionText")]
    pub direction_text: String,
    #[serde(rename = "TripHeadsign")]
    pub trip_headsign: String,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "SeqNum")]
    pub seq_num: u32,
}

impl PathDetails {
    fn directions(&self) -> impl Iterator<Item = &PathDirection> {
        [&self.direction0, &self.direction1].into_iter().flatten()
    }

    /// One record per stop per direction, `StopNum` counting from 1 within
    /// each direction. Absent or stop-less directions contribute nothing.
    pub fn flatten(&self) -> Result<Vec<PathDetailRecord>> {
        let mut rows = Vec::new();
        for direction in self.directions() {
            for (i, stop) in direction.stops.iter().enumerate() {
                let stop_id = stop
                    .numeric_id()
                    .with_context(|| format!("route {}", self.route_id))?;
                rows.push(PathDetailRecord {
                    route_name: Some(self.name.clone()),
                    route_id: self.route_id.clone(),
                    direction_num: Some(direction.direction_num.clone()),
                    direction_text: direction.direction_text.clone(),
                    trip_headsign: direction.trip_headsign.clone(),
                    lat: stop.lat,
                    lon: stop.lon,
                    name: Some(stop.name.clone()),
                    routes: Some(stop.routes.join(ROUTES_SEPARATOR)),
                    stop_id,
                    stop_num: i as u32 + 1,
                });
            }
        }
        Ok(rows)
    }

    /// One row per shape vertex per direction, in the order the API lists them.
    pub fn flatten_shapes(&self) -> Vec<ShapeRow> {
        let mut rows = Vec::new();
        for direction in self.directions() {
            for point in &direction.shape {
                rows.push(ShapeRow {
                    route_name: self.name.clone(),
                    route_id: self.route_id.clone(),
                    direction_num: direction.direction_num.clone(),
                    direction_text: direction.direction_text.clone(),
                    trip_headsign: direction.trip_headsign.clone(),
                    lat: point.lat,
                    lon: point.lon,
                    seq_num: point.seq_num,
                });
            }
        }
        rows
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH_DETAILS_JSON: &str = r#"{
        "RouteID": "10A",
        "Name": "10A - HUNTINGTON STA - PENTAGON",
        "Direction0": {
            "TripHeadsign": "PENTAGON",
            "DirectionText": "NORTH",
            "DirectionNum": "0",
            "Shape": [
                {"Lat": 38.79, "Lon": -77.07, "SeqNum": 1},
                {"Lat": 38.795, "Lon": -77.065, "SeqNum": 2}
            ],
            "Stops": [
                {"StopID": "1001195", "Name": "HUNTINGTON STA", "Lat": 38.79, "Lon": -77.07, "Routes": ["10A", "10B"]},
                {"StopID": "0", "Name": "", "Lat": 38.80, "Lon": -77.06, "Routes": []},
                {"StopID": "1001200", "Name": "PENTAGON", "Lat": 38.86, "Lon": -77.05, "Routes": ["10A"]}
            ]
        },
        "Direction1": {
            "TripHeadsign": "HUNTINGTON STA",
            "DirectionText": "SOUTH",
            "DirectionNum": 1,
            "Shape": [{"Lat": 38.86, "Lon": -77.05, "SeqNum": 1}],
            "Stops": [
                {"StopID": 1001200, "Name": "PENTAGON", "Lat": 38.86, "Lon": -77.05, "Routes": ["10A"]}
            ]
        }
    }"#;

    #[test]
    fn test_flatten_numbers_stops_per_direction() {
        let details: PathDetails = serde_json::from_str(PATH_DETAILS_JSON).unwrap();
        let rows = details.flatten().unwrap();

        assert_eq!(rows.len(), 4);
        let nums: Vec<_> = rows.iter().map(|r| r.stop_num).collect();
        assert_eq!(nums, vec![1, 2, 3, 1]);

        assert_eq!(rows[0].route_id, "10A");
        assert_eq!(rows[0].direction_text, "NORTH");
        assert_eq!(rows[0].trip_headsign, "PENTAGON");
        assert_eq!(rows[0].routes.as_deref(), Some("10A;10B"));
        assert!(rows[1].is_sentinel());
        assert_eq!(rows[3].direction_text, "SOUTH");
        assert_eq!(rows[3].direction_num.as_deref(), Some("1"));
        assert_eq!(rows[3].stop_id, 1001200);
    }

    #[test]
    fn test_flatten_shapes_keeps_direction_context() {
        let details: PathDetails = serde_json::from_str(PATH_DETAILS_JSON).unwrap();
        let rows = details.flatten_shapes();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].route_name, "10A - HUNTINGTON STA - PENTAGON");
        assert_eq!(rows[1].direction_text, "NORTH");
        assert_eq!(rows[1].lat, 38.795);
        assert_eq!(rows[1].seq_num, 2);
        assert_eq!(rows[2].direction_num, "1");
        assert_eq!(rows[2].trip_headsign, "HUNTINGTON STA");
    }

    #[test]
    fn test_missing_shape_is_empty() {
        let json = r#"{
            "RouteID": "99",
            "Direction0": {
                "DirectionText": "EAST",
                "Stops": [{"StopID": "5", "Name": "A", "Lat": 1.0, "Lon": 2.0}]
            }
        }"#;
        let details: PathDetails = serde_json::from_str(json).unwrap();
        assert!(details.flatten_shapes().is_empty());
        assert_eq!(details.flatten().unwrap().len(), 1);
    }

    #[test]
    fn test_routes_response_parses() {
        let json = r#"{"Routes": [
            {"RouteID": "10A", "Name": "10A - HUNTINGTON STA - PENTAGON", "LineDescription": "Alexandria-Pentagon Line"},
            {"RouteID": "10B"}
        ]}"#;
        let resp: RoutesResponse = serde_json::from_str(json).unwrap();

        assert_eq!(resp.routes.len(), 2);
        assert_eq!(resp.routes[0].line_description, "Alexandria-Pentagon Line");
        assert_eq!(resp.routes[1].route_id, "10B");
        assert_eq!(resp.routes[1].name, "");
    }

    #[test]
    fn test_flatten_skips_missing_direction() {
        let json = r#"{
            "RouteID": "99",
            "Name": "99 - LOOP",
            "Direction0": {
                "TripHeadsign": "LOOP",
                "DirectionText": "CLOCKWISE",
                "DirectionNum": "0",
                "Stops": [{"StopID": "5", "Name": "A", "Lat": 1.0, "Lon": 2.0, "Routes": ["99"]}]
            },
            "Direction1": null
        }"#;
        let details: PathDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.flatten().unwrap().len(), 1);
    }

    #[test]
    fn test_flatten_rejects_non_numeric_stop_id() {
        let json = r#"{
            "RouteID": "99",
            "Direction0": {
                "DirectionText": "EAST",
                "Stops": [{"StopID": "X1", "Name": "A", "Lat": 1.0, "Lon": 2.0}]
            }
        }"#;
        let details: PathDetails = serde_json::from_str(json).unwrap();
        assert!(details.flatten().is_err());
    }

    #[test]
    fn test_stop_row_joins_routes() {
        let json = r#"{"Stops": [
            {"StopID": "1001195", "Name": "HUNTINGTON STA", "Lat": 38.79, "Lon": -77.07, "Routes": ["10A", "10B"]}
        ]}"#;
        let resp: StopsResponse = serde_json::from_str(json).unwrap();
        let row = resp.stops[0].to_row().unwrap();

        assert_eq!(row.stop_id, 1001195);
        assert_eq!(row.routes, "10A;10B");
    }
}
