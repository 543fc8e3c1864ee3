//! Lands API responses as timestamped CSVs in the dated directory layout the
//! network builder reads from.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::DataLayout;
use crate::locator::{DatePartition, PATH_DETAILS_STOPS_INFIX};
use crate::output::file_timestamp;
use crate::services::transit_api::{ApiRoute, TransitApi};

pub const PATH_DETAILS_SHAPES_INFIX: &str = "_path_details_shapes_";

/// Outcome of landing path details for a set of routes.
#[derive(Debug, Default)]
pub struct LandingSummary {
    pub files: Vec<PathBuf>,
    pub shape_files: Vec<PathBuf>,
    pub empty: Vec<String>,
    pub failed: Vec<String>,
}

/// Writes `rows` to a new CSV at `path`, header first.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Fetches every stop and lands it as `stops_<timestamp>.csv` under `YYYY/MM`.
#[tracing::instrument(skip_all)]
pub async fn land_stops<A: TransitApi>(
    api: &A,
    layout: &DataLayout,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    let stops = api.stops().await.context("fetching stops")?;
    let rows = stops
        .iter()
        .map(|s| s.to_row())
        .collect::<Result<Vec<_>>>()?;

    let partition = DatePartition::from_date(now.date_naive());
    let dir = partition.month_dir(&layout.stops_root());
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let path = dir.join(format!("stops_{}.csv", file_timestamp(&now)));
    write_rows(&path, &rows)?;

    info!(path = %path.display(), rows = rows.len(), "Stops landed");
    Ok(path)
}

/// Fetches every route variant and lands it as `routes_<timestamp>.csv` under
/// `YYYY/MM`, returning the routes for the path-details pass.
#[tracing::instrument(skip_all)]
pub async fn land_routes<A: TransitApi>(
    api: &A,
    layout: &DataLayout,
    now: DateTime<Local>,
) -> Result<Vec<ApiRoute>> {
    let routes = api.routes().await.context("fetching routes")?;

    let partition = DatePartition::from_date(now.date_naive());
    let dir = partition.month_dir(&layout.routes_root());
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let path = dir.join(format!("routes_{}.csv", file_timestamp(&now)));
    write_rows(&path, &routes)?;

    info!(path = %path.display(), rows = routes.len(), "Routes landed");
    Ok(routes)
}

/// Fetches path details for each route and lands, under `YYYY/MM/DD`, one
/// `<RouteID>_path_details_stops_<timestamp>.csv` in the path-details tree and
/// one `<RouteID>_path_details_shapes_<timestamp>.csv` in the shapes tree.
///
/// A failing route is logged and recorded in the summary; the rest still land.
#[tracing::instrument(skip_all, fields(routes = route_ids.len()))]
pub async fn land_path_details<A: TransitApi>(
    api: &A,
    layout: &DataLayout,
    route_ids: &[String],
    now: DateTime<Local>,
) -> Result<LandingSummary> {
    let partition = DatePartition::from_date(now.date_naive());
    let dir = partition.day_dir(&layout.path_details_root());
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let shapes_dir = partition.day_dir(&layout.shapes_root());
    fs::create_dir_all(&shapes_dir)
        .with_context(|| format!("creating {}", shapes_dir.display()))?;

    let timestamp = file_timestamp(&now);
    let mut summary = LandingSummary::default();

    for route_id in route_ids {
        let fetched = api
            .path_details(route_id, Some(partition.date()))
            .await
            .and_then(|details| Ok((details.flatten()?, details.flatten_shapes())));
        let (rows, shapes) = match fetched {
            Ok(flat) => flat,
            Err(e) => {
                error!(route_id = %route_id, error = %e, "Path details fetch failed");
                summary.failed.push(route_id.clone());
                continue;
            }
        };
        if rows.is_empty() {
            warn!(route_id = %route_id, "Route has no path stops");
            summary.empty.push(route_id.clone());
            continue;
        }

        let path = dir.join(format!("{route_id}{PATH_DETAILS_STOPS_INFIX}{timestamp}.csv"));
        write_rows(&path, &rows)?;
        summary.files.push(path);

        if shapes.is_empty() {
            debug!(route_id = %route_id, "Route has no shape points");
            continue;
        }
        let path = shapes_dir.join(format!("{route_id}{PATH_DETAILS_SHAPES_INFIX}{timestamp}.csv"));
        write_rows(&path, &shapes)?;
        summary.shape_files.push(path);
    }

    info!(
        landed = summary.files.len(),
        shapes = summary.shape_files.len(),
        empty = summary.empty.len(),
        failed = summary.failed.len(),
        "Path details landed"
    );
    Ok(summary)
}
