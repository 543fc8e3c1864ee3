//! Selection of landed datasets by date.
//!
//! Landed files embed a sortable `MM-DD-YYYY_HH-MM-SS` timestamp in their
//! names, so among files sharing a date token the lexicographically greatest
//! name is the most recent one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{NetworkError, NetworkResult};

pub const DATE_TOKEN_FORMAT: &str = "%m-%d-%Y";

/// Separates the route id from the timestamp in landed path-detail filenames,
/// e.g. `10A_path_details_stops_08-19-2021_06-00-00.csv`.
pub const PATH_DETAILS_STOPS_INFIX: &str = "_path_details_stops_";

/// A target date decomposed into the `year/month/day` directory segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatePartition {
    date: NaiveDate,
}

impl DatePartition {
    /// Parses a `MM-DD-YYYY` date argument.
    pub fn parse(date: &str) -> NetworkResult<Self> {
        let date = NaiveDate::parse_from_str(date.trim(), DATE_TOKEN_FORMAT).map_err(|_| {
            NetworkError::InvalidDate {
                date: date.to_string(),
            }
        })?;
        Ok(DatePartition { date })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        DatePartition { date }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The token landed filenames embed, e.g. `08-19-2021`.
    pub fn token(&self) -> String {
        self.date.format(DATE_TOKEN_FORMAT).to_string()
    }

    pub fn year(&self) -> String {
        self.date.format("%Y").to_string()
    }

    pub fn month(&self) -> String {
        self.date.format("%m").to_string()
    }

    pub fn day(&self) -> String {
        self.date.format("%d").to_string()
    }

    /// `<root>/YYYY/MM`
    pub fn month_dir(&self, root: &Path) -> PathBuf {
        root.join(self.year()).join(self.month())
    }

    /// `<root>/YYYY/MM/DD`
    pub fn day_dir(&self, root: &Path) -> PathBuf {
        self.month_dir(root).join(self.day())
    }
}

/// Returns the lexicographically greatest filename containing `date_token`,
/// or `None` if nothing matches.
pub fn find_latest_by_date<'a, I, S>(date_token: &str, filenames: I) -> Option<String>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    filenames
        .into_iter()
        .map(|name: &'a S| -> &'a str { name.as_ref() })
        .filter(|name| name.contains(date_token))
        .max()
        .map(str::to_string)
}

/// Finds the most recent file in `dir` for `partition`.
///
/// A missing directory and an empty match set are both reported as a missing
/// dataset; callers must not fall back to some other file.
pub fn locate_in_dir(dir: &Path, partition: &DatePartition) -> NetworkResult<PathBuf> {
    let token = partition.token();
    let missing = || NetworkError::MissingDataset {
        date: token.clone(),
        dir: dir.display().to_string(),
    };

    if !dir.is_dir() {
        return Err(missing());
    }

    let names = list_csv_names(dir)?;
    let latest = find_latest_by_date(&token, &names).ok_or_else(missing)?;

    debug!(dir = %dir.display(), file = %latest, "Located dataset");
    Ok(dir.join(latest))
}

/// Finds the most recent path-detail file of every route landed in `dir` for
/// `partition`, ordered by route id.
///
/// Files are grouped by the text before [`PATH_DETAILS_STOPS_INFIX`] (the whole
/// name when it is absent), so a route landed several times that day
/// contributes only its latest landing. Files without the date token are
/// ignored.
pub fn locate_latest_per_route(dir: &Path, partition: &DatePartition) -> NetworkResult<Vec<PathBuf>> {
    let token = partition.token();
    let missing = || NetworkError::MissingDataset {
        date: token.clone(),
        dir: dir.display().to_string(),
    };

    if !dir.is_dir() {
        return Err(missing());
    }

    let mut by_route: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in list_csv_names(dir)? {
        let route = name
            .split_once(PATH_DETAILS_STOPS_INFIX)
            .map_or(name.as_str(), |(route, _)| route)
            .to_string();
        by_route.entry(route).or_default().push(name);
    }

    let mut latest = Vec::with_capacity(by_route.len());
    for (route, names) in &by_route {
        match find_latest_by_date(&token, names) {
            Some(name) => {
                if names.len() > 1 {
                    debug!(route = %route, file = %name, landings = names.len(), "Using latest landing");
                }
                latest.push(dir.join(name));
            }
            None => debug!(route = %route, "No landing for date"),
        }
    }

    if latest.is_empty() {
        return Err(missing());
    }
    Ok(latest)
}

/// Lists the names of the `.csv` files in `dir`, sorted.
fn list_csv_names(dir: &Path) -> NetworkResult<Vec<String>> {
    let mut names = list_file_names(dir)?;
    names.retain(|n| n.ends_with(".csv"));
    names.sort();
    Ok(names)
}

fn list_file_names(dir: &Path) -> NetworkResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| NetworkError::io(dir, e))? {
        let entry = entry.map_err(|e| NetworkError::io(dir, e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| NetworkError::io(entry.path(), e))?
            .is_file();
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_find_latest_by_date_picks_greatest_match() {
        let files = [
            "stops_08-19-2021_01.csv",
            "stops_08-19-2021_09.csv",
            "stops_07-01-2021.csv",
        ];
        let latest = find_latest_by_date("08-19-2021", &files);
        assert_eq!(latest.as_deref(), Some("stops_08-19-2021_09.csv"));
    }

    #[test]
    fn test_find_latest_by_date_no_match() {
        let files = vec!["stops_07-01-2021.csv".to_string()];
        assert_eq!(find_latest_by_date("08-19-2021", &files), None);
    }

    #[test]
    fn test_find_latest_by_date_empty_list() {
        let files: Vec<String> = Vec::new();
        assert_eq!(find_latest_by_date("08-19-2021", &files), None);
    }

    #[test]
    fn test_date_partition_segments() {
        let p = DatePartition::parse("08-19-2021").unwrap();
        assert_eq!(p.token(), "08-19-2021");
        assert_eq!(p.year(), "2021");
        assert_eq!(p.month(), "08");
        assert_eq!(p.day(), "19");
        assert_eq!(
            p.day_dir(Path::new("data")),
            Path::new("data").join("2021").join("08").join("19")
        );
    }

    #[test]
    fn test_date_partition_rejects_iso_format() {
        let err = DatePartition::parse("2021-08-19").unwrap_err();
        assert!(matches!(err, NetworkError::InvalidDate { .. }));
    }

    #[test]
    fn test_locate_in_dir_missing_directory() {
        let dir = env::temp_dir().join("transit_network_test_no_such_dir");
        let _ = fs::remove_dir_all(&dir);
        let p = DatePartition::parse("08-19-2021").unwrap();

        let err = locate_in_dir(&dir, &p).unwrap_err();
        assert!(matches!(err, NetworkError::MissingDataset { .. }));
    }

    #[test]
    fn test_locate_in_dir_finds_latest() {
        let dir = env::temp_dir().join("transit_network_test_locate");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        for name in [
            "stops_08-19-2021_06-00-00.csv",
            "stops_08-19-2021_18-00-00.csv",
            "stops_08-20-2021_06-00-00.csv",
        ] {
            fs::write(dir.join(name), "StopID,Lat,Lon\n").unwrap();
        }

        let p = DatePartition::parse("08-19-2021").unwrap();
        let found = locate_in_dir(&dir, &p).unwrap();
        assert_eq!(found, dir.join("stops_08-19-2021_18-00-00.csv"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_locate_in_dir_ignores_non_csv() {
        let dir = env::temp_dir().join("transit_network_test_locate_csv_only");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stops_08-19-2021_06-00-00.csv"), "StopID,Lat,Lon\n").unwrap();
        fs::write(dir.join("stops_08-19-2021_06-00-00.csv.bak"), "junk").unwrap();

        let p = DatePartition::parse("08-19-2021").unwrap();
        let found = locate_in_dir(&dir, &p).unwrap();
        assert_eq!(found, dir.join("stops_08-19-2021_06-00-00.csv"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_locate_latest_per_route_keeps_one_landing_per_route() {
        let dir = env::temp_dir().join("transit_network_test_latest_per_route");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        for name in [
            "10A_path_details_stops_08-19-2021_06-00-00.csv",
            "10A_path_details_stops_08-19-2021_18-00-00.csv",
            "10B_path_details_stops_08-19-2021_06-00-00.csv",
            "10C_path_details_stops_08-18-2021_06-00-00.csv",
            "10B_path_details_stops_08-19-2021_23-00-00.csv.tmp",
        ] {
            fs::write(dir.join(name), "").unwrap();
        }

        let p = DatePartition::parse("08-19-2021").unwrap();
        let found = locate_latest_per_route(&dir, &p).unwrap();
        assert_eq!(
            found,
            vec![
                dir.join("10A_path_details_stops_08-19-2021_18-00-00.csv"),
                dir.join("10B_path_details_stops_08-19-2021_06-00-00.csv"),
            ]
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_locate_latest_per_route_nothing_for_date() {
        let dir = env::temp_dir().join("transit_network_test_latest_per_route_none");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("10A_path_details_stops_08-18-2021_06-00-00.csv"), "").unwrap();

        let p = DatePartition::parse("08-19-2021").unwrap();
        let err = locate_latest_per_route(&dir, &p).unwrap_err();
        assert!(matches!(err, NetworkError::MissingDataset { .. }));

        fs::remove_dir_all(&dir).unwrap();
    }
}
