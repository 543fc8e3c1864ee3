//! Explicit configuration passed to the pipeline and the API collaborators.
//!
//! Nothing here is global: `main` builds these from the environment (after
//! `dotenvy` has loaded `.env`) or from a JSON file, applies CLI overrides,
//! and hands them down.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.wmata.com/Bus.svc/json";
pub const DEFAULT_VALIDATE_URL: &str = "https://api.wmata.com/Misc/Validate";

/// Where landed datasets are read from and network files are written to.
///
/// Stored as JSON on disk, every key optional:
/// ```json
/// {
///   "data_dir": "data",
///   "stops_dir": "stops",
///   "path_details_dir": "path_details_stops",
///   "shapes_dir": "path_details_shapes",
///   "routes_dir": "routes",
///   "output_dir": "stops_analysis"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DataLayout {
    pub data_dir: PathBuf,
    pub stops_dir: String,
    pub path_details_dir: String,
    pub shapes_dir: String,
    pub routes_dir: String,
    pub output_dir: PathBuf,
}

impl Default for DataLayout {
    fn default() -> Self {
        DataLayout {
            data_dir: PathBuf::from("data"),
            stops_dir: "stops".to_string(),
            path_details_dir: "path_details_stops".to_string(),
            shapes_dir: "path_details_shapes".to_string(),
            routes_dir: "routes".to_string(),
            output_dir: PathBuf::from("stops_analysis"),
        }
    }
}

impl DataLayout {
    /// Loads the layout from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading layout config {}", path.display()))?;
        let layout = serde_json::from_str(&content)
            .with_context(|| format!("parsing layout config {}", path.display()))?;
        Ok(layout)
    }

    /// Defaults, overridden by `TRANSIT_DATA_DIR` and `TRANSIT_OUTPUT_DIR`.
    pub fn from_env() -> Self {
        let mut layout = DataLayout::default();
        if let Ok(dir) = std::env::var("TRANSIT_DATA_DIR") {
            layout.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("TRANSIT_OUTPUT_DIR") {
            layout.output_dir = PathBuf::from(dir);
        }
        layout
    }

    pub fn with_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn with_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.output_dir = dir;
        }
        self
    }

    pub fn stops_root(&self) -> PathBuf {
        self.data_dir.join(&self.stops_dir)
    }

    pub fn path_details_root(&self) -> PathBuf {
        self.data_dir.join(&self.path_details_dir)
    }

    pub fn shapes_root(&self) -> PathBuf {
        self.data_dir.join(&self.shapes_dir)
    }

    pub fn routes_root(&self) -> PathBuf {
        self.data_dir.join(&self.routes_dir)
    }
}

/// Credentials and endpoint for the transit API.
#[derive(Clone, Deserialize)]
pub struct ApiConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_validate_url")]
    pub validate_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_validate_url() -> String {
    DEFAULT_VALIDATE_URL.to_string()
}

impl ApiConfig {
    /// Reads `WMATA_API_KEY` (required), `WMATA_BASE_URL` and `WMATA_VALIDATE_URL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("WMATA_API_KEY").context("WMATA_API_KEY must be set")?;
        let base_url = std::env::var("WMATA_BASE_URL").unwrap_or_else(|_| default_base_url());
        let validate_url =
            std::env::var("WMATA_VALIDATE_URL").unwrap_or_else(|_| default_validate_url());
        Ok(ApiConfig {
            api_key,
            base_url,
            validate_url,
        })
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("validate_url", &self.validate_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_layout_defaults() {
        let layout = DataLayout::default();
        assert_eq!(layout.stops_root(), Path::new("data").join("stops"));
        assert_eq!(
            layout.path_details_root(),
            Path::new("data").join("path_details_stops")
        );
        assert_eq!(
            layout.shapes_root(),
            Path::new("data").join("path_details_shapes")
        );
        assert_eq!(layout.routes_root(), Path::new("data").join("routes"));
        assert_eq!(layout.output_dir, PathBuf::from("stops_analysis"));
    }

    #[test]
    fn test_layout_load_partial_json() {
        let path = env::temp_dir().join("transit_network_test_layout.json");
        fs::write(&path, r#"{ "data_dir": "/srv/landed" }"#).unwrap();

        let layout = DataLayout::load(&path).unwrap();
        assert_eq!(layout.data_dir, PathBuf::from("/srv/landed"));
        assert_eq!(layout.stops_dir, "stops");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_layout_overrides() {
        let layout = DataLayout::default()
            .with_data_dir(Some(PathBuf::from("elsewhere")))
            .with_output_dir(None);
        assert_eq!(layout.data_dir, PathBuf::from("elsewhere"));
        assert_eq!(layout.output_dir, PathBuf::from("stops_analysis"));
    }

    #[test]
    fn test_api_config_debug_hides_key() {
        let cfg: ApiConfig = serde_json::from_str(r#"{ "api_key": "s3cret" }"#).unwrap();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.validate_url, DEFAULT_VALIDATE_URL);
        assert!(!format!("{cfg:?}").contains("s3cret"));
    }
}
