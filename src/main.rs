//! CLI entry point for the transit network toolkit.
//!
//! Provides subcommands for landing stops and route path details from the
//! transit API, and for turning a day's landed datasets into node and edge
//! tables.

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_network::{
    config::{ApiConfig, DataLayout},
    infra::wmata::WmataClient,
    land::{land_path_details, land_routes, land_stops},
    nodes::IdPolicy,
    pipeline::generate_network_files,
    services::transit_api::TransitApi,
};

#[derive(Parser)]
#[command(name = "transit_network")]
#[command(about = "Land transit API data and build stop network graphs", long_about = None)]
struct Cli {
    /// Optional JSON file describing the data directory layout
    #[arg(long, global = true, value_name = "FILE")]
    layout: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build node and edge tables from the datasets landed on a date
    Network {
        /// Date of the landed datasets, MM-DD-YYYY
        #[arg(value_name = "MM-DD-YYYY")]
        date: String,

        /// Root directory of landed datasets
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Directory the network_data folder is written under
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Fail when a synthetic node id equals a real stop id
        #[arg(long, default_value_t = false)]
        strict_ids: bool,
    },
    /// Fetch stops, routes and route path details and land them under today's date
    Fetch {
        /// Root directory to land datasets in
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Route to fetch path details for (repeatable); defaults to every route
        #[arg(short, long = "route", value_name = "ROUTE_ID")]
        routes: Vec<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/transit_network.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_network.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info"));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let layout = match &cli.layout {
        Some(path) => DataLayout::load(path)?,
        None => DataLayout::from_env(),
    };

    match cli.command {
        Commands::Network {
            date,
            data_dir,
            output_dir,
            strict_ids,
        } => {
            let layout = layout
                .with_data_dir(data_dir)
                .with_output_dir(output_dir);
            let policy = IdPolicy {
                strict: strict_ids,
                ..IdPolicy::default()
            };

            let files = generate_network_files(&layout, &date, &policy)
                .with_context(|| format!("generating network files for {date}"))?;
            info!(
                nodes = %files.nodes.display(),
                edges = %files.edges.display(),
                "Done"
            );
        }
        Commands::Fetch { data_dir, routes } => {
            let layout = layout.with_data_dir(data_dir);
            let api_config = ApiConfig::from_env()?;

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(fetch(&layout, &api_config, routes))?;
        }
    }

    Ok(())
}

/// Filter from `var`, falling back to `default` when it is unset or invalid.
fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Checks the API key, lands stops and the route list, then path details for
/// `routes` (or every listed route).
#[tracing::instrument(skip_all, fields(data_dir = %layout.data_dir.display()))]
async fn fetch(layout: &DataLayout, api_config: &ApiConfig, routes: Vec<String>) -> Result<()> {
    let client = WmataClient::from_config(api_config)?;
    if !client.validate_key().await.context("validating API key")? {
        bail!("API key was rejected by {}", api_config.validate_url);
    }
    let now = Local::now();

    land_stops(&client, layout, now).await?;
    let listed = land_routes(&client, layout, now).await?;

    let route_ids = if routes.is_empty() {
        listed.into_iter().map(|r| r.route_id).collect()
    } else {
        routes
    };

    let summary = land_path_details(&client, layout, &route_ids, now).await?;
    if !summary.failed.is_empty() {
        warn!(
            failed = ?summary.failed,
            "Some routes could not be landed; their edges will be missing"
        );
    }
    Ok(())
}
