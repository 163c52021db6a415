mod cluster;
mod replay;
mod surface;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fruitfall_cluster::Bbox;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fruitfall")]
#[command(about = "Fruitfall cluster map command line interface")]
struct Cli {
    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, global = true, env = "FRUITFALL_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the nodes rendered at a zoom level
    Clusters {
        /// GeoJSON `FeatureCollection` of point features
        #[arg(long)]
        geojson: PathBuf,
        #[arg(long)]
        zoom: f64,
        /// Viewport as `west,south,east,north`; the whole world if omitted
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: Option<Bbox>,
        #[command(flatten)]
        cluster: ClusterArgs,
    },
    /// Print where a cluster click would move the viewport
    Expand {
        #[arg(long)]
        geojson: PathBuf,
        #[arg(long)]
        cluster_id: u64,
        #[command(flatten)]
        cluster: ClusterArgs,
    },
    /// Fetch one feature's detail from the API
    Detail {
        #[arg(long)]
        id: u64,
    },
    /// Drive the map controller with a scripted list of events
    Replay {
        #[arg(long)]
        geojson: PathBuf,
        /// JSON array of map events
        #[arg(long)]
        events: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct ClusterArgs {
    /// Max zoom to cluster points on
    #[arg(long, env = "FRUITFALL_CLUSTER_MAX_ZOOM", default_value_t = 14)]
    max_zoom: u8,
    /// Cluster radius in screen pixels
    #[arg(long, env = "FRUITFALL_CLUSTER_RADIUS", default_value_t = 50)]
    radius: u32,
}

fn parse_bbox(value: &str) -> Result<Bbox, String> {
    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate in '{value}': {e}"))?;
    match parts.as_slice() {
        [west, south, east, north] if parts.iter().all(|v| v.is_finite()) => {
            if south > north {
                return Err(format!("south {south} is above north {north}"));
            }
            Ok(Bbox::new(*west, *south, *east, *north))
        }
        _ => Err(format!(
            "expected four finite numbers west,south,east,north, got '{value}'"
        )),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cli.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Clusters {
            geojson,
            zoom,
            bbox,
            cluster,
        } => cluster::run_clusters(&geojson, zoom, bbox, &cluster),
        Commands::Expand {
            geojson,
            cluster_id,
            cluster,
        } => cluster::run_expand(&geojson, cluster_id, &cluster),
        Commands::Detail { id } => replay::run_detail(id).await,
        Commands::Replay { geojson, events } => replay::run_replay(&geojson, &events).await,
    }
}

#[cfg(test)]
mod tests;
