//! Offline cluster inspection commands.

use std::path::Path;

use fruitfall_cluster::{Bbox, ClusterDataSource, ClusterId, ClusterNode, ClusterOptions};
use fruitfall_core::{parse_feature_collection, FeatureCollection};

use crate::ClusterArgs;

/// Read and parse a `GeoJSON` file. Dropped records are logged, not fatal.
pub(crate) fn read_collection(path: &Path) -> anyhow::Result<FeatureCollection> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let (collection, dropped) = parse_feature_collection(&text)
        .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
    if !dropped.is_empty() {
        tracing::warn!(
            path = %path.display(),
            dropped = dropped.len(),
            "some GeoJSON records were skipped"
        );
    }
    Ok(collection)
}

pub(crate) fn build_source(
    collection: FeatureCollection,
    args: &ClusterArgs,
) -> anyhow::Result<ClusterDataSource> {
    let options = ClusterOptions::with_max_zoom_and_radius(args.max_zoom, f64::from(args.radius));
    let mut source = ClusterDataSource::new(options)?;
    let report = source.set_collection(collection);
    tracing::info!(
        accepted = report.accepted,
        generated_ids = report.generated_ids,
        dropped = report.dropped.len(),
        "collection loaded"
    );
    Ok(source)
}

pub(crate) fn run_clusters(
    path: &Path,
    zoom: f64,
    bbox: Option<Bbox>,
    args: &ClusterArgs,
) -> anyhow::Result<()> {
    let source = build_source(read_collection(path)?, args)?;
    let nodes = source.index().clusters(bbox.unwrap_or(Bbox::WORLD), zoom);
    let rows: Vec<serde_json::Value> = nodes
        .iter()
        .map(|node| -> Result<serde_json::Value, serde_json::Error> {
            let mut row = serde_json::to_value(node)?;
            if let (ClusterNode::Cluster(summary), Some(obj)) =
                (node, row.as_object_mut())
            {
                obj.insert(
                    "point_count_abbreviated".to_owned(),
                    summary.point_count_abbreviated().into(),
                );
            }
            Ok(row)
        })
        .collect::<Result<_, _>>()?;

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

pub(crate) fn run_expand(path: &Path, cluster_id: u64, args: &ClusterArgs) -> anyhow::Result<()> {
    let source = build_source(read_collection(path)?, args)?;
    let target = source
        .expand_cluster(ClusterId(cluster_id))
        .ok_or_else(|| anyhow::anyhow!("cluster {cluster_id} is not in the current index"))?;
    println!("{}", serde_json::to_string_pretty(&target)?);
    Ok(())
}
