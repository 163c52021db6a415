//! Resolving a cluster click into a viewport target.

use fruitfall_core::LngLat;
use serde::Serialize;

use crate::index::ClusterId;
use crate::source::ClusterDataSource;

/// Where to animate the viewport after a cluster click.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExpansionTarget {
    pub center: LngLat,
    pub zoom: u8,
}

impl ClusterDataSource {
    /// Centroid of the cluster plus the lowest zoom at which its members
    /// stop being a single node.
    ///
    /// Returns `None` when the id does not resolve in the current index. The
    /// click that produced it may have raced a re-cluster, so this is a no-op
    /// rather than an error.
    #[must_use]
    pub fn expand_cluster(&self, cluster_id: ClusterId) -> Option<ExpansionTarget> {
        let index = self.index();
        let Some(summary) = index.cluster(cluster_id) else {
            tracing::debug!(%cluster_id, "cluster expand ignored: unknown cluster id");
            return None;
        };
        match index.expansion_zoom(cluster_id) {
            Ok(zoom) => Some(ExpansionTarget {
                center: summary.centroid,
                zoom,
            }),
            Err(error) => {
                tracing::debug!(%cluster_id, %error, "cluster expand ignored");
                None
            }
        }
    }
}
