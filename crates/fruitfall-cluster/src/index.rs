//! Hierarchical greedy point clustering.
//!
//! One KD-tree is built per integer zoom level from `max_zoom + 1` (raw
//! points) down to `min_zoom`. Each level is produced from the one above it:
//! every unclaimed node absorbs its unclaimed neighbours within
//! `radius / (extent * 2^zoom)` of the unit square, and the merged node sits
//! at the count-weighted centroid.
//!
//! Cluster ids pack the origin node index and origin zoom:
//! `(index << 5) + (zoom + 1) + point_count_total`, so a cluster's children
//! can be found again without storing the hierarchy explicitly.

use std::collections::HashMap;

use fruitfall_core::{Feature, FeatureId, LngLat};
use serde::{Deserialize, Serialize};

use crate::error::ClusterError;
use crate::kdtree::KdTree;
use crate::projection::{lat_y, lng_x, x_lng, y_lat};

/// Highest zoom that fits in the 5 id bits reserved for it.
const MAX_SUPPORTED_ZOOM: u8 = 30;

/// Identifier of an aggregate node. Only meaningful for the index that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(pub u64);

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Any rendered node: an aggregate or a leaf feature. Clusters and points
/// live in separate id spaces, so the variant is part of the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeId {
    Cluster(ClusterId),
    Point(FeatureId),
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeId::Cluster(id) => write!(f, "cluster:{id}"),
            NodeId::Point(id) => write!(f, "point:{id}"),
        }
    }
}

/// Clustering granularity. Set once when the data source is created.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOptions {
    pub min_zoom: u8,
    /// Max zoom to cluster points on; above it every point is a leaf.
    pub max_zoom: u8,
    /// Minimum number of points that form a cluster.
    pub min_points: usize,
    /// Cluster radius in screen pixels.
    pub radius: f64,
    /// Tile extent the radius is measured against.
    pub extent: f64,
    /// KD-tree leaf size.
    pub node_size: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            min_zoom: 0,
            max_zoom: 14,
            min_points: 2,
            radius: 50.0,
            extent: 512.0,
            node_size: 64,
        }
    }
}

impl ClusterOptions {
    /// Options with the two parameters the map exposes, everything else at
    /// defaults.
    #[must_use]
    pub fn with_max_zoom_and_radius(max_zoom: u8, radius: f64) -> Self {
        Self {
            max_zoom,
            radius,
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidOptions`] when a parameter is out of range.
    pub fn validate(&self) -> Result<(), ClusterError> {
        if self.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(ClusterError::InvalidOptions(format!(
                "max_zoom {} exceeds {MAX_SUPPORTED_ZOOM}",
                self.max_zoom
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(ClusterError::InvalidOptions(format!(
                "min_zoom {} is above max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ClusterError::InvalidOptions(format!(
                "radius must be positive, got {}",
                self.radius
            )));
        }
        if !(self.extent.is_finite() && self.extent > 0.0) {
            return Err(ClusterError::InvalidOptions(format!(
                "extent must be positive, got {}",
                self.extent
            )));
        }
        if self.min_points < 2 {
            return Err(ClusterError::InvalidOptions(format!(
                "min_points must be at least 2, got {}",
                self.min_points
            )));
        }
        Ok(())
    }

    /// Search radius in unit-square coordinates at `zoom`.
    fn radius_at(&self, zoom: u8) -> f64 {
        self.radius / (self.extent * 2f64.powi(i32::from(zoom)))
    }
}

/// An aggregate node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub id: ClusterId,
    pub point_count: usize,
    pub centroid: LngLat,
}

impl ClusterSummary {
    /// Short label for the cluster count: `42`, `1.2k`, `12k`.
    #[must_use]
    pub fn point_count_abbreviated(&self) -> String {
        abbreviate_count(self.point_count)
    }
}

#[allow(clippy::cast_precision_loss)]
fn abbreviate_count(count: usize) -> String {
    if count >= 10_000 {
        format!("{}k", (count as f64 / 1000.0).round())
    } else if count >= 1000 {
        format!("{}k", (count as f64 / 100.0).round() / 10.0)
    } else {
        count.to_string()
    }
}

/// One node as seen by the render layer at a given zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClusterNode<'a> {
    Cluster(ClusterSummary),
    Point(&'a Feature),
}

impl ClusterNode<'_> {
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        match self {
            ClusterNode::Cluster(c) => NodeId::Cluster(c.id),
            ClusterNode::Point(f) => NodeId::Point(f.id),
        }
    }

    #[must_use]
    pub fn position(&self) -> LngLat {
        match self {
            ClusterNode::Cluster(c) => c.centroid,
            ClusterNode::Point(f) => f.position,
        }
    }

    #[must_use]
    pub fn point_count(&self) -> usize {
        match self {
            ClusterNode::Cluster(c) => c.point_count,
            ClusterNode::Point(_) => 1,
        }
    }
}

/// A longitude/latitude box. `west > east` means the box crosses the
/// antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bbox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bbox {
    pub const WORLD: Bbox = Bbox {
        west: -180.0,
        south: -90.0,
        east: 180.0,
        north: 90.0,
    };

    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Point(usize),
    Cluster(ClusterId),
}

#[derive(Debug, Clone)]
struct Node {
    x: f64,
    y: f64,
    kind: NodeKind,
    num_points: usize,
    claimed: bool,
    parent: Option<ClusterId>,
}

impl Node {
    fn carried(&self) -> Self {
        Self {
            claimed: false,
            parent: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone)]
struct Level {
    nodes: Vec<Node>,
    tree: KdTree,
}

impl Level {
    fn new(nodes: Vec<Node>, node_size: usize) -> Self {
        let tree = KdTree::build(nodes.iter().map(|n| (n.x, n.y)), node_size);
        Self { nodes, tree }
    }
}

/// Derived cluster hierarchy for one feature snapshot.
#[derive(Debug, Clone)]
pub struct ClusterIndex {
    options: ClusterOptions,
    features: Vec<Feature>,
    by_id: HashMap<FeatureId, usize>,
    /// `levels[z - min_zoom]` for `z` in `min_zoom..=max_zoom + 1`.
    levels: Vec<Level>,
    clusters: HashMap<ClusterId, ClusterSummary>,
}

impl ClusterIndex {
    /// Build an index over `features`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidOptions`] if `options` fail validation.
    pub fn new(features: Vec<Feature>, options: ClusterOptions) -> Result<Self, ClusterError> {
        options.validate()?;
        Ok(Self::build(features, options))
    }

    /// Build with options already validated.
    pub(crate) fn build(features: Vec<Feature>, options: ClusterOptions) -> Self {
        let by_id = features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id, i))
            .collect();

        let top = features
            .iter()
            .enumerate()
            .map(|(i, f)| Node {
                x: lng_x(f.position.lng),
                y: lat_y(f.position.lat),
                kind: NodeKind::Point(i),
                num_points: 1,
                claimed: false,
                parent: None,
            })
            .collect();

        let total = features.len();
        let mut clusters = HashMap::new();
        let mut levels = vec![Level::new(top, options.node_size)];
        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let Some(prev) = levels.last_mut() else {
                break;
            };
            let next = cluster_level(prev, zoom, &options, total, &mut clusters);
            levels.push(Level::new(next, options.node_size));
        }
        levels.reverse();

        tracing::debug!(
            features = total,
            clusters = clusters.len(),
            min_zoom = options.min_zoom,
            max_zoom = options.max_zoom,
            "built cluster index"
        );

        Self {
            options,
            features,
            by_id,
            levels,
            clusters,
        }
    }

    #[must_use]
    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    #[must_use]
    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.by_id.get(&id).map(|&i| &self.features[i])
    }

    #[must_use]
    pub fn cluster(&self, id: ClusterId) -> Option<&ClusterSummary> {
        self.clusters.get(&id)
    }

    /// Whether `node` resolves in this index.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        match node {
            NodeId::Cluster(id) => self.clusters.contains_key(&id),
            NodeId::Point(id) => self.by_id.contains_key(&id),
        }
    }

    /// Nodes intersecting `bbox` at display zoom `zoom`.
    #[must_use]
    pub fn clusters(&self, bbox: Bbox, zoom: f64) -> Vec<ClusterNode<'_>> {
        let mut west = (bbox.west + 180.0).rem_euclid(360.0) - 180.0;
        let south = bbox.south.clamp(-90.0, 90.0);
        let mut east = if (bbox.east - 180.0).abs() < f64::EPSILON {
            180.0
        } else {
            (bbox.east + 180.0).rem_euclid(360.0) - 180.0
        };
        let north = bbox.north.clamp(-90.0, 90.0);

        if bbox.east - bbox.west >= 360.0 {
            west = -180.0;
            east = 180.0;
        } else if west > east {
            let mut eastern = self.clusters(Bbox::new(west, south, 180.0, north), zoom);
            eastern.extend(self.clusters(Bbox::new(-180.0, south, east, north), zoom));
            return eastern;
        }

        let level = &self.levels[self.level_index(zoom)];
        level
            .tree
            .range(lng_x(west), lat_y(north), lng_x(east), lat_y(south))
            .into_iter()
            .map(|i| self.node_view(&level.nodes[i]))
            .collect()
    }

    /// Every node at display zoom `zoom`.
    #[must_use]
    pub fn nodes_at(&self, zoom: f64) -> Vec<ClusterNode<'_>> {
        self.clusters(Bbox::WORLD, zoom)
    }

    /// Direct children of a cluster, one zoom level further in.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::UnknownCluster`] if the id does not resolve.
    pub fn children(&self, cluster_id: ClusterId) -> Result<Vec<ClusterNode<'_>>, ClusterError> {
        let unknown = || ClusterError::UnknownCluster(cluster_id);
        let (origin_index, origin_zoom) = self.decode(cluster_id).ok_or_else(unknown)?;
        let level = self
            .levels
            .get(usize::from(origin_zoom - self.options.min_zoom))
            .ok_or_else(unknown)?;
        let origin = level.nodes.get(origin_index).ok_or_else(unknown)?;

        let r = self.options.radius_at(origin_zoom - 1);
        let children: Vec<ClusterNode<'_>> = level
            .tree
            .within(origin.x, origin.y, r)
            .into_iter()
            .map(|i| &level.nodes[i])
            .filter(|n| n.parent == Some(cluster_id))
            .map(|n| self.node_view(n))
            .collect();

        if children.is_empty() {
            return Err(unknown());
        }
        Ok(children)
    }

    /// Leaf features under a cluster, paginated.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::UnknownCluster`] if the id does not resolve.
    pub fn leaves(
        &self,
        cluster_id: ClusterId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<&Feature>, ClusterError> {
        let mut leaves = Vec::new();
        let mut skipped = 0;
        self.append_leaves(&mut leaves, cluster_id, limit, offset, &mut skipped)?;
        Ok(leaves)
    }

    fn append_leaves<'a>(
        &'a self,
        out: &mut Vec<&'a Feature>,
        cluster_id: ClusterId,
        limit: usize,
        offset: usize,
        skipped: &mut usize,
    ) -> Result<(), ClusterError> {
        for child in self.children(cluster_id)? {
            if out.len() >= limit {
                break;
            }
            match child {
                ClusterNode::Cluster(c) => {
                    if *skipped + c.point_count <= offset {
                        *skipped += c.point_count;
                    } else {
                        self.append_leaves(out, c.id, limit, offset, skipped)?;
                    }
                }
                ClusterNode::Point(f) => {
                    if *skipped < offset {
                        *skipped += 1;
                    } else {
                        out.push(f);
                    }
                }
            }
        }
        Ok(())
    }

    /// Lowest zoom at which the cluster's members are no longer all
    /// aggregated into one node.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::UnknownCluster`] if the id does not resolve.
    pub fn expansion_zoom(&self, cluster_id: ClusterId) -> Result<u8, ClusterError> {
        let (_, origin_zoom) = self
            .decode(cluster_id)
            .ok_or(ClusterError::UnknownCluster(cluster_id))?;
        let mut zoom = origin_zoom - 1;
        let mut current = cluster_id;
        while zoom <= self.options.max_zoom {
            let children = self.children(current)?;
            zoom += 1;
            match children.as_slice() {
                [ClusterNode::Cluster(only)] => current = only.id,
                _ => break,
            }
        }
        Ok(zoom)
    }

    fn level_index(&self, zoom: f64) -> usize {
        let min = self.options.min_zoom;
        let max = self.options.max_zoom + 1;
        let z = if zoom.is_nan() {
            min
        } else {
            // Clamped into [min, max] before the cast.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let z = zoom.floor().clamp(f64::from(min), f64::from(max)) as u8;
            z
        };
        usize::from(z - min)
    }

    /// Split a cluster id into origin node index and origin zoom. `None` if
    /// the id cannot have been produced by this index.
    fn decode(&self, id: ClusterId) -> Option<(usize, u8)> {
        let raw = id.0.checked_sub(self.features.len() as u64)?;
        let origin_zoom = u8::try_from(raw % 32).ok()?;
        let origin_index = usize::try_from(raw >> 5).ok()?;
        let valid = origin_zoom > self.options.min_zoom && origin_zoom <= self.options.max_zoom + 1;
        valid.then_some((origin_index, origin_zoom))
    }

    fn node_view(&self, node: &Node) -> ClusterNode<'_> {
        match node.kind {
            NodeKind::Point(i) => ClusterNode::Point(&self.features[i]),
            NodeKind::Cluster(id) => ClusterNode::Cluster(ClusterSummary {
                id,
                point_count: node.num_points,
                centroid: LngLat::new(x_lng(node.x), y_lat(node.y)),
            }),
        }
    }
}

/// Produce the nodes of level `zoom` from the level above it, marking
/// claimed nodes and parent links on `prev`.
#[allow(clippy::cast_precision_loss)]
fn cluster_level(
    prev: &mut Level,
    zoom: u8,
    options: &ClusterOptions,
    total_points: usize,
    clusters: &mut HashMap<ClusterId, ClusterSummary>,
) -> Vec<Node> {
    let r = options.radius_at(zoom);
    let mut next = Vec::new();

    for i in 0..prev.nodes.len() {
        if prev.nodes[i].claimed {
            continue;
        }
        prev.nodes[i].claimed = true;

        let (x, y) = (prev.nodes[i].x, prev.nodes[i].y);
        let neighbors = prev.tree.within(x, y, r);

        let origin_points = prev.nodes[i].num_points;
        let num_points = origin_points
            + neighbors
                .iter()
                .filter(|&&n| !prev.nodes[n].claimed)
                .map(|&n| prev.nodes[n].num_points)
                .sum::<usize>();

        if num_points > origin_points && num_points >= options.min_points {
            let id = ClusterId(((i as u64) << 5) + u64::from(zoom) + 1 + total_points as u64);
            let mut wx = x * origin_points as f64;
            let mut wy = y * origin_points as f64;

            for &n in &neighbors {
                let neighbor = &mut prev.nodes[n];
                if neighbor.claimed {
                    continue;
                }
                neighbor.claimed = true;
                neighbor.parent = Some(id);
                wx += neighbor.x * neighbor.num_points as f64;
                wy += neighbor.y * neighbor.num_points as f64;
            }
            prev.nodes[i].parent = Some(id);

            let node = Node {
                x: wx / num_points as f64,
                y: wy / num_points as f64,
                kind: NodeKind::Cluster(id),
                num_points,
                claimed: false,
                parent: None,
            };
            clusters.insert(
                id,
                ClusterSummary {
                    id,
                    point_count: num_points,
                    centroid: LngLat::new(x_lng(node.x), y_lat(node.y)),
                },
            );
            next.push(node);
        } else {
            next.push(prev.nodes[i].carried());
            if num_points > 1 {
                for &n in &neighbors {
                    if prev.nodes[n].claimed {
                        continue;
                    }
                    prev.nodes[n].claimed = true;
                    next.push(prev.nodes[n].carried());
                }
            }
        }
    }

    next
}

#[cfg(test)]
#[path = "index_test.rs"]
mod tests;
