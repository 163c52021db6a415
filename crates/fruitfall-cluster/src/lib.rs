//! Point clustering for the map's feature source.
//!
//! [`ClusterDataSource`] owns the ingested feature set and the derived
//! [`ClusterIndex`], which maps a display zoom level to cluster-or-point
//! nodes. Cluster geometry is regenerated whenever the collection is
//! replaced; feature ids stay stable across replacements.

pub mod error;
pub mod expander;
mod ids;
pub mod index;
mod kdtree;
mod projection;
pub mod source;

pub use error::ClusterError;
pub use expander::ExpansionTarget;
pub use index::{Bbox, ClusterId, ClusterIndex, ClusterNode, ClusterOptions, ClusterSummary, NodeId};
pub use source::{ClusterDataSource, IngestReport};
