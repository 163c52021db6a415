use thiserror::Error;

use crate::index::ClusterId;

#[derive(Debug, Error, PartialEq)]
pub enum ClusterError {
    /// The id does not resolve to a cluster in the current index. Usually a
    /// click that raced a re-cluster.
    #[error("no cluster with id {0} in the current index")]
    UnknownCluster(ClusterId),

    #[error("invalid cluster options: {0}")]
    InvalidOptions(String),
}
