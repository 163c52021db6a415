//! The clustered point source the render layer draws from.

use fruitfall_core::{DroppedRecord, Feature, FeatureCollection, FeatureId};

use crate::error::ClusterError;
use crate::ids::IdAllocator;
use crate::index::{ClusterIndex, ClusterOptions, NodeId};

/// Outcome of installing a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub accepted: usize,
    /// Ids generated for features supplied without one.
    pub generated_ids: usize,
    pub dropped: Vec<DroppedRecord>,
}

/// Owns the feature collection and its clustering parameters.
///
/// Clustering parameters are fixed at creation. [`set_collection`] replaces
/// the content in place: the source object itself, and so any render layers
/// bound to it, stay the same.
///
/// [`set_collection`]: ClusterDataSource::set_collection
#[derive(Debug)]
pub struct ClusterDataSource {
    options: ClusterOptions,
    ids: IdAllocator,
    index: ClusterIndex,
    generation: u64,
}

impl ClusterDataSource {
    /// Create an empty source.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidOptions`] if `options` fail validation.
    pub fn new(options: ClusterOptions) -> Result<Self, ClusterError> {
        let index = ClusterIndex::new(Vec::new(), options.clone())?;
        Ok(Self {
            options,
            ids: IdAllocator::default(),
            index,
            generation: 0,
        })
    }

    /// Install or replace the full feature set and regenerate clusters.
    ///
    /// Records with non-finite or out-of-range coordinates or a repeated id
    /// are dropped and reported; the remaining features are still installed.
    pub fn set_collection(&mut self, collection: FeatureCollection) -> IngestReport {
        let assignment = self.ids.assign(collection.features);
        for record in &assignment.dropped {
            tracing::warn!(
                index = record.index,
                reason = %record.reason,
                "dropping feature from collection"
            );
        }

        let report = IngestReport {
            accepted: assignment.features.len(),
            generated_ids: assignment.generated,
            dropped: assignment.dropped,
        };
        self.index = ClusterIndex::build(assignment.features, self.options.clone());
        self.generation += 1;

        tracing::info!(
            generation = self.generation,
            accepted = report.accepted,
            dropped = report.dropped.len(),
            "feature collection installed"
        );
        report
    }

    #[must_use]
    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    #[must_use]
    pub fn index(&self) -> &ClusterIndex {
        &self.index
    }

    /// Number of collections installed so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn features(&self) -> &[Feature] {
        self.index.features()
    }

    #[must_use]
    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.index.feature(id)
    }

    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.index.contains(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fruitfall_core::{DropReason, FeatureInput, LngLat};

    fn source() -> ClusterDataSource {
        ClusterDataSource::new(ClusterOptions::with_max_zoom_and_radius(14, 50.0)).unwrap()
    }

    #[test]
    fn new_source_is_empty() {
        let src = source();
        assert!(src.features().is_empty());
        assert!(src.index().nodes_at(0.0).is_empty());
        assert_eq!(src.generation(), 0);
    }

    #[test]
    fn rejects_invalid_options() {
        let options = ClusterOptions::with_max_zoom_and_radius(40, 50.0);
        assert!(matches!(
            ClusterDataSource::new(options),
            Err(ClusterError::InvalidOptions(_))
        ));
    }

    #[test]
    fn bad_geometry_does_not_blank_the_map() {
        let mut src = source();
        let report = src.set_collection(FeatureCollection::new(vec![
            FeatureInput::new(LngLat::new(f64::NAN, 0.0)),
            FeatureInput::new(LngLat::new(-93.26, 44.97)),
        ]));
        assert_eq!(report.accepted, 1);
        assert_eq!(report.dropped.len(), 1);
        assert!(matches!(
            report.dropped[0].reason,
            DropReason::NonFiniteCoordinates { .. }
        ));
        assert_eq!(src.index().nodes_at(10.0).len(), 1);
    }

    #[test]
    fn out_of_range_position_is_dropped_and_reported() {
        let mut src = source();
        let report = src.set_collection(FeatureCollection::new(vec![
            FeatureInput::new(LngLat::new(190.0, 10.0)),
            FeatureInput::new(LngLat::new(10.0, 95.0)),
            FeatureInput::new(LngLat::new(180.0, 10.0)),
        ]));
        assert_eq!(report.accepted, 1);
        assert_eq!(
            report.dropped.iter().map(|d| d.index).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert_eq!(
            report.dropped[0].reason,
            DropReason::OutOfRange {
                lng: 190.0,
                lat: 10.0
            }
        );
        assert_eq!(src.index().nodes_at(10.0).len(), 1);
    }

    #[test]
    fn replacement_preserves_ids_of_unchanged_features() {
        let mut src = source();
        let apple = FeatureInput::new(LngLat::new(-93.0, 45.0)).with_property("fruit", "apple");
        src.set_collection(FeatureCollection::new(vec![apple.clone()]));
        let before = src.features()[0].id;

        let report = src.set_collection(FeatureCollection::new(vec![
            FeatureInput::new(LngLat::new(-94.0, 46.0)).with_property("fruit", "plum"),
            apple,
        ]));
        assert_eq!(report.generated_ids, 2);
        assert_eq!(src.features()[1].id, before);
        assert_eq!(src.generation(), 2);
        assert!(src.contains(NodeId::Point(before)));
    }

    #[test]
    fn adding_one_feature_yields_one_leaf_everywhere() {
        let mut src = source();
        src.set_collection(FeatureCollection::default());
        assert!(src.index().nodes_at(0.0).is_empty());

        src.set_collection(FeatureCollection::new(vec![FeatureInput::new(
            LngLat::new(-94.6859, 46.5),
        )
        .with_id(1)]));
        for zoom in 0..=16 {
            assert_eq!(src.index().nodes_at(f64::from(zoom)).len(), 1);
        }
        assert!(src.feature(FeatureId(1)).is_some());
    }
}
