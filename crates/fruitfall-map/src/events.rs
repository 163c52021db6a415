use fruitfall_cluster::{ClusterId, NodeId};
use fruitfall_core::{FeatureCollection, FeatureId, LngLat};
use serde::Deserialize;

use crate::marker::MarkerId;
use crate::render::Layer;

/// Input to the map controller: gestures reported by the render layer plus
/// commands from the form and geocoding collaborators.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MapEvent {
    /// Click on a cluster circle.
    ClusterClicked { cluster_id: ClusterId },
    /// Click on an unclustered point. `click` is where the pointer was, on
    /// whichever world copy was clicked.
    PointClicked { feature_id: FeatureId, click: LngLat },
    /// Click anywhere on the map canvas.
    MapClicked { position: LngLat },
    /// Pointer moved over a node on one of the interactive layers.
    HoverMoved { node: NodeId },
    HoverLeft { layer: Layer },
    MarkerDragStarted { marker: MarkerId },
    MarkerDragEnded { marker: MarkerId, position: LngLat },
    /// A geocoding search succeeded; `center` is `[lon, lat]`.
    SearchResult { center: [f64; 2] },
    ToggleAddLocation,
    SetCollection { collection: FeatureCollection },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_deserialize_from_tagged_json() {
        let events: Vec<MapEvent> = serde_json::from_value(serde_json::json!([
            { "event": "toggle_add_location" },
            { "event": "hover_moved", "node": { "kind": "cluster", "id": 2049 } },
            { "event": "hover_left", "layer": "clusters" },
            { "event": "point_clicked", "feature_id": 4, "click": { "lng": 179.9, "lat": 0.0 } },
            { "event": "search_result", "center": [-93.1, 44.9] },
            { "event": "marker_drag_ended", "marker": 1, "position": { "lng": 1.0, "lat": 2.0 } },
        ]))
        .unwrap();

        assert_eq!(events[0], MapEvent::ToggleAddLocation);
        assert_eq!(
            events[1],
            MapEvent::HoverMoved {
                node: NodeId::Cluster(ClusterId(2049))
            }
        );
        assert_eq!(events[2], MapEvent::HoverLeft { layer: Layer::Clusters });
        assert_eq!(
            events[3],
            MapEvent::PointClicked {
                feature_id: FeatureId(4),
                click: LngLat::new(179.9, 0.0)
            }
        );
        assert_eq!(events[4], MapEvent::SearchResult { center: [-93.1, 44.9] });
        assert_eq!(
            events[5],
            MapEvent::MarkerDragEnded {
                marker: MarkerId(1),
                position: LngLat::new(1.0, 2.0)
            }
        );
    }
}
