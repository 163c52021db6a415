//! Capabilities the rendering and form collaborators expose to the map core.
//!
//! Everything the core does to the screen goes through [`MapSurface`];
//! committed coordinates go through [`FormState`]. Both are called only from
//! the event loop.

use fruitfall_cluster::{ClusterDataSource, ExpansionTarget, NodeId};
use fruitfall_core::{FeatureId, HomeView, LngLat};
use serde::{Deserialize, Serialize};

use crate::marker::{ActiveMarker, MarkerId};
use crate::popup::Popup;

/// The two interactive layers drawn from the clustered source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Clusters,
    Points,
}

impl Layer {
    /// The layer a node is drawn on.
    #[must_use]
    pub fn of(node: NodeId) -> Self {
        match node {
            NodeId::Cluster(_) => Layer::Clusters,
            NodeId::Point(_) => Layer::Points,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
    Crosshair,
}

/// What the map reports about its own loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadStatus {
    /// Initial style and resources have loaded.
    pub style_loaded: bool,
    /// No further internal load work is pending.
    pub idle: bool,
}

impl LoadStatus {
    pub const READY: LoadStatus = LoadStatus {
        style_loaded: true,
        idle: true,
    };

    #[must_use]
    pub fn is_ready(self) -> bool {
        self.style_loaded && self.idle
    }
}

/// Render-side capabilities.
pub trait MapSurface {
    fn load_status(&self) -> LoadStatus;

    /// Add the clustered source and its cluster, count and point layers.
    fn install_source(&mut self, source: &ClusterDataSource);

    /// Replace the source content in place; layers stay attached.
    fn update_source(&mut self, source: &ClusterDataSource);

    fn set_feature_highlighted(&mut self, node: NodeId, highlighted: bool);
    fn set_point_layers_visible(&mut self, visible: bool);
    fn set_cursor(&mut self, cursor: Cursor);

    /// Show a popup, replacing any popup already open.
    fn show_popup(&mut self, popup: Popup);

    fn ease_to(&mut self, target: ExpansionTarget);
    fn fly_to(&mut self, view: HomeView);
    fn add_marker(&mut self, marker: &ActiveMarker);
    fn remove_marker(&mut self, id: MarkerId);

    /// Show or hide the "add location" affordance.
    fn set_add_location_available(&mut self, available: bool);
}

/// The location-entry form.
pub trait FormState {
    fn set_lng_lat(&mut self, lng: f64, lat: f64);
}

/// One call made on a [`MapSurface`] or [`FormState`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RenderCommand {
    InstallSource { generation: u64, features: usize },
    UpdateSource { generation: u64, features: usize },
    SetFeatureHighlighted { node: NodeId, highlighted: bool },
    SetPointLayersVisible { visible: bool },
    SetCursor { cursor: Cursor },
    ShowPopup {
        feature_id: FeatureId,
        position: LngLat,
        close_button: bool,
    },
    EaseTo { target: ExpansionTarget },
    FlyTo { view: HomeView },
    AddMarker { marker: ActiveMarker },
    RemoveMarker { id: MarkerId },
    SetAddLocationAvailable { available: bool },
    SetLngLat { lng: f64, lat: f64 },
}
