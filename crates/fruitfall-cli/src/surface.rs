//! A render surface that prints every command as one JSON line on stdout.

use fruitfall_cluster::{ClusterDataSource, ExpansionTarget, NodeId};
use fruitfall_core::HomeView;
use fruitfall_map::{
    ActiveMarker, Cursor, FormState, LoadStatus, MapSurface, MarkerId, Popup, RenderCommand,
};
use serde::Serialize;

#[derive(Serialize)]
struct ShowPopupLine<'a> {
    command: &'static str,
    popup: &'a Popup,
}

#[derive(Debug, Default)]
pub(crate) struct StdoutSurface;

impl StdoutSurface {
    fn print<T: Serialize + ?Sized>(value: &T) {
        match serde_json::to_string(value) {
            Ok(line) => println!("{line}"),
            Err(error) => tracing::warn!(%error, "failed to serialize render command"),
        }
    }
}

impl MapSurface for StdoutSurface {
    fn load_status(&self) -> LoadStatus {
        LoadStatus::READY
    }

    fn install_source(&mut self, source: &ClusterDataSource) {
        Self::print(&RenderCommand::InstallSource {
            generation: source.generation(),
            features: source.features().len(),
        });
    }

    fn update_source(&mut self, source: &ClusterDataSource) {
        Self::print(&RenderCommand::UpdateSource {
            generation: source.generation(),
            features: source.features().len(),
        });
    }

    fn set_feature_highlighted(&mut self, node: NodeId, highlighted: bool) {
        Self::print(&RenderCommand::SetFeatureHighlighted { node, highlighted });
    }

    fn set_point_layers_visible(&mut self, visible: bool) {
        Self::print(&RenderCommand::SetPointLayersVisible { visible });
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        Self::print(&RenderCommand::SetCursor { cursor });
    }

    fn show_popup(&mut self, popup: Popup) {
        // Printed whole so the fetched detail is visible.
        Self::print(&ShowPopupLine {
            command: "show_popup",
            popup: &popup,
        });
    }

    fn ease_to(&mut self, target: ExpansionTarget) {
        Self::print(&RenderCommand::EaseTo { target });
    }

    fn fly_to(&mut self, view: HomeView) {
        Self::print(&RenderCommand::FlyTo { view });
    }

    fn add_marker(&mut self, marker: &ActiveMarker) {
        Self::print(&RenderCommand::AddMarker { marker: *marker });
    }

    fn remove_marker(&mut self, id: MarkerId) {
        Self::print(&RenderCommand::RemoveMarker { id });
    }

    fn set_add_location_available(&mut self, available: bool) {
        Self::print(&RenderCommand::SetAddLocationAvailable { available });
    }
}

impl FormState for StdoutSurface {
    fn set_lng_lat(&mut self, lng: f64, lat: f64) {
        Self::print(&RenderCommand::SetLngLat { lng, lat });
    }
}
