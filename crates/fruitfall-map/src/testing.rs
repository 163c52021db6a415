//! In-memory render and form collaborators for unit tests.

use std::cell::Cell;

use fruitfall_cluster::{ClusterDataSource, ExpansionTarget, NodeId};
use fruitfall_core::HomeView;

use crate::marker::{ActiveMarker, MarkerId};
use crate::popup::Popup;
use crate::render::{Cursor, FormState, LoadStatus, MapSurface, RenderCommand};

/// A surface that renders nothing and records every call it receives.
#[derive(Debug, Default)]
pub(crate) struct RecordingSurface {
    pub load_status: LoadStatus,
    /// Load checks still to answer "loading" before `load_status` applies.
    pub loading_polls: Cell<u32>,
    pub commands: Vec<RenderCommand>,
    /// Popups in the order they were shown, detail payload included.
    pub popups: Vec<Popup>,
}

impl RecordingSurface {
    /// A surface that reports itself fully loaded.
    #[must_use]
    pub(crate) fn ready() -> Self {
        Self {
            load_status: LoadStatus::READY,
            ..Self::default()
        }
    }

    /// A surface that reports loading for the first `polls` checks.
    #[must_use]
    pub(crate) fn ready_after(polls: u32) -> Self {
        Self {
            loading_polls: Cell::new(polls),
            ..Self::ready()
        }
    }

    /// Drain recorded commands.
    pub(crate) fn take_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    fn record(&mut self, command: RenderCommand) {
        tracing::trace!(?command, "render command");
        self.commands.push(command);
    }
}

impl MapSurface for RecordingSurface {
    fn load_status(&self) -> LoadStatus {
        let remaining = self.loading_polls.get();
        if remaining > 0 {
            self.loading_polls.set(remaining - 1);
            return LoadStatus::default();
        }
        self.load_status
    }

    fn install_source(&mut self, source: &ClusterDataSource) {
        self.record(RenderCommand::InstallSource {
            generation: source.generation(),
            features: source.features().len(),
        });
    }

    fn update_source(&mut self, source: &ClusterDataSource) {
        self.record(RenderCommand::UpdateSource {
            generation: source.generation(),
            features: source.features().len(),
        });
    }

    fn set_feature_highlighted(&mut self, node: NodeId, highlighted: bool) {
        self.record(RenderCommand::SetFeatureHighlighted { node, highlighted });
    }

    fn set_point_layers_visible(&mut self, visible: bool) {
        self.record(RenderCommand::SetPointLayersVisible { visible });
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.record(RenderCommand::SetCursor { cursor });
    }

    fn show_popup(&mut self, popup: Popup) {
        self.record(RenderCommand::ShowPopup {
            feature_id: popup.feature_id,
            position: popup.position,
            close_button: popup.close_button,
        });
        self.popups.push(popup);
    }

    fn ease_to(&mut self, target: ExpansionTarget) {
        self.record(RenderCommand::EaseTo { target });
    }

    fn fly_to(&mut self, view: HomeView) {
        self.record(RenderCommand::FlyTo { view });
    }

    fn add_marker(&mut self, marker: &ActiveMarker) {
        self.record(RenderCommand::AddMarker { marker: *marker });
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.record(RenderCommand::RemoveMarker { id });
    }

    fn set_add_location_available(&mut self, available: bool) {
        self.record(RenderCommand::SetAddLocationAvailable { available });
    }
}

impl FormState for RecordingSurface {
    fn set_lng_lat(&mut self, lng: f64, lat: f64) {
        self.record(RenderCommand::SetLngLat { lng, lat });
    }
}
