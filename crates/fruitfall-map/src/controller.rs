//! Top-level map state machine.
//!
//! `Uninitialized -> Loading -> Ready`, with `Ready` split into `Browse` and
//! `Placement`. Gesture handlers are attached only once the map reports it
//! has fully loaded, and which set is attached follows the sub-mode.

use fruitfall_cluster::{ClusterDataSource, ClusterError, ClusterId, ClusterOptions, IngestReport};
use fruitfall_core::{AppConfig, FeatureCollection, FeatureId, HomeView, LngLat};

use crate::detail::FeatureDetail;
use crate::error::{DetailError, MapError};
use crate::events::MapEvent;
use crate::hover::HoverStateTracker;
use crate::marker::{MarkerId, MarkerOrigin, MarkerSynchronizer};
use crate::popup::{PopupController, PopupOutcome, Ticket};
use crate::render::{Cursor, FormState, Layer, MapSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Loading,
    Ready(Mode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Clusters and points visible; hover and click-to-inspect active.
    Browse,
    /// Points hidden; map clicks place the marker.
    Placement,
}

/// Which gesture handlers are currently bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Handlers {
    #[default]
    Detached,
    Browse,
    Placement,
}

/// A detail fetch the caller must run and feed back through
/// [`MapLifecycleController::detail_loaded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailRequest {
    pub ticket: Ticket,
    pub feature_id: FeatureId,
}

/// Owns the data source, the interaction trackers and the render and form
/// collaborators. Every mutation of render state happens through here.
#[derive(Debug)]
pub struct MapLifecycleController<S, F> {
    state: LifecycleState,
    handlers: Handlers,
    source: ClusterDataSource,
    hover: HoverStateTracker,
    popups: PopupController,
    markers: MarkerSynchronizer,
    home_view: HomeView,
    surface: S,
    form: F,
}

impl<S: MapSurface, F: FormState> MapLifecycleController<S, F> {
    /// Create the controller; it starts out `Loading`.
    pub fn new(source: ClusterDataSource, home_view: HomeView, surface: S, form: F) -> Self {
        let mut controller = Self {
            state: LifecycleState::Uninitialized,
            handlers: Handlers::Detached,
            source,
            hover: HoverStateTracker::new(),
            popups: PopupController::new(),
            markers: MarkerSynchronizer::new(),
            home_view,
            surface,
            form,
        };
        controller.transition(LifecycleState::Loading);
        controller
    }

    /// Build with clustering and home view taken from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidOptions`] if the configured cluster
    /// parameters are out of range.
    pub fn from_config(config: &AppConfig, surface: S, form: F) -> Result<Self, ClusterError> {
        let options = ClusterOptions::with_max_zoom_and_radius(
            config.cluster_max_zoom,
            f64::from(config.cluster_radius),
        );
        let source = ClusterDataSource::new(options)?;
        Ok(Self::new(source, config.home_view, surface, form))
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, LifecycleState::Ready(_))
    }

    #[must_use]
    pub fn mode(&self) -> Option<Mode> {
        match self.state {
            LifecycleState::Ready(mode) => Some(mode),
            _ => None,
        }
    }

    #[must_use]
    pub fn handlers(&self) -> Handlers {
        self.handlers
    }

    #[must_use]
    pub fn source(&self) -> &ClusterDataSource {
        &self.source
    }

    #[must_use]
    pub fn hover(&self) -> &HoverStateTracker {
        &self.hover
    }

    #[must_use]
    pub fn markers(&self) -> &MarkerSynchronizer {
        &self.markers
    }

    #[must_use]
    pub fn pending_detail(&self) -> Option<Ticket> {
        self.popups.pending_ticket()
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[must_use]
    pub fn form(&self) -> &F {
        &self.form
    }

    pub fn into_parts(self) -> (S, F) {
        (self.surface, self.form)
    }

    pub fn attach_browse_handlers(&mut self) {
        self.handlers = Handlers::Browse;
    }

    pub fn attach_placement_handlers(&mut self) {
        self.handlers = Handlers::Placement;
    }

    pub fn detach_all(&mut self) {
        self.handlers = Handlers::Detached;
    }

    fn transition(&mut self, next: LifecycleState) {
        tracing::info!(from = ?self.state, to = ?next, "map lifecycle transition");
        self.state = next;
    }

    /// Check whether the map has finished loading. Moves `Loading` to
    /// `Ready(Browse)` once the style has loaded and no load work is pending.
    /// Returns whether the controller is ready.
    pub fn poll_load(&mut self) -> bool {
        if self.state != LifecycleState::Loading {
            return self.is_ready();
        }
        let status = self.surface.load_status();
        if !status.is_ready() {
            tracing::debug!(
                style_loaded = status.style_loaded,
                idle = status.idle,
                "map still loading"
            );
            return false;
        }

        self.surface.install_source(&self.source);
        self.attach_browse_handlers();
        self.surface.set_add_location_available(true);
        self.transition(LifecycleState::Ready(Mode::Browse));
        true
    }

    /// Install or replace the feature collection. Accepted in any state;
    /// the render layer sees it once the map is ready.
    pub fn set_collection(&mut self, collection: FeatureCollection) -> IngestReport {
        let report = self.source.set_collection(collection);
        if self.is_ready() {
            self.surface.update_source(&self.source);
        }
        let source = &self.source;
        self.hover
            .retain_if(|node| source.contains(node), &mut self.surface);
        if let Some(feature_id) = self.popups.pending_feature() {
            if source.feature(feature_id).is_none() {
                tracing::debug!(%feature_id, "pending popup dropped: feature left the collection");
                self.popups.invalidate();
            }
        }
        report
    }

    /// Dispatch one event. Returns a detail fetch to start, if the event
    /// activated a point.
    pub fn handle(&mut self, event: MapEvent) -> Option<DetailRequest> {
        if let MapEvent::SetCollection { collection } = event {
            self.set_collection(collection);
            return None;
        }
        if !self.is_ready() {
            tracing::debug!(?event, "event ignored: map not ready");
            return None;
        }

        match event {
            MapEvent::ClusterClicked { cluster_id } => {
                if self.expect_handlers(Handlers::Browse, "cluster click") {
                    self.on_cluster_clicked(cluster_id);
                }
                None
            }
            MapEvent::PointClicked { feature_id, click } => {
                if self.expect_handlers(Handlers::Browse, "point click") {
                    self.on_point_activated(feature_id, click.lng)
                } else {
                    None
                }
            }
            MapEvent::HoverMoved { node } => {
                if self.expect_handlers(Handlers::Browse, "hover") {
                    if self.source.contains(node) {
                        self.surface.set_cursor(Cursor::Pointer);
                        self.hover.set_hover(node, &mut self.surface);
                    } else {
                        tracing::debug!(%node, "hover ignored: node not in current source");
                    }
                }
                None
            }
            MapEvent::HoverLeft { layer } => {
                if self.expect_handlers(Handlers::Browse, "hover leave") {
                    self.on_hover_left(layer);
                }
                None
            }
            MapEvent::MapClicked { position } => {
                // Browse mode has no plain map click handler.
                if self.handlers == Handlers::Placement {
                    self.place_marker(position, MarkerOrigin::Click);
                }
                None
            }
            MapEvent::MarkerDragStarted { marker } => {
                self.on_drag_started(marker);
                None
            }
            MapEvent::MarkerDragEnded { marker, position } => {
                self.on_drag_ended(marker, position);
                None
            }
            MapEvent::SearchResult { center } => {
                self.place_marker(LngLat::from_array(center), MarkerOrigin::Search);
                None
            }
            MapEvent::ToggleAddLocation => {
                self.toggle_add_location();
                None
            }
            MapEvent::SetCollection { .. } => None,
        }
    }

    fn expect_handlers(&self, wanted: Handlers, what: &str) -> bool {
        if self.handlers == wanted {
            return true;
        }
        tracing::debug!(handlers = ?self.handlers, "{what} ignored: handler not attached");
        false
    }

    fn on_cluster_clicked(&mut self, cluster_id: ClusterId) {
        if let Some(target) = self.source.expand_cluster(cluster_id) {
            tracing::debug!(%cluster_id, zoom = target.zoom, "expanding cluster");
            self.surface.ease_to(target);
        }
    }

    fn on_point_activated(&mut self, feature_id: FeatureId, click_lng: f64) -> Option<DetailRequest> {
        let Some(feature) = self.source.feature(feature_id) else {
            tracing::debug!(%feature_id, "point click ignored: feature not in current source");
            return None;
        };
        let ticket = self.popups.begin(feature_id, feature.position, click_lng);
        Some(DetailRequest { ticket, feature_id })
    }

    fn on_hover_left(&mut self, layer: Layer) {
        let other_layer_hovered = self
            .hover
            .active()
            .is_some_and(|node| Layer::of(node) != layer);
        self.hover.leave_layer(layer, &mut self.surface);
        if !other_layer_hovered {
            self.surface.set_cursor(Cursor::Default);
        }
    }

    fn on_drag_started(&mut self, marker: MarkerId) {
        if !self.markers.is_active(marker) {
            tracing::debug!(%marker, "drag start ignored: marker is not active");
            return;
        }
        if self.mode() == Some(Mode::Placement) {
            self.surface.set_cursor(Cursor::Default);
        }
    }

    fn on_drag_ended(&mut self, marker: MarkerId, position: LngLat) {
        if !position.is_finite() {
            tracing::warn!(%marker, "drag end ignored: non-finite position");
            return;
        }
        if self.markers.drag_ended(marker, position, &mut self.form)
            && self.mode() == Some(Mode::Placement)
        {
            self.surface.set_cursor(Cursor::Crosshair);
        }
    }

    fn place_marker(&mut self, position: LngLat, origin: MarkerOrigin) {
        if !position.is_finite() {
            tracing::warn!(?origin, "marker placement ignored: non-finite position");
            return;
        }
        self.markers
            .place_marker(position, origin, &mut self.surface, &mut self.form);
    }

    /// Switch between browsing clusters and placing a new location.
    pub fn toggle_add_location(&mut self) {
        let Some(mode) = self.mode() else {
            tracing::debug!(state = ?self.state, "add-location toggle ignored: map not ready");
            return;
        };

        self.detach_all();
        self.surface.fly_to(self.home_view);
        match mode {
            Mode::Browse => {
                self.popups.invalidate();
                self.hover.clear_hover(&mut self.surface);
                self.surface.set_point_layers_visible(false);
                self.surface.set_cursor(Cursor::Crosshair);
                self.surface.set_add_location_available(false);
                self.attach_placement_handlers();
                self.transition(LifecycleState::Ready(Mode::Placement));
            }
            Mode::Placement => {
                self.markers.remove_active_marker(&mut self.surface);
                self.surface.set_point_layers_visible(true);
                self.surface.set_cursor(Cursor::Default);
                self.surface.set_add_location_available(true);
                self.attach_browse_handlers();
                self.transition(LifecycleState::Ready(Mode::Browse));
            }
        }
    }

    /// Feed back the result of a fetch started by [`handle`](Self::handle).
    ///
    /// Results for superseded activations are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::Detail`] when the fetch for the current activation
    /// failed; no popup is shown.
    pub fn detail_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<FeatureDetail, DetailError>,
    ) -> Result<(), MapError> {
        match self.popups.resolve(ticket, result) {
            PopupOutcome::Show(popup) => {
                tracing::debug!(feature_id = %popup.feature_id, position = %popup.position, "showing popup");
                self.surface.show_popup(popup);
                Ok(())
            }
            PopupOutcome::Failed { feature_id, error } => {
                tracing::warn!(%feature_id, %error, "feature detail fetch failed");
                Err(MapError::Detail {
                    feature_id,
                    source: error,
                })
            }
            PopupOutcome::Superseded => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
