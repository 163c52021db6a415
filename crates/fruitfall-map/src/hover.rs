//! Single-slot hover highlighting shared by the cluster and point layers.

use fruitfall_cluster::NodeId;

use crate::render::{Layer, MapSurface};

/// Tracks the one node currently highlighted, whichever layer it is on.
///
/// A new node is only ever highlighted after the previous one has been
/// cleared on the surface.
#[derive(Debug, Default)]
pub struct HoverStateTracker {
    active: Option<NodeId>,
}

impl HoverStateTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    /// Highlight `node`, clearing whatever was highlighted before.
    pub fn set_hover<S: MapSurface + ?Sized>(&mut self, node: NodeId, surface: &mut S) {
        if self.active == Some(node) {
            return;
        }
        self.clear_hover(surface);
        surface.set_feature_highlighted(node, true);
        self.active = Some(node);
    }

    pub fn clear_hover<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        if let Some(previous) = self.active.take() {
            surface.set_feature_highlighted(previous, false);
        }
    }

    /// Pointer left `layer`. Clears only if the highlighted node is on that
    /// layer; returns whether anything was cleared.
    pub fn leave_layer<S: MapSurface + ?Sized>(&mut self, layer: Layer, surface: &mut S) -> bool {
        match self.active {
            Some(node) if Layer::of(node) == layer => {
                self.clear_hover(surface);
                true
            }
            Some(node) => {
                tracing::debug!(%node, ?layer, "hover leave ignored: node is on another layer");
                false
            }
            None => false,
        }
    }

    /// Keep the highlight only if `still_exists` accepts the active node.
    pub fn retain_if<S, F>(&mut self, still_exists: F, surface: &mut S)
    where
        S: MapSurface + ?Sized,
        F: FnOnce(NodeId) -> bool,
    {
        if let Some(node) = self.active {
            if !still_exists(node) {
                tracing::debug!(%node, "hovered node no longer exists");
                self.clear_hover(surface);
            }
        }
    }
}
