//! The single user-placed marker and its link to the location form.

use fruitfall_core::LngLat;
use serde::{Deserialize, Serialize};

use crate::render::{FormState, MapSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub u64);

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a marker came to be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerOrigin {
    /// A geocoding search result.
    Search,
    /// A map click in placement mode.
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActiveMarker {
    pub id: MarkerId,
    pub position: LngLat,
    pub origin: MarkerOrigin,
    pub draggable: bool,
}

/// Keeps at most one marker on the map and mirrors its position into the
/// form.
#[derive(Debug, Default)]
pub struct MarkerSynchronizer {
    active: Option<ActiveMarker>,
    next_id: u64,
}

impl MarkerSynchronizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active(&self) -> Option<&ActiveMarker> {
        self.active.as_ref()
    }

    /// Replace any existing marker with a new one at `position` and commit
    /// the position to the form.
    pub fn place_marker<S, F>(
        &mut self,
        position: LngLat,
        origin: MarkerOrigin,
        surface: &mut S,
        form: &mut F,
    ) -> MarkerId
    where
        S: MapSurface + ?Sized,
        F: FormState + ?Sized,
    {
        self.remove_active_marker(surface);

        self.next_id += 1;
        let marker = ActiveMarker {
            id: MarkerId(self.next_id),
            position,
            origin,
            draggable: true,
        };
        surface.add_marker(&marker);
        form.set_lng_lat(position.lng, position.lat);
        tracing::debug!(marker = %marker.id, ?origin, %position, "marker placed");

        self.active = Some(marker);
        marker.id
    }

    /// Remove the active marker, if any. Returns the removed marker.
    pub fn remove_active_marker<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
    ) -> Option<ActiveMarker> {
        let marker = self.active.take()?;
        surface.remove_marker(marker.id);
        Some(marker)
    }

    /// Whether `id` is the marker currently on the map.
    #[must_use]
    pub fn is_active(&self, id: MarkerId) -> bool {
        self.active.is_some_and(|m| m.id == id)
    }

    /// The active marker was dropped at `position`. Commits the new position
    /// to the form; drags of a marker that has since been replaced are
    /// ignored.
    pub fn drag_ended<F: FormState + ?Sized>(
        &mut self,
        id: MarkerId,
        position: LngLat,
        form: &mut F,
    ) -> bool {
        match self.active.as_mut() {
            Some(marker) if marker.id == id => {
                marker.position = position;
                form.set_lng_lat(position.lng, position.lat);
                true
            }
            _ => {
                tracing::debug!(marker = %id, "drag end ignored: marker is not active");
                false
            }
        }
    }
}
