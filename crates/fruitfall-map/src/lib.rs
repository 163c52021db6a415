//! Interactive cluster-map controller: hover highlighting, cluster expansion,
//! detail popups, marker placement and the lifecycle that gates them.

pub mod controller;
pub mod detail;
pub mod error;
pub mod events;
pub mod hover;
pub mod marker;
pub mod popup;
pub mod render;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use controller::{DetailRequest, Handlers, LifecycleState, MapLifecycleController, Mode};
pub use detail::{DetailClient, DetailSource, FeatureDetail};
pub use error::{DetailError, MapError};
pub use events::MapEvent;
pub use hover::HoverStateTracker;
pub use marker::{ActiveMarker, MarkerId, MarkerOrigin, MarkerSynchronizer};
pub use popup::{wrap_longitude_near, Popup, PopupController, PopupOutcome, Ticket};
pub use render::{Cursor, FormState, Layer, LoadStatus, MapSurface, RenderCommand};
pub use runtime::{event_channel, MapHandle, MapRuntime, RunReport};
