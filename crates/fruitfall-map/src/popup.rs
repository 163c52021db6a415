//! Feature detail popups and last-activation-wins correlation of detail
//! fetches.

use fruitfall_core::{FeatureId, LngLat};
use serde::Serialize;

use crate::detail::FeatureDetail;
use crate::error::DetailError;

/// Correlates a detail fetch with the activation that started it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Ticket(pub u64);

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A popup ready to be shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub feature_id: FeatureId,
    /// Display position, on the world copy that was clicked.
    pub position: LngLat,
    pub detail: FeatureDetail,
    pub close_button: bool,
}

/// Result of feeding a completed fetch back in.
#[derive(Debug)]
pub enum PopupOutcome {
    Show(Popup),
    Failed {
        feature_id: FeatureId,
        error: DetailError,
    },
    /// A later activation (or a mode switch) replaced this one.
    Superseded,
}

#[derive(Debug, Clone, Copy)]
struct PendingDetailRequest {
    ticket: Ticket,
    feature_id: FeatureId,
    feature_position: LngLat,
    click_lng: f64,
}

#[derive(Debug, Default)]
pub struct PopupController {
    next_ticket: u64,
    pending: Option<PendingDetailRequest>,
}

impl PopupController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an activation for `feature_id`, clicked at `click_lng`.
    ///
    /// The returned ticket must accompany the fetch result to
    /// [`resolve`](Self::resolve). Any earlier activation is superseded.
    pub fn begin(
        &mut self,
        feature_id: FeatureId,
        feature_position: LngLat,
        click_lng: f64,
    ) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        if let Some(previous) = self.pending.replace(PendingDetailRequest {
            ticket,
            feature_id,
            feature_position,
            click_lng,
        }) {
            tracing::debug!(
                superseded = %previous.ticket,
                feature_id = %previous.feature_id,
                "detail request superseded by a newer activation"
            );
        }
        ticket
    }

    #[must_use]
    pub fn pending_ticket(&self) -> Option<Ticket> {
        self.pending.map(|p| p.ticket)
    }

    #[must_use]
    pub fn pending_feature(&self) -> Option<FeatureId> {
        self.pending.map(|p| p.feature_id)
    }

    /// Drop the pending activation; its result will be discarded.
    pub fn invalidate(&mut self) {
        if let Some(previous) = self.pending.take() {
            tracing::debug!(ticket = %previous.ticket, "pending detail request invalidated");
        }
    }

    pub fn resolve(
        &mut self,
        ticket: Ticket,
        result: Result<FeatureDetail, DetailError>,
    ) -> PopupOutcome {
        let Some(pending) = self.pending.filter(|p| p.ticket == ticket) else {
            tracing::debug!(%ticket, ok = result.is_ok(), "discarding stale detail response");
            return PopupOutcome::Superseded;
        };
        self.pending = None;

        match result {
            Ok(detail) => {
                let position = LngLat::new(
                    wrap_longitude_near(pending.feature_position.lng, pending.click_lng),
                    pending.feature_position.lat,
                );
                PopupOutcome::Show(Popup {
                    feature_id: pending.feature_id,
                    position,
                    detail,
                    close_button: false,
                })
            }
            Err(error) => PopupOutcome::Failed {
                feature_id: pending.feature_id,
                error,
            },
        }
    }
}

/// Shift `feature_lng` by whole turns so it lies within 180° of
/// `click_lng`.
///
/// A longitude already within 180° is returned unchanged. Non-finite inputs,
/// or a distance too large to represent, leave `feature_lng` as is.
#[must_use]
pub fn wrap_longitude_near(feature_lng: f64, click_lng: f64) -> f64 {
    let delta = click_lng - feature_lng;
    if !delta.is_finite() || delta.abs() <= 180.0 {
        return feature_lng;
    }
    let shifted = feature_lng + 360.0 * (delta / 360.0).round();
    if shifted.is_finite() {
        shifted
    } else {
        feature_lng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(fruit: &str) -> FeatureDetail {
        let mut properties = fruitfall_core::Properties::new();
        properties.insert("fruit".to_owned(), fruit.into());
        FeatureDetail { properties }
    }

    fn not_found() -> DetailError {
        DetailError::UnexpectedStatus {
            status: 404,
            url: "http://localhost/api/features/1".to_owned(),
        }
    }

    #[test]
    fn antimeridian_click_lands_on_clicked_copy() {
        let lng = wrap_longitude_near(-179.9, 179.9);
        assert!((lng - 180.1).abs() < 1e-9, "got {lng}");
    }

    #[test]
    fn wraps_across_several_world_copies() {
        let lng = wrap_longitude_near(10.0, 10.0 + 3.0 * 360.0 + 5.0);
        assert!((lng - 1090.0).abs() < 1e-9, "got {lng}");
        assert!((wrap_longitude_near(10.0, -700.0) - (-710.0)).abs() < 1e-9);
        assert!((wrap_longitude_near(45.0, 50.0) - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn huge_click_longitude_returns_promptly() {
        let lng = wrap_longitude_near(10.0, 1e300);
        assert!(lng.is_finite());
        assert!((wrap_longitude_near(-f64::MAX, f64::MAX) + f64::MAX).abs() < f64::EPSILON);
    }

    #[test]
    fn half_turn_boundary_is_not_shifted() {
        assert!((wrap_longitude_near(-90.0, 90.0) + 90.0).abs() < f64::EPSILON);
        assert!((wrap_longitude_near(90.0, -90.0) - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_click_leaves_longitude_alone() {
        assert!((wrap_longitude_near(12.0, f64::NAN) - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn success_shows_popup_at_wrapped_position() {
        let mut popups = PopupController::new();
        let ticket = popups.begin(FeatureId(1), LngLat::new(-179.9, 10.0), 179.9);

        let PopupOutcome::Show(popup) = popups.resolve(ticket, Ok(detail("fig"))) else {
            panic!("expected popup");
        };
        assert_eq!(popup.feature_id, FeatureId(1));
        assert!((popup.position.lng - 180.1).abs() < 1e-9);
        assert!((popup.position.lat - 10.0).abs() < f64::EPSILON);
        assert_eq!(popup.detail, detail("fig"));
        assert!(!popup.close_button);
        assert_eq!(popups.pending_ticket(), None);
    }

    #[test]
    fn late_response_for_earlier_activation_is_discarded() {
        let mut popups = PopupController::new();
        let a = popups.begin(FeatureId(1), LngLat::new(0.0, 0.0), 0.0);
        let b = popups.begin(FeatureId(2), LngLat::new(1.0, 1.0), 1.0);

        // B still pending when A arrives.
        assert!(matches!(
            popups.resolve(a, Ok(detail("apple"))),
            PopupOutcome::Superseded
        ));
        assert_eq!(popups.pending_ticket(), Some(b));

        let PopupOutcome::Show(popup) = popups.resolve(b, Ok(detail("plum"))) else {
            panic!("expected popup for B");
        };
        assert_eq!(popup.feature_id, FeatureId(2));
    }

    #[test]
    fn response_for_earlier_activation_after_later_one_is_discarded() {
        let mut popups = PopupController::new();
        let a = popups.begin(FeatureId(1), LngLat::new(0.0, 0.0), 0.0);
        let b = popups.begin(FeatureId(2), LngLat::new(1.0, 1.0), 1.0);

        assert!(matches!(
            popups.resolve(b, Ok(detail("plum"))),
            PopupOutcome::Show(_)
        ));
        assert!(matches!(
            popups.resolve(a, Ok(detail("apple"))),
            PopupOutcome::Superseded
        ));
    }

    #[test]
    fn failure_is_reported_for_current_activation() {
        let mut popups = PopupController::new();
        let ticket = popups.begin(FeatureId(1), LngLat::new(0.0, 0.0), 0.0);
        match popups.resolve(ticket, Err(not_found())) {
            PopupOutcome::Failed { feature_id, error } => {
                assert_eq!(feature_id, FeatureId(1));
                assert!(matches!(error, DetailError::UnexpectedStatus { status: 404, .. }));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn superseded_failure_is_not_reported() {
        let mut popups = PopupController::new();
        let a = popups.begin(FeatureId(1), LngLat::new(0.0, 0.0), 0.0);
        popups.begin(FeatureId(2), LngLat::new(0.0, 0.0), 0.0);
        assert!(matches!(
            popups.resolve(a, Err(not_found())),
            PopupOutcome::Superseded
        ));
    }

    #[test]
    fn invalidate_discards_pending_result() {
        let mut popups = PopupController::new();
        let ticket = popups.begin(FeatureId(1), LngLat::new(0.0, 0.0), 0.0);
        popups.invalidate();
        assert!(matches!(
            popups.resolve(ticket, Ok(detail("apple"))),
            PopupOutcome::Superseded
        ));
    }
}
