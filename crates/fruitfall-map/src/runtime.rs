//! The single event loop that owns the controller.
//!
//! Gestures and commands arrive over an mpsc channel. Detail fetches run as
//! spawned tasks whose results come back into the same loop, so all render
//! mutations stay on one task and in one order. An in-flight fetch is never
//! cancelled; a superseded result is dropped when it lands.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::controller::{DetailRequest, MapLifecycleController};
use crate::detail::{DetailSource, FeatureDetail};
use crate::error::{DetailError, MapError};
use crate::events::MapEvent;
use crate::popup::Ticket;
use crate::render::{FormState, MapSurface};

/// Sending half of the event channel, handed to gesture producers.
#[derive(Debug, Clone)]
pub struct MapHandle {
    tx: mpsc::Sender<MapEvent>,
}

impl MapHandle {
    /// # Errors
    ///
    /// Returns [`MapError::ChannelClosed`] once the event loop has stopped.
    pub async fn send(&self, event: MapEvent) -> Result<(), MapError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| MapError::ChannelClosed)
    }
}

/// Create the event channel feeding [`MapRuntime::run`].
#[must_use]
pub fn event_channel(capacity: usize) -> (MapHandle, mpsc::Receiver<MapEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (MapHandle { tx }, rx)
}

/// What happened during one run of the loop.
#[derive(Debug, Default)]
pub struct RunReport {
    pub events: usize,
    pub fetches: usize,
    /// Detail fetches that failed for the activation they belonged to.
    pub failures: Vec<MapError>,
}

pub struct MapRuntime<S, F, D> {
    controller: MapLifecycleController<S, F>,
    details: Arc<D>,
    poll_interval: Duration,
}

impl<S, F, D> MapRuntime<S, F, D>
where
    S: MapSurface,
    F: FormState,
    D: DetailSource,
{
    pub fn new(
        controller: MapLifecycleController<S, F>,
        details: Arc<D>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            controller,
            details,
            poll_interval,
        }
    }

    /// Drain `events` until every [`MapHandle`] is dropped and all started
    /// fetches have finished. Returns the controller for inspection.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<MapEvent>,
    ) -> (MapLifecycleController<S, F>, RunReport) {
        let mut report = RunReport::default();
        let mut fetches: JoinSet<(Ticket, Result<FeatureDetail, DetailError>)> = JoinSet::new();
        let mut load_poll = tokio::time::interval(self.poll_interval);
        load_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;

        while events_open || !fetches.is_empty() {
            let polling = !self.controller.is_ready();
            tokio::select! {
                biased;

                _ = load_poll.tick(), if polling => {
                    self.controller.poll_load();
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        report.events += 1;
                        if let Some(request) = self.controller.handle(event) {
                            report.fetches += 1;
                            self.spawn_fetch(&mut fetches, request);
                        }
                    }
                    None => {
                        tracing::debug!(in_flight = fetches.len(), "event channel closed");
                        events_open = false;
                    }
                },
                Some(joined) = fetches.join_next(), if !fetches.is_empty() => match joined {
                    Ok((ticket, result)) => {
                        if let Err(error) = self.controller.detail_loaded(ticket, result) {
                            report.failures.push(error);
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, "detail fetch task did not complete");
                    }
                },
            }
        }

        tracing::info!(
            events = report.events,
            fetches = report.fetches,
            failures = report.failures.len(),
            "map event loop stopped"
        );
        (self.controller, report)
    }

    fn spawn_fetch(
        &self,
        fetches: &mut JoinSet<(Ticket, Result<FeatureDetail, DetailError>)>,
        request: DetailRequest,
    ) {
        let details = Arc::clone(&self.details);
        let DetailRequest { ticket, feature_id } = request;
        tracing::debug!(%ticket, %feature_id, "starting detail fetch");
        fetches.spawn(async move { (ticket, details.fetch_detail(feature_id).await) });
    }
}
