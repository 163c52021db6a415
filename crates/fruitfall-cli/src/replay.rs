//! Commands that talk to the Detail API and drive the full event loop.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use fruitfall_core::FeatureId;
use fruitfall_map::{event_channel, DetailClient, MapEvent, MapLifecycleController, MapRuntime};

use crate::cluster::read_collection;
use crate::surface::StdoutSurface;

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub(crate) async fn run_detail(id: u64) -> anyhow::Result<()> {
    let config = fruitfall_core::load_app_config()?;
    let client = DetailClient::from_config(&config)
        .map_err(|e| anyhow::anyhow!("failed to build detail client: {e}"))?;
    let detail = client.get_feature_detail(FeatureId(id)).await?;
    println!("{}", serde_json::to_string_pretty(&detail)?);
    Ok(())
}

pub(crate) fn parse_events(text: &str) -> anyhow::Result<Vec<MapEvent>> {
    serde_json::from_str(text).map_err(|e| anyhow::anyhow!("invalid event script: {e}"))
}

pub(crate) async fn run_replay(geojson: &Path, events_path: &Path) -> anyhow::Result<()> {
    let config = fruitfall_core::load_app_config()?;
    tracing::debug!(?config, "loaded config");

    let collection = read_collection(geojson)?;
    let script = std::fs::read_to_string(events_path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", events_path.display()))?;
    let events = parse_events(&script)?;

    let mut controller =
        MapLifecycleController::from_config(&config, StdoutSurface, StdoutSurface)?;
    controller.set_collection(collection);

    let details = Arc::new(
        DetailClient::from_config(&config)
            .map_err(|e| anyhow::anyhow!("failed to build detail client: {e}"))?,
    );
    let runtime = MapRuntime::new(
        controller,
        details,
        Duration::from_millis(config.load_poll_interval_ms),
    );

    let (handle, rx) = event_channel(EVENT_CHANNEL_CAPACITY);
    let feed = async move {
        for event in events {
            handle.send(event).await?;
        }
        Ok::<_, fruitfall_map::MapError>(())
    };
    let ((controller, report), fed) = tokio::join!(runtime.run(rx), feed);
    fed?;

    tracing::info!(
        state = ?controller.state(),
        events = report.events,
        fetches = report.fetches,
        "replay finished"
    );
    if !report.failures.is_empty() {
        for failure in &report.failures {
            tracing::error!(%failure, "detail fetch failed");
        }
        anyhow::bail!(
            "replay finished with {} failed detail fetch(es)",
            report.failures.len()
        );
    }
    Ok(())
}
