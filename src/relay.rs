use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use reqwest::Client;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::caltopo::CalTopoClient;
use crate::config::RelayConfig;
use crate::mapshare::{FeedError, MapShareClient};
use crate::tracker::{PublishCheck, Tracker};

/// The polling driver: owns both HTTP clients and the tracker list,
/// and runs sequential fetch-then-publish rounds forever.
pub struct Relay {
    mapshare: MapShareClient,
    caltopo: CalTopoClient,
    trackers: Vec<Tracker>,
    interval: Duration,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Result<Self> {
        if config.trackers.is_empty() {
            bail!("no trackers configured");
        }

        let client = Client::builder().build().context("build HTTP client")?;
        let mapshare = MapShareClient::with_base_url(client.clone(), config.mapshare_base_url);
        let caltopo = CalTopoClient::with_base_url(client, config.caltopo_base_url);
        let trackers = config.trackers.into_iter().map(Tracker::from).collect();

        Ok(Self {
            mapshare,
            caltopo,
            trackers,
            interval: Duration::from_secs(config.interval_secs),
        })
    }

    pub fn trackers(&self) -> &[Tracker] {
        &self.trackers
    }

    /// Poll forever, sleeping the configured interval between full
    /// rounds. Returns cleanly on Ctrl-C.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Relaying {} tracker(s) every {}s",
            self.trackers.len(),
            self.interval.as_secs()
        );

        loop {
            info!("Starting location updates...");
            self.run_round().await?;
            info!("Finished updating locations. Sleeping...");

            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested; exiting");
                    return Ok(());
                }
            }
        }
    }

    /// One sequential pass over all trackers: fetch the feed, then
    /// publish if the position is newer than the last attempt.
    pub async fn run_round(&mut self) -> Result<()> {
        let Self {
            mapshare,
            caltopo,
            trackers,
            ..
        } = self;

        for tracker in trackers.iter_mut() {
            info!("Updating location for {}", tracker.display_name);
            update_position(mapshare, tracker).await?;
            publish_position(caltopo, tracker).await?;
        }

        Ok(())
    }
}

/// Fetch the feed for one tracker and fold the result into its state.
///
/// Decode failures and non-success feed statuses are logged and leave
/// the tracker untouched; transport failures propagate.
async fn update_position(mapshare: &MapShareClient, tracker: &mut Tracker) -> Result<()> {
    match mapshare.fetch_position(&tracker.mapshare_code).await {
        Ok(position) => {
            if tracker.apply_position(position, Utc::now()) {
                info!("Updated position for {} to {}", tracker.display_name, position);
            } else {
                info!(
                    "Position for {} has not changed since last request; skipping update",
                    tracker.display_name
                );
            }
            Ok(())
        }
        Err(FeedError::Status(status)) => {
            warn!(
                "MapShare feed for {} returned status {}",
                tracker.display_name, status
            );
            Ok(())
        }
        Err(err @ (FeedError::Kml(_) | FeedError::MissingElement(_))) => {
            error!(
                "Failed to decode MapShare feed for {}; position not updated: {}",
                tracker.display_name, err
            );
            Ok(())
        }
        Err(FeedError::Http(err)) => {
            Err(err).with_context(|| format!("fetch MapShare feed for {}", tracker.display_name))
        }
    }
}

/// Publish a tracker's position if it is newer than the last attempt.
///
/// The attempt timestamp advances on any response, so a non-2xx report
/// is not retried until the position changes again.
async fn publish_position(caltopo: &CalTopoClient, tracker: &mut Tracker) -> Result<()> {
    match tracker.publish_check() {
        PublishCheck::NoPosition => {
            warn!(
                "No position recorded yet for {}; skipping publish",
                tracker.display_name
            );
            return Ok(());
        }
        PublishCheck::NotChanged => {
            info!(
                "Position for {} has not been updated since last publish; skipping",
                tracker.display_name
            );
            return Ok(());
        }
        PublishCheck::Ready => {}
    }

    // Ready implies a stored position.
    let Some(position) = tracker.last_position().copied() else {
        return Ok(());
    };

    info!(
        "Posting position for {}-{} to CalTopo",
        tracker.group, tracker.device_id
    );
    let status = caltopo
        .report_position(&tracker.group, &tracker.device_id, &position)
        .await
        .with_context(|| format!("report position for {}", tracker.display_name))?;
    tracker.record_publish_attempt(Utc::now());

    if !status.is_success() {
        warn!("CalTopo returned status {}", status);
    }

    Ok(())
}
