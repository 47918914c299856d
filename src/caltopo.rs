use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::position::Position;

const DEFAULT_BASE_URL: &str = "https://caltopo.com";

/// Client for CalTopo's position-report endpoint.
///
/// Reports are addressed anonymously; the endpoint takes no credentials.
#[derive(Clone)]
pub struct CalTopoClient {
    client: Client,
    base_url: String,
}

impl CalTopoClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Send one position report and return the response status.
    ///
    /// Status handling is left to the caller; only transport failures
    /// are errors here.
    pub async fn report_position(
        &self,
        group: &str,
        device_id: &str,
        position: &Position,
    ) -> Result<StatusCode> {
        debug!(
            "Reporting position {} for {}-{}",
            position, group, device_id
        );

        let url = format!("{}/api/v1/position/report/{}", self.base_url, group);
        let response = self
            .client
            .get(&url)
            .query(&[("id", device_id)])
            .query(&[
                ("lat", position.latitude),
                ("lng", position.longitude),
            ])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        Ok(response.status())
    }
}
