use std::time::Duration;

use kml::Kml;
use kml::types::Geometry;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::position::Position;

const DEFAULT_BASE_URL: &str = "https://inreach.garmin.com";

/// Why a feed round produced no position.
///
/// `Kml` and `MissingElement` are decode failures: the round logs them
/// and leaves the tracker untouched. `Status` is a non-success response
/// from the feed. `Http` is a transport failure and is treated as fatal
/// by the caller.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("feed returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed KML: {0}")]
    Kml(#[from] kml::Error),
    #[error("KML missing expected {0} element")]
    MissingElement(&'static str),
}

/// Client for the Garmin inReach MapShare KML feed.
#[derive(Clone)]
pub struct MapShareClient {
    client: Client,
    base_url: String,
}

impl MapShareClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetch the feed for one share code and extract its single
    /// coordinate pair.
    pub async fn fetch_position(&self, mapshare_code: &str) -> Result<Position, FeedError> {
        debug!("Fetching MapShare feed for share code {}", mapshare_code);

        let url = format!("{}/feed/share/{}", self.base_url, mapshare_code);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status));
        }

        let body = response.text().await?;
        parse_feed_position(&body)
    }
}

/// Extract the one placemark position a MapShare feed carries.
///
/// The expected document shape is Document > Folder > Placemark > Point.
/// KML orders coordinates longitude,latitude[,altitude]; the result is
/// swapped to latitude/longitude and altitude is discarded.
pub fn parse_feed_position(kml_str: &str) -> Result<Position, FeedError> {
    let root: Kml = kml_str.parse()?;

    let document = match &root {
        Kml::KmlDocument(doc) => doc
            .elements
            .iter()
            .find_map(|element| match element {
                Kml::Document { elements, .. } => Some(elements),
                _ => None,
            })
            .ok_or(FeedError::MissingElement("Document"))?,
        Kml::Document { elements, .. } => elements,
        _ => return Err(FeedError::MissingElement("Document")),
    };

    let folder = document
        .iter()
        .find_map(|element| match element {
            Kml::Folder(folder) => Some(&folder.elements),
            _ => None,
        })
        .ok_or(FeedError::MissingElement("Folder"))?;

    let placemark = folder
        .iter()
        .find_map(|element| match element {
            Kml::Placemark(placemark) => Some(placemark),
            _ => None,
        })
        .ok_or(FeedError::MissingElement("Placemark"))?;

    let point = match placemark.geometry.as_ref() {
        Some(Geometry::Point(point)) => point,
        _ => return Err(FeedError::MissingElement("Point")),
    };

    Ok(Position {
        latitude: point.coord.y,
        longitude: point.coord.x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn garmin_feed(coordinates: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Folder>
      <name>Amanda Mercer</name>
      <Placemark>
        <name>Amanda Mercer</name>
        <Point>
          <coordinates>{coordinates}</coordinates>
        </Point>
      </Placemark>
    </Folder>
  </Document>
</kml>"#
        )
    }

    #[test]
    fn parses_and_swaps_coordinate_order() {
        let position = parse_feed_position(&garmin_feed("-105.1,39.5,1600.0")).unwrap();
        assert_eq!(position.latitude, 39.5);
        assert_eq!(position.longitude, -105.1);
    }

    #[test]
    fn altitude_is_optional() {
        let position = parse_feed_position(&garmin_feed("-105.1,39.5")).unwrap();
        assert_eq!(position.latitude, 39.5);
        assert_eq!(position.longitude, -105.1);
    }

    #[test]
    fn rejects_garbage_body() {
        assert!(parse_feed_position("this is not a kml document").is_err());
    }

    #[test]
    fn rejects_truncated_coordinate() {
        assert!(parse_feed_position(&garmin_feed("-105.1")).is_err());
    }

    #[test]
    fn rejects_missing_folder() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>No folder here</name>
  </Document>
</kml>"#;
        assert!(matches!(
            parse_feed_position(body),
            Err(FeedError::MissingElement("Folder"))
        ));
    }

    #[test]
    fn rejects_placemark_without_point() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Folder>
      <Placemark>
        <name>No geometry</name>
      </Placemark>
    </Folder>
  </Document>
</kml>"#;
        assert!(matches!(
            parse_feed_position(body),
            Err(FeedError::MissingElement("Point"))
        ));
    }

    #[test]
    fn error_messages_name_the_missing_element() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>No folder here</name>
  </Document>
</kml>"#;
        let err = parse_feed_position(body).unwrap_err();
        assert!(err.to_string().contains("Folder"));
    }
}
