//! MapShare relay - polls Garmin inReach MapShare feeds and republishes
//! device positions to CalTopo.
//!
//! The library exposes the feed client, the publish client, and the
//! per-tracker state machine so the binary stays a thin driver.

pub mod caltopo;
pub mod config;
pub mod log_format;
pub mod mapshare;
pub mod position;
pub mod relay;
pub mod tracker;

pub use caltopo::CalTopoClient;
pub use config::{RelayConfig, TrackerConfig};
pub use mapshare::{FeedError, MapShareClient, parse_feed_position};
pub use position::Position;
pub use relay::Relay;
pub use tracker::{PublishCheck, Tracker};
