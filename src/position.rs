use serde::{Deserialize, Serialize};

/// A device's last reported location in decimal degrees.
///
/// Equality is structural on both fields; the feed-side dedup in
/// [`crate::tracker::Tracker::apply_position`] relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}
