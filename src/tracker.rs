use chrono::{DateTime, Utc};

use crate::config::TrackerConfig;
use crate::position::Position;

/// Outcome of the publish-side freshness gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishCheck {
    /// No position has been recorded since startup.
    NoPosition,
    /// Nothing new since the last publish attempt.
    NotChanged,
    /// A position newer than the last publish attempt is available.
    Ready,
}

/// Mutable per-device state: destination identifiers, the share code for
/// the upstream feed, and the last position with its two timestamps.
///
/// One `Tracker` is built per configured device at startup and lives for
/// the whole process; each polling round mutates it in place.
#[derive(Debug, Clone)]
pub struct Tracker {
    pub group: String,
    pub device_id: String,
    pub display_name: String,
    pub mapshare_code: String,
    last_position: Option<Position>,
    position_updated_at: Option<DateTime<Utc>>,
    last_published_at: Option<DateTime<Utc>>,
}

impl Tracker {
    pub fn new(
        group: impl Into<String>,
        device_id: impl Into<String>,
        display_name: impl Into<String>,
        mapshare_code: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            device_id: device_id.into(),
            display_name: display_name.into(),
            mapshare_code: mapshare_code.into(),
            last_position: None,
            position_updated_at: None,
            last_published_at: None,
        }
    }

    /// Store a freshly fetched position, unless it is identical to the
    /// one already held.
    ///
    /// Returns `true` when the position actually changed. An identical
    /// pair leaves both the stored position and `position_updated_at`
    /// untouched, so an unchanged feed never makes the tracker look
    /// fresh to the publish gate.
    pub fn apply_position(&mut self, position: Position, at: DateTime<Utc>) -> bool {
        if self.last_position == Some(position) {
            return false;
        }
        self.last_position = Some(position);
        self.position_updated_at = Some(at);
        true
    }

    /// Decide whether the current position should be forwarded.
    ///
    /// Skips when nothing was ever fetched, or when the last publish
    /// attempt is at least as recent as the last position change.
    pub fn publish_check(&self) -> PublishCheck {
        let Some(updated_at) = self.position_updated_at else {
            return PublishCheck::NoPosition;
        };
        match self.last_published_at {
            Some(published_at) if published_at >= updated_at => PublishCheck::NotChanged,
            _ => PublishCheck::Ready,
        }
    }

    /// Record that a publish attempt reached the network and got a
    /// response, successful or not.
    ///
    /// Failed publishes count too: the position will not be re-sent
    /// until the upstream feed reports a new one. See DESIGN.md.
    pub fn record_publish_attempt(&mut self, at: DateTime<Utc>) {
        self.last_published_at = Some(at);
    }

    pub fn last_position(&self) -> Option<&Position> {
        self.last_position.as_ref()
    }

    pub fn position_updated_at(&self) -> Option<DateTime<Utc>> {
        self.position_updated_at
    }

    pub fn last_published_at(&self) -> Option<DateTime<Utc>> {
        self.last_published_at
    }
}

impl From<TrackerConfig> for Tracker {
    fn from(cfg: TrackerConfig) -> Self {
        Self::new(cfg.group, cfg.device_id, cfg.display_name, cfg.mapshare_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn tracker() -> Tracker {
        Tracker::new("LCASJS", "Amanda", "Amanda Mercer", "ZVV23")
    }

    fn pos(latitude: f64, longitude: f64) -> Position {
        Position {
            latitude,
            longitude,
        }
    }

    #[test]
    fn apply_position_stores_and_stamps() {
        let mut t = tracker();
        let now = Utc::now();

        assert!(t.apply_position(pos(39.5, -105.1), now));
        assert_eq!(t.last_position(), Some(&pos(39.5, -105.1)));
        assert_eq!(t.position_updated_at(), Some(now));
    }

    #[test]
    fn identical_position_leaves_timestamp_untouched() {
        let mut t = tracker();
        let first = Utc::now();
        let later = first + TimeDelta::seconds(60);

        assert!(t.apply_position(pos(39.5, -105.1), first));
        assert!(!t.apply_position(pos(39.5, -105.1), later));
        assert_eq!(t.position_updated_at(), Some(first));
    }

    #[test]
    fn changed_position_advances_timestamp() {
        let mut t = tracker();
        let first = Utc::now();
        let later = first + TimeDelta::seconds(60);

        assert!(t.apply_position(pos(39.5, -105.1), first));
        assert!(t.apply_position(pos(39.6, -105.1), later));
        assert_eq!(t.position_updated_at(), Some(later));
    }

    #[test]
    fn publish_check_skips_before_first_fetch() {
        assert_eq!(tracker().publish_check(), PublishCheck::NoPosition);
    }

    #[test]
    fn publish_check_ready_after_fresh_position() {
        let mut t = tracker();
        t.apply_position(pos(39.5, -105.1), Utc::now());
        assert_eq!(t.publish_check(), PublishCheck::Ready);
    }

    #[test]
    fn publish_check_skips_when_already_published() {
        let mut t = tracker();
        let fetched = Utc::now();
        t.apply_position(pos(39.5, -105.1), fetched);
        t.record_publish_attempt(fetched + TimeDelta::seconds(1));
        assert_eq!(t.publish_check(), PublishCheck::NotChanged);
    }

    #[test]
    fn publish_check_skips_on_equal_timestamps() {
        let mut t = tracker();
        let at = Utc::now();
        t.apply_position(pos(39.5, -105.1), at);
        t.record_publish_attempt(at);
        assert_eq!(t.publish_check(), PublishCheck::NotChanged);
    }

    #[test]
    fn new_position_reopens_the_gate() {
        let mut t = tracker();
        let first = Utc::now();
        t.apply_position(pos(39.5, -105.1), first);
        t.record_publish_attempt(first + TimeDelta::seconds(1));
        t.apply_position(pos(39.6, -105.2), first + TimeDelta::seconds(60));
        assert_eq!(t.publish_check(), PublishCheck::Ready);
    }

    #[test]
    fn record_publish_attempt_always_advances() {
        let mut t = tracker();
        let first = Utc::now();
        let later = first + TimeDelta::seconds(60);

        t.record_publish_attempt(first);
        assert_eq!(t.last_published_at(), Some(first));
        // A failed publish still counts as an attempt.
        t.record_publish_attempt(later);
        assert_eq!(t.last_published_at(), Some(later));
    }
}
