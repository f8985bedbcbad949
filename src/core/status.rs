//! Display status of an event derived from the clock.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::model::EventStatus;

/// Lead time before the start during which an event shows as starting.
pub const STARTING_LEAD_MINUTES: i64 = 5;

/// Presentation status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayStatus {
    /// More than the starting lead away.
    Soon,
    /// Within the starting lead.
    Starting,
    /// Start time reached.
    InProgress,
    /// Stopped manually.
    Finished,
}

impl DisplayStatus {
    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Soon => "Soon",
            Self::Starting => "Starting",
            Self::InProgress => "In progress",
            Self::Finished => "Finished",
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Resolve the display status. `Finished` wins over any time arithmetic.
pub fn resolve(now: DateTime<Utc>, starts_at: DateTime<Utc>, persisted: EventStatus) -> DisplayStatus {
    if persisted == EventStatus::Finished {
        return DisplayStatus::Finished;
    }
    if now < starts_at - Duration::minutes(STARTING_LEAD_MINUTES) {
        DisplayStatus::Soon
    } else if now < starts_at {
        DisplayStatus::Starting
    } else {
        DisplayStatus::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 18, 0, 0).unwrap()
    }

    #[test]
    fn soon_before_lead() {
        let t = start();
        assert_eq!(resolve(t - Duration::minutes(10), t, EventStatus::Planned), DisplayStatus::Soon);
    }

    #[test]
    fn starting_within_lead() {
        let t = start();
        assert_eq!(resolve(t - Duration::minutes(3), t, EventStatus::Planned), DisplayStatus::Starting);
        assert_eq!(resolve(t - Duration::minutes(5), t, EventStatus::Notified), DisplayStatus::Starting);
    }

    #[test]
    fn in_progress_from_start() {
        let t = start();
        assert_eq!(resolve(t, t, EventStatus::Planned), DisplayStatus::InProgress);
        assert_eq!(resolve(t + Duration::minutes(1), t, EventStatus::Notified), DisplayStatus::InProgress);
    }

    #[test]
    fn finished_overrides_time() {
        let t = start();
        for offset in [-600, -3, 0, 1, 600] {
            let now = t + Duration::minutes(offset);
            assert_eq!(resolve(now, t, EventStatus::Finished), DisplayStatus::Finished);
        }
    }
}
