//! Tests for display status resolution

use chrono::{Duration, TimeZone, Utc};
use muster::core::{resolve_status, DisplayStatus, EventStatus, STARTING_LEAD_MINUTES};

#[test]
fn test_status_boundaries() {
    let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let lead = Duration::minutes(STARTING_LEAD_MINUTES);

    let before_lead = start - lead - Duration::seconds(1);
    assert_eq!(resolve_status(before_lead, start, EventStatus::Planned), DisplayStatus::Soon);
    assert_eq!(resolve_status(start - lead, start, EventStatus::Planned), DisplayStatus::Starting);
    assert_eq!(
        resolve_status(start - Duration::seconds(1), start, EventStatus::Notified),
        DisplayStatus::Starting
    );
    assert_eq!(resolve_status(start, start, EventStatus::Notified), DisplayStatus::InProgress);
}

#[test]
fn test_finished_overrides_time() {
    let start = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    let early = start - Duration::days(1);
    assert_eq!(resolve_status(early, start, EventStatus::Finished), DisplayStatus::Finished);
}

#[test]
fn test_status_labels() {
    assert_eq!(DisplayStatus::InProgress.to_string(), "In progress");
    assert_eq!(DisplayStatus::Soon.label(), "Soon");
}
