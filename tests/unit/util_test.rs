//! Tests for utility types

use chrono::{Duration, TimeZone, Utc};
use muster::util::{Clock, EntityLocks, EventId, ManualClock, OptionId, PollId, UserId};

#[test]
fn test_ids_are_unique() {
    assert_ne!(EventId::new(), EventId::new());
    assert_ne!(PollId::new(), PollId::new());
}

#[test]
fn test_option_id_ordering() {
    assert!(OptionId(1) < OptionId(2));
    assert_eq!(OptionId(7).to_string(), "7");
}

#[test]
fn test_user_id_conversions() {
    let from_str = UserId::from("alice");
    let from_string = UserId::from("alice".to_string());
    assert_eq!(from_str, from_string);
    assert_eq!(from_str.to_string(), "alice");
}

#[test]
fn test_ids_serialize_transparently() {
    assert_eq!(serde_json::to_string(&OptionId(3)).unwrap(), "3");
    assert_eq!(serde_json::to_string(&UserId::from("bob")).unwrap(), "\"bob\"");
}

#[test]
fn test_manual_clock() {
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    clock.advance(Duration::minutes(90));
    assert_eq!(clock.now(), start + Duration::minutes(90));
    clock.set(start);
    assert_eq!(clock.now(), start);
}

#[tokio::test]
async fn test_entity_locks_prune() {
    let locks = EntityLocks::<PollId>::new();
    let id = PollId::new();
    drop(locks.acquire(&id).await);
    assert_eq!(locks.len(), 1);
    assert_eq!(locks.prune_idle(), 1);
    assert!(locks.is_empty());
}
