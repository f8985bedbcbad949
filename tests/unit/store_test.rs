//! Tests for the in-memory store backend

use chrono::{Duration, TimeZone, Utc};
use muster::core::{Event, NewOption, Poll, Vote};
use muster::infra::{EventStore, InMemoryStore, PollStore};
use muster::util::OptionId;

fn option(title: &str) -> NewOption {
    NewOption {
        title: title.to_string(),
        link: None,
        proposer: None,
    }
}

#[tokio::test]
async fn test_refresh_query_is_ordered_and_limited() {
    let store = InMemoryStore::new();
    let base = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
    for minutes in [30, 10, 20, 500] {
        let event = Event::new(&format!("e{minutes}"), "", 3, base + Duration::minutes(minutes));
        store.insert_event(event).await.unwrap();
    }

    let found = store
        .events_starting_between(base, base + Duration::hours(1), 2)
        .await
        .unwrap();
    let titles: Vec<_> = found.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["e10", "e20"]);
}

#[tokio::test]
async fn test_vote_upsert_reports_previous_choice() {
    let store = InMemoryStore::new();
    let now = Utc::now();
    let poll = Poll::new("Food", "", now, now);
    store.insert_poll(poll.clone()).await.unwrap();
    let a = store.insert_option(poll.id, option("A")).await.unwrap();
    let b = store.insert_option(poll.id, option("B")).await.unwrap();

    let vote = |option| Vote {
        poll: poll.id,
        user: "u1".into(),
        option,
    };
    assert_eq!(store.upsert_vote(vote(a.id)).await.unwrap(), None);
    assert_eq!(store.upsert_vote(vote(b.id)).await.unwrap(), Some(a.id));
    assert!(store.upsert_vote(vote(OptionId(99))).await.is_err());
    assert_eq!(store.list_votes(poll.id).await.unwrap().len(), 1);
    assert_eq!(store.clear_votes(poll.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_snapshot_file_round_trip() {
    let path = std::env::temp_dir().join(format!("muster-store-{}.json", uuid::Uuid::new_v4()));
    let now = Utc::now();
    let poll = Poll::new("Food", "", now, now);
    {
        let store = InMemoryStore::open(&path).unwrap();
        store.insert_poll(poll.clone()).await.unwrap();
        store.insert_option(poll.id, option("A")).await.unwrap();
    }

    let reopened = InMemoryStore::open(&path).unwrap();
    let options = reopened.list_options(poll.id).await.unwrap();
    assert_eq!(options.len(), 1);
    let next = reopened.insert_option(poll.id, option("B")).await.unwrap();
    assert_eq!(next.id, OptionId(2));

    let _ = std::fs::remove_file(&path);
}
