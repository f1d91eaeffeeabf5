mod common;

use crate::common::*;
use anon_relay::libs::config::RelayConfig;
use anon_relay::libs::reaper::InactivityReaper;
use anon_relay::libs::session::{CHAT_ENDED, CHAT_STARTED, INACTIVITY_ENDED};
use anon_relay::libs::storage::memory::InMemoryUserStore;
use anon_relay::libs::storage::storage_traits::{StoreError, UserStore};
use anon_relay::{ActiveChat, ChatContent, EndReason, UserId, UserRecord};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;

/// Store whose pairing scan keeps returning what it saw at construction time.
struct FrozenScan {
    inner: Arc<InMemoryUserStore>,
    chats: Vec<ActiveChat>,
}

impl FrozenScan {
    fn new(inner: Arc<InMemoryUserStore>) -> Self {
        let chats = inner.scan_paired_sessions().unwrap();
        Self { inner, chats }
    }
}

impl UserStore for FrozenScan {
    fn get(&self, user_id: UserId) -> Result<UserRecord, StoreError> {
        self.inner.get(user_id)
    }

    fn put(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.inner.put(record)
    }

    fn put_pair(&self, first: &UserRecord, second: &UserRecord) -> Result<(), StoreError> {
        self.inner.put_pair(first, second)
    }

    fn scan_active_unpaired(&self, excluding: UserId) -> Result<Vec<UserId>, StoreError> {
        self.inner.scan_active_unpaired(excluding)
    }

    fn scan_paired_sessions(&self) -> Result<Vec<ActiveChat>, StoreError> {
        Ok(self.chats.clone())
    }

    fn count_active(&self) -> Result<usize, StoreError> {
        self.inner.count_active()
    }
}

fn frozen_reaper(t: &TestRelay) -> InactivityReaper {
    InactivityReaper::new(
        Arc::clone(&t.relay.sessions),
        Arc::new(FrozenScan::new(Arc::clone(&t.store))),
        StdDuration::from_secs(60 * 60),
        StdDuration::from_secs(60),
    )
}

fn stale(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::minutes(90)
}

fn hour_timeout() -> RelayConfig {
    RelayConfig {
        inactivity_timeout: StdDuration::from_secs(60 * 60),
        reap_interval: StdDuration::from_secs(60),
        ..RelayConfig::default()
    }
}

#[test]
fn idle_pairing_is_ended_once_with_one_notice_each() {
    let t = test_relay(hour_timeout());
    let now = Utc::now();
    pair(&t.store, 1, 2, now - Duration::minutes(90));

    assert_eq!(t.relay.reaper.sweep_at(now), 1);

    assert_eq!(t.store.get(UserId(1)).unwrap().partner, None);
    assert_eq!(t.store.get(UserId(2)).unwrap().partner, None);

    let pending = t.relay.queue.pending();
    assert_eq!(texts_for(&pending, UserId(1)), vec![INACTIVITY_ENDED]);
    assert_eq!(texts_for(&pending, UserId(2)), vec![INACTIVITY_ENDED]);

    assert_eq!(t.relay.reaper.sweep_at(now), 0);
    assert_eq!(t.relay.queue.len(), 2);
}

#[test]
fn recent_activity_on_either_side_keeps_the_chat() {
    let t = test_relay(hour_timeout());
    let now = Utc::now();
    pair(&t.store, 1, 2, now - Duration::minutes(90));

    let mut talker = t.store.get(UserId(2)).unwrap();
    talker.last_activity = now - Duration::minutes(5);
    t.store.put(&talker).unwrap();

    pair(&t.store, 3, 4, now - Duration::minutes(59));

    assert_eq!(t.relay.reaper.sweep_at(now), 0);
    assert_eq!(t.store.get(UserId(1)).unwrap().partner, Some(UserId(2)));
    assert_eq!(t.store.get(UserId(3)).unwrap().partner, Some(UserId(4)));
    assert!(t.relay.queue.is_empty());
}

#[test]
fn only_stale_pairings_are_reaped() {
    let t = test_relay(hour_timeout());
    let now = Utc::now();
    pair(&t.store, 1, 2, now - Duration::hours(3));
    pair(&t.store, 3, 4, now - Duration::minutes(10));
    pair(&t.store, 5, 6, now - Duration::hours(2));

    assert_eq!(t.relay.reaper.sweep_at(now), 2);

    let paired: Vec<UserId> = t
        .store
        .snapshot()
        .unwrap()
        .into_iter()
        .filter(|r| r.partner.is_some())
        .map(|r| r.user_id)
        .collect();
    assert_eq!(paired, vec![UserId(3), UserId(4)]);
    assert_pairings_symmetric(&t.store);
}

#[test]
fn activity_after_the_scan_keeps_the_chat() {
    let t = test_relay(hour_timeout());
    let now = Utc::now();
    pair(&t.store, 1, 2, stale(now));
    let reaper = frozen_reaper(&t);

    t.relay
        .sessions
        .relay(UserId(2), ChatContent::Text("still here".to_string()))
        .unwrap();

    assert_eq!(reaper.sweep_at(Utc::now()), 0);
    assert_eq!(t.store.get(UserId(1)).unwrap().partner, Some(UserId(2)));
    assert_eq!(t.store.get(UserId(2)).unwrap().partner, Some(UserId(1)));
    assert_eq!(texts_for(&t.relay.queue.pending(), UserId(2)), Vec::<String>::new());
}

#[test]
fn new_pairing_after_the_scan_is_not_reaped() {
    let t = test_relay(hour_timeout());
    let now = Utc::now();
    pair(&t.store, 1, 2, stale(now));
    let reaper = frozen_reaper(&t);

    t.relay.sessions.end_chat(UserId(1), EndReason::UserRequested).unwrap();
    t.relay.sessions.set_active(UserId(2), false).unwrap();
    user(&t.store, 3, true, Default::default());
    t.relay.sessions.request_match(UserId(1)).unwrap();
    assert_eq!(t.store.get(UserId(1)).unwrap().partner, Some(UserId(3)));

    assert_eq!(reaper.sweep_at(Utc::now()), 0);

    assert_eq!(t.store.get(UserId(1)).unwrap().partner, Some(UserId(3)));
    assert_eq!(t.store.get(UserId(3)).unwrap().partner, Some(UserId(1)));
    let pending = t.relay.queue.pending();
    assert_eq!(texts_for(&pending, UserId(3)), vec![CHAT_STARTED]);
    assert_eq!(
        texts_for(&pending, UserId(1)),
        vec![CHAT_ENDED, CHAT_STARTED, "Match found! Starting chat..."]
    );
    assert_pairings_symmetric(&t.store);
}

#[tokio::test(start_paused = true)]
async fn background_loop_sweeps_on_its_interval() {
    let t = test_relay(hour_timeout());
    pair(&t.store, 1, 2, Utc::now() - Duration::hours(2));

    t.relay.reaper.start();
    t.relay.reaper.start();
    assert!(t.relay.reaper.is_running());

    tokio::time::sleep(StdDuration::from_secs(30)).await;
    assert_eq!(t.store.get(UserId(1)).unwrap().partner, Some(UserId(2)));

    tokio::time::sleep(StdDuration::from_secs(31)).await;
    assert_eq!(t.store.get(UserId(1)).unwrap().partner, None);
    assert_eq!(t.store.get(UserId(2)).unwrap().partner, None);

    t.relay.reaper.stop();
    assert!(!t.relay.reaper.is_running());
}
