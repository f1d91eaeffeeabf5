#![allow(dead_code)]

use anon_relay::libs::config::RelayConfig;
use anon_relay::libs::handlers::MenuPresenter;
use anon_relay::libs::matching::MatchEngine;
use anon_relay::libs::message_queue::OutboundQueue;
use anon_relay::libs::messenger::{Messenger, MessengerError};
use anon_relay::libs::storage::memory::InMemoryUserStore;
use anon_relay::libs::storage::storage_traits::UserStore;
use anon_relay::{Preferences, QueuedMessage, Relay, UserId, UserRecord};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq)]
pub enum Sent {
    Text(UserId, String),
    Photo(UserId, String, Option<String>),
}

/// Messenger that remembers every delivery; sends to `failing` destinations error out.
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<Sent>>,
    pub failing: Mutex<HashSet<UserId>>,
    pub attempts: Mutex<usize>,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_for(&self, user_id: UserId) {
        self.failing.lock().unwrap().insert(user_id);
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    fn record(&self, destination: UserId, sent: Sent) -> Result<(), MessengerError> {
        *self.attempts.lock().unwrap() += 1;
        if self.failing.lock().unwrap().contains(&destination) {
            return Err(MessengerError::Transport("connection reset".to_string()));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

impl Messenger for RecordingMessenger {
    fn send_text(&self, destination: UserId, text: &str) -> Result<(), MessengerError> {
        self.record(destination, Sent::Text(destination, text.to_string()))
    }

    fn send_photo(
        &self,
        destination: UserId,
        file_ref: &str,
        caption: Option<&str>,
    ) -> Result<(), MessengerError> {
        self.record(
            destination,
            Sent::Photo(
                destination,
                file_ref.to_string(),
                caption.map(str::to_string),
            ),
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MenuCall {
    Main { user: UserId, active: bool },
    Settings { user: UserId, preferences: Preferences },
    Language(UserId),
    Gender(UserId),
}

#[derive(Default)]
pub struct RecordingMenus {
    pub calls: Mutex<Vec<MenuCall>>,
}

impl RecordingMenus {
    pub fn calls(&self) -> Vec<MenuCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl MenuPresenter for RecordingMenus {
    fn main_menu(&self, user: &UserRecord) {
        self.calls.lock().unwrap().push(MenuCall::Main {
            user: user.user_id,
            active: user.active,
        });
    }

    fn settings_menu(&self, user: &UserRecord) {
        self.calls.lock().unwrap().push(MenuCall::Settings {
            user: user.user_id,
            preferences: user.preferences.clone(),
        });
    }

    fn language_menu(&self, user_id: UserId) {
        self.calls.lock().unwrap().push(MenuCall::Language(user_id));
    }

    fn gender_menu(&self, user_id: UserId) {
        self.calls.lock().unwrap().push(MenuCall::Gender(user_id));
    }
}

pub struct TestRelay {
    pub relay: Relay,
    pub store: Arc<InMemoryUserStore>,
    pub messenger: Arc<RecordingMessenger>,
    pub menus: Arc<RecordingMenus>,
}

pub fn test_relay(config: RelayConfig) -> TestRelay {
    let store = Arc::new(InMemoryUserStore::new());
    let messenger = Arc::new(RecordingMessenger::default());
    let menus = Arc::new(RecordingMenus::default());
    let queue = Arc::new(OutboundQueue::new(messenger.clone(), config.rate_limit));
    let relay = Relay::with_engine(
        &config,
        store.clone(),
        queue,
        menus.clone(),
        MatchEngine::seeded(7),
    );
    TestRelay {
        relay,
        store,
        messenger,
        menus,
    }
}

pub fn user(store: &InMemoryUserStore, id: i64, active: bool, preferences: Preferences) -> UserId {
    let mut record = UserRecord::new(UserId(id));
    record.active = active;
    record.preferences = preferences;
    store.put(&record).unwrap();
    record.user_id
}

pub fn pair(store: &InMemoryUserStore, a: i64, b: i64, last_activity: DateTime<Utc>) {
    let mut first = store.get(UserId(a)).unwrap();
    let mut second = store.get(UserId(b)).unwrap();
    first.active = true;
    second.active = true;
    first.partner = Some(UserId(b));
    second.partner = Some(UserId(a));
    first.last_activity = last_activity;
    second.last_activity = last_activity;
    store.put_pair(&first, &second).unwrap();
}

pub fn prefs(gender: &str, language: &str, country: &str) -> Preferences {
    let tag = |v: &str| (!v.is_empty()).then(|| v.to_string());
    Preferences {
        gender: tag(gender),
        language: tag(language),
        country: tag(country),
    }
}

/// Text bodies queued for `user_id`, in order.
pub fn texts_for(pending: &[QueuedMessage], user_id: UserId) -> Vec<String> {
    pending
        .iter()
        .filter(|m| m.destination == user_id)
        .filter_map(|m| m.text_body().map(str::to_string))
        .collect()
}

pub fn assert_pairings_symmetric(store: &InMemoryUserStore) {
    for record in store.snapshot().unwrap() {
        if let Some(partner) = record.partner {
            let other = store.get(partner).unwrap();
            assert_eq!(
                other.partner,
                Some(record.user_id),
                "{} points at {} but not the other way round",
                record.user_id,
                partner
            );
        }
    }
}
