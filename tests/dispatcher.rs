mod common;

use crate::common::*;
use anon_relay::libs::config::RelayConfig;
use anon_relay::libs::handlers::*;
use anon_relay::libs::session::{CHAT_ENDED, CHAT_STARTED, PARTNER_ENDED};
use anon_relay::libs::storage::storage_traits::UserStore;
use anon_relay::{PreferenceKind, Preferences, UserId};

fn callback(data: &str) -> Event {
    Event::Callback(data.parse().unwrap())
}

fn command(text: &str) -> Event {
    Event::Command(text.parse().unwrap())
}

#[test]
fn start_sends_welcome_and_main_menu() {
    let t = test_relay(RelayConfig::default());
    let id = UserId(1);

    t.relay.dispatcher.handle(id, command("/start")).unwrap();

    assert_eq!(texts_for(&t.relay.queue.pending(), id), vec![WELCOME]);
    assert_eq!(
        t.menus.calls(),
        vec![MenuCall::Main {
            user: id,
            active: false
        }]
    );
}

#[test]
fn full_conversation_through_events() {
    let t = test_relay(RelayConfig::default());
    let (a, b) = (UserId(1), UserId(2));

    t.relay.dispatcher.handle(a, callback("toggle_active")).unwrap();
    t.relay.dispatcher.handle(b, callback("toggle_active")).unwrap();
    t.relay.dispatcher.handle(a, callback("find_match")).unwrap();

    assert_eq!(t.store.get(a).unwrap().partner, Some(b));
    assert_eq!(t.store.get(b).unwrap().partner, Some(a));

    t.relay
        .dispatcher
        .handle(b, Event::Text("hello stranger".to_string()))
        .unwrap();
    t.relay.dispatcher.handle(b, command("/end")).unwrap();

    let pending = t.relay.queue.pending();
    assert_eq!(
        texts_for(&pending, a),
        vec![
            CHAT_STARTED,
            "Match found! Starting chat...",
            "Anonymous: hello stranger",
            PARTNER_ENDED
        ]
    );
    assert_eq!(texts_for(&pending, b), vec![CHAT_STARTED, CHAT_ENDED]);
    assert_pairings_symmetric(&t.store);
}

#[test]
fn text_outside_a_chat_shows_main_menu() {
    let t = test_relay(RelayConfig::default());
    let id = UserId(5);

    t.relay
        .dispatcher
        .handle(id, Event::Text("hello?".to_string()))
        .unwrap();

    assert!(t.relay.queue.is_empty());
    assert_eq!(
        t.menus.calls(),
        vec![MenuCall::Main {
            user: id,
            active: false
        }]
    );
}

#[test]
fn settings_callbacks_update_preferences() {
    let t = test_relay(RelayConfig::default());
    let id = UserId(3);

    t.relay.dispatcher.handle(id, callback("set_language")).unwrap();
    t.relay.dispatcher.handle(id, callback("lang_spanish")).unwrap();
    t.relay.dispatcher.handle(id, callback("set_gender")).unwrap();
    t.relay.dispatcher.handle(id, callback("gender_other")).unwrap();
    t.relay
        .dispatcher
        .handle(id, command("/country Chile"))
        .unwrap();
    t.relay.dispatcher.handle(id, callback("clear_language")).unwrap();

    let preferences = t.store.get(id).unwrap().preferences;
    assert_eq!(preferences, prefs("other", "", "Chile"));

    let calls = t.menus.calls();
    assert_eq!(calls[0], MenuCall::Language(id));
    assert_eq!(calls[2], MenuCall::Gender(id));
    assert_eq!(
        calls.last(),
        Some(&MenuCall::Settings {
            user: id,
            preferences: prefs("other", "", "Chile"),
        })
    );
}

#[test]
fn informational_callbacks_and_unknown_commands() {
    let t = test_relay(RelayConfig::default());
    user(&t.store, 1, true, Preferences::default());
    user(&t.store, 2, true, Preferences::default());
    user(&t.store, 3, false, Preferences::default());
    let id = UserId(3);

    t.relay.dispatcher.handle(id, callback("show_active")).unwrap();
    t.relay.dispatcher.handle(id, callback("set_country")).unwrap();
    t.relay.dispatcher.handle(id, command("/country")).unwrap();
    t.relay.dispatcher.handle(id, command("/dance")).unwrap();

    assert_eq!(
        texts_for(&t.relay.queue.pending(), id),
        vec!["Active users: 2", COUNTRY_PROMPT, COUNTRY_PROMPT, UNKNOWN_COMMAND]
    );
    assert_eq!(t.store.get(id).unwrap().preferences.get(PreferenceKind::Country), None);
}
