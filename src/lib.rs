pub mod libs;

use crate::libs::config::RelayConfig;
use crate::libs::handlers::{Dispatcher, MenuPresenter};
use crate::libs::matching::MatchEngine;
use crate::libs::message_queue::OutboundQueue;
use crate::libs::reaper::InactivityReaper;
use crate::libs::session::SessionManager;
use crate::libs::storage::database::database;
use crate::libs::storage::database::storage_sqllite::SqliteStore;
use crate::libs::storage::storage_traits::{StoreError, UserStore};
use std::sync::Arc;

pub use crate::libs::core::models::{ChatContent, EndReason, PreferenceKind, Preferences, UserId};
pub use crate::libs::storage::records::{ActiveChat, OutboundMessage, QueuedMessage, UserRecord};

pub fn init_database(path: &str) -> Result<SqliteStore, StoreError> {
    database::initialize_database(path)
}

/// The wired-up relay: the session manager on top of a store and an outbound
/// queue, plus the inactivity reaper and the inbound dispatcher.
///
/// The queue is built by the caller so that menu presenters can share it.
pub struct Relay {
    pub store: Arc<dyn UserStore>,
    pub queue: Arc<OutboundQueue>,
    pub sessions: Arc<SessionManager>,
    pub reaper: Arc<InactivityReaper>,
    pub dispatcher: Dispatcher,
}

impl Relay {
    pub fn new(
        config: &RelayConfig,
        store: Arc<dyn UserStore>,
        queue: Arc<OutboundQueue>,
        menus: Arc<dyn MenuPresenter>,
    ) -> Self {
        Self::with_engine(config, store, queue, menus, MatchEngine::new())
    }

    pub fn with_engine(
        config: &RelayConfig,
        store: Arc<dyn UserStore>,
        queue: Arc<OutboundQueue>,
        menus: Arc<dyn MenuPresenter>,
        engine: MatchEngine,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            engine,
        ));
        let reaper = Arc::new(InactivityReaper::new(
            Arc::clone(&sessions),
            Arc::clone(&store),
            config.inactivity_timeout,
            config.reap_interval,
        ));
        let dispatcher = Dispatcher::new(Arc::clone(&sessions), menus);

        Self {
            store,
            queue,
            sessions,
            reaper,
            dispatcher,
        }
    }

    /// Starts the drain loop and the reaper. Must run inside a tokio runtime.
    pub fn start(&self) {
        self.queue.start();
        self.reaper.start();
    }

    pub fn stop(&self) {
        self.reaper.stop();
        self.queue.stop();
    }
}
