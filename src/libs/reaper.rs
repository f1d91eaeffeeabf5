use crate::libs::session::{EndOutcome, SessionManager};
use crate::libs::storage::storage_traits::UserStore;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Periodically ends conversations that have been idle longer than the timeout.
pub struct InactivityReaper {
    sessions: Arc<SessionManager>,
    store: Arc<dyn UserStore>,
    inactivity_timeout: TimeDelta,
    interval: Duration,
    cancel: Mutex<Option<CancellationToken>>,
}

impl InactivityReaper {
    pub fn new(
        sessions: Arc<SessionManager>,
        store: Arc<dyn UserStore>,
        inactivity_timeout: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            sessions,
            store,
            inactivity_timeout: TimeDelta::from_std(inactivity_timeout).unwrap_or(TimeDelta::MAX),
            interval,
            cancel: Mutex::new(None),
        }
    }

    /// One sweep over all current pairings. Returns how many were ended.
    pub fn reap_once(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let chats = match self.store.scan_paired_sessions() {
            Ok(chats) => chats,
            Err(err) => {
                error!("Error loading active chats: {err}");
                return 0;
            }
        };

        let mut ended = 0;
        for chat in chats {
            if now - chat.last_activity() <= self.inactivity_timeout {
                continue;
            }
            match self.sessions.end_if_idle(&chat, self.inactivity_timeout, now) {
                Ok(EndOutcome::Ended { .. }) => ended += 1,
                Ok(EndOutcome::NotInChat | EndOutcome::StillActive) => {}
                Err(err) => {
                    error!(
                        user_a = %chat.user_a,
                        user_b = %chat.user_b,
                        "Error ending inactive chat: {err}"
                    );
                }
            }
        }
        ended
    }

    pub fn is_running(&self) -> bool {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Spawns the sweep loop on the current tokio runtime. No-op if already running.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        *slot = Some(cancel.clone());

        let reaper = Arc::clone(self);
        let interval = self.interval;
        tokio::spawn(async move {
            info!("inactivity reaper started (interval={interval:?})");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("inactivity reaper stopped");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        match reaper.reap_once() {
                            0 => debug!("inactivity sweep found nothing to end"),
                            n => info!("inactivity sweep ended {n} chats"),
                        }
                    }
                }
            }
        });
    }

    pub fn stop(&self) {
        if let Some(cancel) = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            cancel.cancel();
        }
    }
}
