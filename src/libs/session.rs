use crate::libs::core::models::{ChatContent, EndReason, PreferenceKind, UserId};
use crate::libs::matching::{Ineligible, MatchEngine, Selection};
use crate::libs::message_queue::OutboundQueue;
use crate::libs::storage::records::{ActiveChat, UserRecord};
use crate::libs::storage::storage_traits::{StoreError, UserStore};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info};

pub const CHAT_STARTED: &str = "Chat started! You can now send messages. Use /end to end the chat.";
pub const MATCH_FOUND: &str = "Match found! Starting chat...";
pub const NO_MATCH: &str = "No matches found at the moment. Please try again later.";
pub const MATCH_ERROR: &str = "Error finding matches.";
pub const NOT_ACTIVE: &str = "You need to be active to find a match!";
pub const ALREADY_IN_CHAT: &str = "You are already in a chat!";
pub const NOT_IN_CHAT: &str = "You are not in a chat!";
pub const CHAT_ENDED: &str = "Chat ended!";
pub const PARTNER_ENDED: &str = "Your chat partner has ended the conversation.";
pub const INACTIVITY_ENDED: &str = "Chat ended due to inactivity!";
pub const ANONYMOUS_PREFIX: &str = "Anonymous: ";
pub const DEFAULT_PHOTO_CAPTION: &str = "Anonymous sent a photo";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched { partner: UserId },
    NotActive,
    AlreadyInChat,
    NoMatch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    Forwarded { to: UserId },
    NotInChat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndOutcome {
    Ended { partner: UserId },
    NotInChat,
    /// The pairing saw activity after it was scanned and was left alone.
    StillActive,
}

/// Owns the `Idle -> Paired -> Idle` lifecycle of a conversation and is the
/// only writer of user records.
///
/// Every read-modify-write runs under `state_lock`, so checking eligibility and
/// committing a pairing cannot interleave with another handler doing the same.
/// Partners only ever learn about a transition through the outbound queue.
pub struct SessionManager {
    store: Arc<dyn UserStore>,
    queue: Arc<OutboundQueue>,
    engine: MatchEngine,
    state_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn UserStore>, queue: Arc<OutboundQueue>, engine: MatchEngine) -> Self {
        Self {
            store,
            queue,
            engine,
            state_lock: Mutex::new(()),
        }
    }

    pub fn queue(&self) -> &Arc<OutboundQueue> {
        &self.queue
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.state_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(&self, user_id: UserId) -> Result<UserRecord, StoreError> {
        self.store
            .get(user_id)
            .inspect_err(|err| error!(user = %user_id, "Error getting user state: {err}"))
    }

    fn save(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.store
            .put(record)
            .inspect_err(|err| error!(user = %record.user_id, "Error saving user state: {err}"))
    }

    fn save_pair(&self, first: &UserRecord, second: &UserRecord) -> Result<(), StoreError> {
        self.store.put_pair(first, second).inspect_err(|err| {
            error!(
                first = %first.user_id,
                second = %second.user_id,
                "Error saving chat pair: {err}"
            )
        })
    }

    pub fn user(&self, user_id: UserId) -> Result<UserRecord, StoreError> {
        self.load(user_id)
    }

    pub fn active_users(&self) -> Result<usize, StoreError> {
        self.store
            .count_active()
            .inspect_err(|err| error!("Error counting active users: {err}"))
    }

    pub fn request_match(&self, user_id: UserId) -> Result<MatchOutcome, StoreError> {
        let _guard = self.lock();
        let requester = self.load(user_id)?;

        let selection = match self.engine.select(self.store.as_ref(), &requester) {
            Ok(selection) => selection,
            Err(err) => {
                error!(user = %user_id, "Error finding potential matches: {err}");
                self.queue.enqueue_text(user_id, MATCH_ERROR);
                return Err(err);
            }
        };

        match selection {
            Selection::NotEligible(Ineligible::NotActive) => {
                self.queue.enqueue_text(user_id, NOT_ACTIVE);
                Ok(MatchOutcome::NotActive)
            }
            Selection::NotEligible(Ineligible::AlreadyPaired) => {
                self.queue.enqueue_text(user_id, ALREADY_IN_CHAT);
                Ok(MatchOutcome::AlreadyInChat)
            }
            Selection::NoMatch => {
                self.queue.enqueue_text(user_id, NO_MATCH);
                Ok(MatchOutcome::NoMatch)
            }
            Selection::Found(candidate) => {
                let partner_id = candidate.user_id;
                let now = Utc::now();

                let mut requester = requester;
                requester.partner = Some(partner_id);
                requester.last_activity = now;
                let mut partner = candidate;
                partner.partner = Some(user_id);
                partner.last_activity = now;

                self.save_pair(&requester, &partner)?;

                self.queue.enqueue_text(user_id, CHAT_STARTED);
                self.queue.enqueue_text(partner_id, CHAT_STARTED);
                self.queue.enqueue_text(user_id, MATCH_FOUND);
                info!(user = %user_id, partner = %partner_id, "chat started");
                Ok(MatchOutcome::Matched {
                    partner: partner_id,
                })
            }
        }
    }

    pub fn relay(&self, from: UserId, content: ChatContent) -> Result<RelayOutcome, StoreError> {
        let _guard = self.lock();
        let mut sender = self.load(from)?;
        let Some(partner) = sender.partner else {
            return Ok(RelayOutcome::NotInChat);
        };

        sender.last_activity = Utc::now();
        self.save(&sender)?;

        match content {
            ChatContent::Text(text) => {
                self.queue
                    .enqueue_text(partner, format!("{ANONYMOUS_PREFIX}{text}"));
            }
            ChatContent::Photo { file_ref, caption } => {
                let caption = match caption.filter(|c| !c.is_empty()) {
                    Some(caption) => format!("{ANONYMOUS_PREFIX}{caption}"),
                    None => DEFAULT_PHOTO_CAPTION.to_string(),
                };
                self.queue.enqueue_photo(partner, file_ref, Some(caption));
            }
        }
        Ok(RelayOutcome::Forwarded { to: partner })
    }

    /// Clears the pairing on both sides and tells each side why.
    ///
    /// A timeout end on a user who is no longer paired is silent; a
    /// user-requested one answers with a "not in chat" notice.
    pub fn end_chat(&self, user_id: UserId, reason: EndReason) -> Result<EndOutcome, StoreError> {
        let _guard = self.lock();
        let mut user = self.load(user_id)?;
        let Some(partner_id) = user.partner else {
            if reason == EndReason::UserRequested {
                self.queue.enqueue_text(user_id, NOT_IN_CHAT);
            }
            return Ok(EndOutcome::NotInChat);
        };

        let mut partner = self.load(partner_id)?;
        user.partner = None;
        if partner.partner == Some(user_id) {
            partner.partner = None;
        }
        self.save_pair(&user, &partner)?;

        match reason {
            EndReason::UserRequested => {
                self.queue.enqueue_text(user_id, CHAT_ENDED);
                self.queue.enqueue_text(partner_id, PARTNER_ENDED);
            }
            EndReason::Timeout => {
                self.queue.enqueue_text(user_id, INACTIVITY_ENDED);
                self.queue.enqueue_text(partner_id, INACTIVITY_ENDED);
            }
        }
        info!(user = %user_id, partner = %partner_id, %reason, "chat ended");
        Ok(EndOutcome::Ended {
            partner: partner_id,
        })
    }

    /// Ends a scanned pairing for inactivity, re-checked against the store.
    ///
    /// The pairing must still link both users to each other and its most
    /// recent activity must be older than `timeout` at `now`.
    pub fn end_if_idle(
        &self,
        chat: &ActiveChat,
        timeout: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<EndOutcome, StoreError> {
        let _guard = self.lock();
        let mut first = self.load(chat.user_a)?;
        let mut second = self.load(chat.user_b)?;
        if first.partner != Some(second.user_id) || second.partner != Some(first.user_id) {
            debug!(
                user_a = %chat.user_a,
                user_b = %chat.user_b,
                "pairing changed before timeout"
            );
            return Ok(EndOutcome::NotInChat);
        }

        let last_activity = first.last_activity.max(second.last_activity);
        if now - last_activity <= timeout {
            return Ok(EndOutcome::StillActive);
        }

        first.partner = None;
        second.partner = None;
        self.save_pair(&first, &second)?;

        self.queue.enqueue_text(first.user_id, INACTIVITY_ENDED);
        self.queue.enqueue_text(second.user_id, INACTIVITY_ENDED);
        info!(
            user = %first.user_id,
            partner = %second.user_id,
            reason = %EndReason::Timeout,
            "chat ended"
        );
        Ok(EndOutcome::Ended {
            partner: second.user_id,
        })
    }

    pub fn set_active(&self, user_id: UserId, active: bool) -> Result<UserRecord, StoreError> {
        let _guard = self.lock();
        let mut user = self.load(user_id)?;
        user.active = active;
        self.save(&user)?;
        Ok(user)
    }

    pub fn toggle_active(&self, user_id: UserId) -> Result<UserRecord, StoreError> {
        let _guard = self.lock();
        let mut user = self.load(user_id)?;
        user.active = !user.active;
        self.save(&user)?;
        Ok(user)
    }

    /// Sets one matching preference; `None` clears it.
    pub fn set_preference(
        &self,
        user_id: UserId,
        kind: PreferenceKind,
        value: Option<String>,
    ) -> Result<UserRecord, StoreError> {
        let _guard = self.lock();
        let mut user = self.load(user_id)?;
        user.preferences.set(kind, value);
        self.save(&user)?;
        Ok(user)
    }
}
