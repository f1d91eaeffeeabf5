use crate::libs::core::models::{Preferences, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub active: bool,
    pub partner: Option<UserId>,
    pub last_activity: DateTime<Utc>,
    pub preferences: Preferences,
}

impl UserRecord {
    /// Fresh record handed out for users the store has never seen.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            active: false,
            partner: None,
            last_activity: Utc::now(),
            preferences: Preferences::default(),
        }
    }

    pub fn is_paired(&self) -> bool {
        self.partner.is_some()
    }

    pub fn is_available(&self) -> bool {
        self.active && self.partner.is_none()
    }
}

/// A mutual pairing as found by the store, ordered so that `user_a < user_b`.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveChat {
    pub user_a: UserId,
    pub user_b: UserId,
    pub last_activity_a: DateTime<Utc>,
    pub last_activity_b: DateTime<Utc>,
}

impl ActiveChat {
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity_a.max(self.last_activity_b)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundMessage {
    Text {
        text: String,
    },
    Photo {
        file_ref: String,
        caption: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedMessage {
    pub message_id: Uuid,
    pub destination: UserId,
    pub message: OutboundMessage,
}

impl QueuedMessage {
    pub fn text(destination: UserId, text: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            destination,
            message: OutboundMessage::Text { text: text.into() },
        }
    }

    pub fn photo(destination: UserId, file_ref: impl Into<String>, caption: Option<String>) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            destination,
            message: OutboundMessage::Photo {
                file_ref: file_ref.into(),
                caption: caption.filter(|c| !c.is_empty()),
            },
        }
    }

    pub fn text_body(&self) -> Option<&str> {
        match &self.message {
            OutboundMessage::Text { text } => Some(text),
            OutboundMessage::Photo { .. } => None,
        }
    }
}
