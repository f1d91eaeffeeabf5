use rusqlite::types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque user identity. For private conversations the user id doubles as the
/// chat destination the messenger delivers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl From<i64> for UserId {
    fn from(id: i64) -> UserId {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(UserId)
    }
}

impl ToSql for UserId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for UserId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_i64().map(UserId)
    }
}

/// Matching preferences. An empty tag behaves exactly like an unset one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub country: Option<String>,
    pub language: Option<String>,
    pub gender: Option<String>,
}

impl Preferences {
    pub fn get(&self, kind: PreferenceKind) -> Option<&str> {
        let value = match kind {
            PreferenceKind::Country => &self.country,
            PreferenceKind::Language => &self.language,
            PreferenceKind::Gender => &self.gender,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, kind: PreferenceKind, value: Option<String>) {
        let value = value.filter(|v| !v.is_empty());
        match kind {
            PreferenceKind::Country => self.country = value,
            PreferenceKind::Language => self.language = value,
            PreferenceKind::Gender => self.gender = value,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PreferenceKind {
    Country,
    Language,
    Gender,
}

impl PreferenceKind {
    /// Order in which the compatibility check evaluates the attributes.
    pub const MATCH_ORDER: [PreferenceKind; 3] = [
        PreferenceKind::Gender,
        PreferenceKind::Language,
        PreferenceKind::Country,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PreferenceKind::Country => "country",
            PreferenceKind::Language => "language",
            PreferenceKind::Gender => "gender",
        }
    }
}

impl fmt::Display for PreferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    UserRequested,
    Timeout,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::UserRequested => f.write_str("user_requested"),
            EndReason::Timeout => f.write_str("timeout"),
        }
    }
}

/// What a user sends into an active conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatContent {
    Text(String),
    Photo {
        file_ref: String,
        caption: Option<String>,
    },
}
