use crate::libs::core::models::{ChatContent, EndReason, PreferenceKind, UserId};
use crate::libs::session::{RelayOutcome, SessionManager};
use crate::libs::storage::records::UserRecord;
use crate::libs::storage::storage_traits::StoreError;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub const WELCOME: &str = "Welcome to the Anonymous P2P Chat Bot!

How it works:
- This bot lets you chat anonymously with random users.
- You can set preferences (country, language, gender) to match with similar users.
- Only text and photo messages are allowed.
- Chats are ended automatically after 1 hour of inactivity.

Commands and Features:
/start - Show this message and the main menu.
/end - End your current anonymous chat.
/country <name> - Set your country preference.
Show Active Users - See how many users are currently online.
Status: Online/Offline - Toggle your availability for matching.
Settings - Set or clear your country, language, or gender preferences.
Find Match - Start searching for a random chat partner.

Use the menu buttons to navigate. Enjoy chatting!";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Use /start to see available options.";
pub const COUNTRY_PROMPT: &str = "Please enter your country with /country <name> (e.g., /country USA):";
pub const ACTIVE_COUNT_ERROR: &str = "Error getting active users count.";

pub const LANGUAGES: [&str; 10] = [
    "english",
    "mandarin",
    "hindi",
    "spanish",
    "french",
    "arabic",
    "bengali",
    "portuguese",
    "russian",
    "japanese",
];
pub const GENDERS: [&str; 3] = ["male", "female", "other"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    End,
    Country(String),
    Unknown(String),
}

impl FromStr for Command {
    type Err = ();

    /// Parses `/name [args]`; anything not starting with `/` is not a command.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.trim().strip_prefix('/').ok_or(())?;
        let (name, args) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
        // tolerate the "/start@botname" form
        let name = name.split('@').next().unwrap_or(name);
        Ok(match name {
            "start" => Command::Start,
            "end" => Command::End,
            "country" => Command::Country(args.trim().to_string()),
            other => Command::Unknown(other.to_string()),
        })
    }
}

/// Button presses, keyed by their callback data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    ShowActive,
    ToggleActive,
    Settings,
    BackToMain,
    FindMatch,
    SetCountry,
    Clear(PreferenceKind),
    SetLanguage,
    SetGender,
    Language(String),
    Gender(String),
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "show_active" => Action::ShowActive,
            "toggle_active" => Action::ToggleActive,
            "settings" => Action::Settings,
            "back_to_main" => Action::BackToMain,
            "find_match" => Action::FindMatch,
            "set_country" => Action::SetCountry,
            "clear_country" => Action::Clear(PreferenceKind::Country),
            "set_language" => Action::SetLanguage,
            "clear_language" => Action::Clear(PreferenceKind::Language),
            "set_gender" => Action::SetGender,
            "clear_gender" => Action::Clear(PreferenceKind::Gender),
            other => {
                if let Some(language) = other.strip_prefix("lang_").filter(|l| !l.is_empty()) {
                    Action::Language(language.to_string())
                } else if let Some(gender) = other.strip_prefix("gender_").filter(|g| !g.is_empty()) {
                    Action::Gender(gender.to_string())
                } else {
                    return Err(());
                }
            }
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Command(Command),
    Callback(Action),
    Text(String),
    Photo {
        file_ref: String,
        caption: Option<String>,
    },
}

/// Menu rendering belongs to the transport's UI; the dispatcher only says which
/// menu to show and for whom.
pub trait MenuPresenter: Send + Sync {
    fn main_menu(&self, user: &UserRecord);
    fn settings_menu(&self, user: &UserRecord);
    fn language_menu(&self, user_id: UserId);
    fn gender_menu(&self, user_id: UserId);
}

/// Routes one inbound event for one user to the session manager.
pub struct Dispatcher {
    sessions: Arc<SessionManager>,
    menus: Arc<dyn MenuPresenter>,
}

impl Dispatcher {
    pub fn new(sessions: Arc<SessionManager>, menus: Arc<dyn MenuPresenter>) -> Self {
        Self { sessions, menus }
    }

    pub fn handle(&self, user_id: UserId, event: Event) -> Result<(), StoreError> {
        debug!(user = %user_id, ?event, "inbound event");
        match event {
            Event::Command(command) => self.handle_command(user_id, command),
            Event::Callback(action) => self.handle_callback(user_id, action),
            Event::Text(text) => self.relay_or_menu(user_id, ChatContent::Text(text)),
            Event::Photo { file_ref, caption } => {
                self.relay_or_menu(user_id, ChatContent::Photo { file_ref, caption })
            }
        }
    }

    fn handle_command(&self, user_id: UserId, command: Command) -> Result<(), StoreError> {
        let queue = self.sessions.queue();
        match command {
            Command::Start => {
                queue.enqueue_text(user_id, WELCOME);
                self.show_main_menu(user_id)
            }
            Command::End => self.sessions.end_chat(user_id, EndReason::UserRequested).map(drop),
            Command::Country(country) if country.is_empty() => {
                queue.enqueue_text(user_id, COUNTRY_PROMPT);
                Ok(())
            }
            Command::Country(country) => {
                let user = self.sessions.set_preference(
                    user_id,
                    PreferenceKind::Country,
                    Some(country),
                )?;
                self.menus.settings_menu(&user);
                Ok(())
            }
            Command::Unknown(_) => {
                queue.enqueue_text(user_id, UNKNOWN_COMMAND);
                Ok(())
            }
        }
    }

    fn handle_callback(&self, user_id: UserId, action: Action) -> Result<(), StoreError> {
        match action {
            Action::ShowActive => {
                let queue = self.sessions.queue();
                match self.sessions.active_users() {
                    Ok(count) => queue.enqueue_text(user_id, format!("Active users: {count}")),
                    Err(_) => queue.enqueue_text(user_id, ACTIVE_COUNT_ERROR),
                }
                Ok(())
            }
            Action::ToggleActive => {
                let user = self.sessions.toggle_active(user_id)?;
                self.menus.main_menu(&user);
                Ok(())
            }
            Action::Settings => {
                let user = self.sessions.user(user_id)?;
                self.menus.settings_menu(&user);
                Ok(())
            }
            Action::BackToMain => self.show_main_menu(user_id),
            Action::FindMatch => self.sessions.request_match(user_id).map(drop),
            Action::SetCountry => {
                self.sessions.queue().enqueue_text(user_id, COUNTRY_PROMPT);
                Ok(())
            }
            Action::Clear(kind) => self.update_preference(user_id, kind, None),
            Action::SetLanguage => {
                self.menus.language_menu(user_id);
                Ok(())
            }
            Action::SetGender => {
                self.menus.gender_menu(user_id);
                Ok(())
            }
            Action::Language(language) => {
                self.update_preference(user_id, PreferenceKind::Language, Some(language))
            }
            Action::Gender(gender) => {
                self.update_preference(user_id, PreferenceKind::Gender, Some(gender))
            }
        }
    }

    fn update_preference(
        &self,
        user_id: UserId,
        kind: PreferenceKind,
        value: Option<String>,
    ) -> Result<(), StoreError> {
        let user = self.sessions.set_preference(user_id, kind, value)?;
        self.menus.settings_menu(&user);
        Ok(())
    }

    fn relay_or_menu(&self, user_id: UserId, content: ChatContent) -> Result<(), StoreError> {
        match self.sessions.relay(user_id, content)? {
            RelayOutcome::Forwarded { .. } => Ok(()),
            RelayOutcome::NotInChat => self.show_main_menu(user_id),
        }
    }

    fn show_main_menu(&self, user_id: UserId) -> Result<(), StoreError> {
        let user = self.sessions.user(user_id)?;
        self.menus.main_menu(&user);
        Ok(())
    }
}
