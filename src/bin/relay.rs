use anon_relay::libs::config::RelayConfig;
use anon_relay::libs::handlers::{Action, Command, Event, MenuPresenter, GENDERS, LANGUAGES};
use anon_relay::libs::message_queue::OutboundQueue;
use anon_relay::libs::messenger::LogMessenger;
use anon_relay::{init_database, Relay, UserId, UserRecord};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Renders menus as plain text listing the callback data of each button.
struct TextMenus {
    queue: Arc<OutboundQueue>,
}

impl MenuPresenter for TextMenus {
    fn main_menu(&self, user: &UserRecord) {
        let status = if user.active {
            "Status: Online"
        } else {
            "Status: Offline"
        };
        self.queue.enqueue_text(
            user.user_id,
            format!(
                "Main Menu - Use the buttons below to interact with the bot.\n\
                 [Show Active Users #show_active] [{status} #toggle_active]\n\
                 [Settings #settings] [Find Match #find_match]"
            ),
        );
    }

    fn settings_menu(&self, user: &UserRecord) {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "Not set".to_string());
        let prefs = &user.preferences;
        self.queue.enqueue_text(
            user.user_id,
            format!(
                "Settings Menu - Select an option to change or clear:\n\
                 [Country: {} #set_country] [Clear #clear_country]\n\
                 [Language: {} #set_language] [Clear #clear_language]\n\
                 [Gender: {} #set_gender] [Clear #clear_gender]\n\
                 [Back to Main Menu #back_to_main]",
                show(&prefs.country),
                show(&prefs.language),
                show(&prefs.gender),
            ),
        );
    }

    fn language_menu(&self, user_id: UserId) {
        let buttons: Vec<String> = LANGUAGES.iter().map(|l| format!("[#lang_{l}]")).collect();
        self.queue.enqueue_text(
            user_id,
            format!("Select your language:\n{}\n[Back to Settings #settings]", buttons.join(" ")),
        );
    }

    fn gender_menu(&self, user_id: UserId) {
        let buttons: Vec<String> = GENDERS.iter().map(|g| format!("[#gender_{g}]")).collect();
        self.queue.enqueue_text(
            user_id,
            format!("Select your gender:\n{}\n[Back to Settings #settings]", buttons.join(" ")),
        );
    }
}

/// `<user_id> /command`, `<user_id> #callback_data`, `<user_id> !photo <file> [caption]`
/// or `<user_id> <text>`.
fn parse_line(line: &str) -> Option<(UserId, Event)> {
    let (user, input) = line.trim().split_once(char::is_whitespace)?;
    let user_id = user.parse::<UserId>().ok()?;
    let input = input.trim();

    let event = if let Ok(command) = input.parse::<Command>() {
        Event::Command(command)
    } else if let Some(data) = input.strip_prefix('#') {
        Event::Callback(data.parse::<Action>().ok()?)
    } else if let Some(rest) = input.strip_prefix("!photo") {
        let rest = rest.trim();
        let (file_ref, caption) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        if file_ref.is_empty() {
            return None;
        }
        Event::Photo {
            file_ref: file_ref.to_string(),
            caption: (!caption.trim().is_empty()).then(|| caption.trim().to_string()),
        }
    } else {
        Event::Text(input.to_string())
    };
    Some((user_id, event))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("Starting anonymous chat relay...");
    let config = RelayConfig::from_env()?;
    let store = Arc::new(init_database(&config.database_path)?);

    let queue = Arc::new(OutboundQueue::new(Arc::new(LogMessenger), config.rate_limit));
    let menus = Arc::new(TextMenus {
        queue: Arc::clone(&queue),
    });
    let relay = Arc::new(Relay::new(&config, store, queue, menus));
    relay.start();
    info!("Relay started; reading events from stdin");

    let handlers = TaskTracker::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let Some((user_id, event)) = parse_line(&line) else {
                    warn!("Unrecognised input: {line}");
                    continue;
                };
                let relay = Arc::clone(&relay);
                // store errors are already logged by the session manager
                handlers.spawn_blocking(move || {
                    let _ = relay.dispatcher.handle(user_id, event);
                });
            }
        }
    }

    info!("Shutting down relay...");
    handlers.close();
    handlers.wait().await;
    relay.stop();
    info!("Relay stopped");
    Ok(())
}
