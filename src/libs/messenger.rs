use crate::libs::core::models::UserId;
use thiserror::Error;
use tracing::info;

/// Outbound transport. Each call is a single delivery attempt.
pub trait Messenger: Send + Sync {
    fn send_text(&self, destination: UserId, text: &str) -> Result<(), MessengerError>;
    fn send_photo(
        &self,
        destination: UserId,
        file_ref: &str,
        caption: Option<&str>,
    ) -> Result<(), MessengerError>;
}

#[derive(Error, Debug)]
pub enum MessengerError {
    #[error("Transport Error: {0}")]
    Transport(String),
}

/// Messenger that writes every delivery to the log instead of a chat network.
#[derive(Debug, Default, Clone)]
pub struct LogMessenger;

impl Messenger for LogMessenger {
    fn send_text(&self, destination: UserId, text: &str) -> Result<(), MessengerError> {
        info!(target: "relay::outbound", %destination, "{text}");
        Ok(())
    }

    fn send_photo(
        &self,
        destination: UserId,
        file_ref: &str,
        caption: Option<&str>,
    ) -> Result<(), MessengerError> {
        info!(
            target: "relay::outbound",
            %destination,
            file_ref,
            caption = caption.unwrap_or(""),
            "[photo]"
        );
        Ok(())
    }
}
