//! notifier.rs - Outbound message delivery
//!
//! Delivery is best-effort: callers log failures and move on.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

use crate::error::DeliveryError;
use crate::models::UserId;

const TELEGRAM_API: &str = "https://api.telegram.org";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, user: UserId, text: &str) -> Result<(), DeliveryError>;
}

// ============================================================================
// TelegramNotifier - Bot API sendMessage
// ============================================================================

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: UserId,
    text: &'a str,
}

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(TelegramNotifier {
            client,
            endpoint: format!("{}/bot{}/sendMessage", TELEGRAM_API, bot_token),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, user: UserId, text: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage { chat_id: user, text })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                debug!("Delivered message to {}", user);
                Ok(())
            }
            // Bot blocked by the user or kicked from the chat
            StatusCode::FORBIDDEN => Err(DeliveryError::RecipientUnreachable),
            status => Err(DeliveryError::Rejected { status: status.as_u16() }),
        }
    }
}

// ============================================================================
// LogNotifier - Writes messages to the log only
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, user: UserId, text: &str) -> Result<(), DeliveryError> {
        info!("✉ [to {}] {}", user, text.replace('\n', " | "));
        Ok(())
    }
}

// ============================================================================
// RecordingNotifier - For testing purposes
// ============================================================================

#[cfg(test)]
pub(crate) use recording::RecordingNotifier;


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.send_message(1, "hello").await.unwrap();
        notifier.block(2).await;

        assert!(matches!(
            notifier.send_message(2, "hi").await,
            Err(DeliveryError::RecipientUnreachable)
        ));
        assert_eq!(notifier.sent().await, vec![(1, "hello".to_string())]);
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(LogNotifier.send_message(1, "line\nbreak").await.is_ok());
    }

    #[test]
    fn test_telegram_payload() {
        let payload = serde_json::to_value(SendMessage { chat_id: -100, text: "hi" }).unwrap();
        assert_eq!(payload, serde_json::json!({"chat_id": -100, "text": "hi"}));
    }
}
