//! Control messages posted by open pages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CacheManager;
use crate::fetch::Fetcher;

/// Inbound page message. Only the `type` field is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl ClientMessage {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: Some(kind.into()) }
    }

    /// Recognized command, if any.
    pub fn command(&self) -> Option<ControlCommand> {
        match self.kind.as_deref() {
            Some(ControlCommand::SKIP_WAITING) => Some(ControlCommand::SkipWaiting),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlCommand {
    SkipWaiting,
}

impl ControlCommand {
    pub const SKIP_WAITING: &'static str = "SKIP_WAITING";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "result", content = "command")]
pub enum MessageOutcome {
    Handled(ControlCommand),
    /// Unknown, missing or malformed type
    Ignored,
}

impl<F: Fetcher + 'static> CacheManager<F> {
    /// Handle one message posted by a page. Anything unrecognized is ignored.
    pub async fn handle_message(&self, message: &Value) -> MessageOutcome {
        let command = match serde_json::from_value::<ClientMessage>(message.clone()) {
            Ok(parsed) => parsed.command(),
            Err(_) => None,
        };

        match command {
            Some(ControlCommand::SkipWaiting) => {
                tracing::info!("Received SKIP_WAITING message");
                self.lifecycle().skip_waiting().await;
                MessageOutcome::Handled(ControlCommand::SkipWaiting)
            }
            None => {
                tracing::debug!(%message, "ignoring message");
                MessageOutcome::Ignored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::testing::{MockFetcher, manager};
    use super::*;

    #[test]
    fn test_client_message_command() {
        assert_eq!(ClientMessage::new("SKIP_WAITING").command(), Some(ControlCommand::SkipWaiting));
        assert_eq!(ClientMessage::new("skip_waiting").command(), None);
        assert_eq!(ClientMessage::default().command(), None);
    }

    #[test]
    fn test_client_message_deserializes_type_field() {
        let message: ClientMessage = serde_json::from_value(json!({"type": "SKIP_WAITING", "extra": 1})).unwrap();
        assert_eq!(message.kind.as_deref(), Some("SKIP_WAITING"));
    }

    #[test]
    fn test_outcome_serialization() {
        let handled = serde_json::to_value(MessageOutcome::Handled(ControlCommand::SkipWaiting)).unwrap();
        assert_eq!(handled, json!({"result": "handled", "command": "SKIP_WAITING"}));
        assert_eq!(serde_json::to_value(MessageOutcome::Ignored).unwrap(), json!({"result": "ignored"}));
    }

    #[tokio::test]
    async fn test_skip_waiting_message() {
        let manager = manager(MockFetcher::new()).await;
        assert!(!manager.lifecycle().snapshot().await.skip_waiting);

        let outcome = manager.handle_message(&json!({"type": "SKIP_WAITING"})).await;
        assert_eq!(outcome, MessageOutcome::Handled(ControlCommand::SkipWaiting));
        assert!(manager.lifecycle().snapshot().await.skip_waiting);
    }

    #[tokio::test]
    async fn test_other_messages_ignored() {
        let manager = manager(MockFetcher::new()).await;

        for message in [
            json!({"type": "CLAIM"}),
            json!({"type": 42}),
            json!({}),
            json!(null),
            json!("SKIP_WAITING"),
            json!([{"type": "SKIP_WAITING"}]),
        ] {
            assert_eq!(manager.handle_message(&message).await, MessageOutcome::Ignored, "{message}");
        }
        assert!(!manager.lifecycle().snapshot().await.skip_waiting);
    }
}
