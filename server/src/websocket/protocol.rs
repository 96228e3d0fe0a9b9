//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded and tagged by `type`.

use migrator_engine::SyncEvent;
use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A sync task changed phase.
    Event { event: SyncEvent },

    /// The connection fell behind and skipped this many events.
    Lagged { missed: u64 },

    /// Error processing a client message.
    Error { message: String },

    /// Keep-alive pong.
    Pong,
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrator_engine::{EntityKind, SyncOperation, SyncPhase, SyncTask};
    use serde_json::json;

    #[test]
    fn event_wire_format() {
        let message = ServerMessage::Event {
            event: SyncEvent {
                task: SyncTask::new(SyncOperation::PullAll, EntityKind::Employee),
                phase: SyncPhase::Completed,
                count: Some(12),
                error: None,
            },
        };

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "type": "event",
                "event": {
                    "task": {"operation": "pullAll", "collection": "employees"},
                    "phase": "completed",
                    "count": 12
                }
            })
        );
    }

    #[test]
    fn ping_parses() {
        let message: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(message, ClientMessage::Ping));
    }
}
