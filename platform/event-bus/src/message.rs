//! Outbound message model shared by all broker implementations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Metadata stamped on every published message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageProperties {
    pub content_type: String,

    /// When the producer created the message
    pub timestamp: DateTime<Utc>,

    /// Deduplication key for downstream consumers
    pub message_id: Option<String>,

    /// Tracing key linking the message to its originating entity
    pub correlation_id: Option<String>,
}

/// A message ready for submission to an exchange
///
/// Owned by the publisher for the duration of one publish call; the broker owns
/// it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub body: Vec<u8>,
    pub properties: MessageProperties,
}

impl OutboundMessage {
    /// Create a JSON message stamped with the current time
    pub fn json(body: Vec<u8>) -> Self {
        Self {
            body,
            properties: MessageProperties {
                content_type: JSON_CONTENT_TYPE.to_string(),
                timestamp: Utc::now(),
                message_id: None,
                correlation_id: None,
            },
        }
    }

    /// Set the message ID
    pub fn with_message_id(mut self, message_id: Option<String>) -> Self {
        self.properties.message_id = message_id;
        self
    }

    /// Set the correlation ID
    pub fn with_correlation_id(mut self, correlation_id: Option<String>) -> Self {
        self.properties.correlation_id = correlation_id;
        self
    }
}

/// A message as delivered into a queue by the in-memory broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub queue: String,
    pub message: OutboundMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_message_defaults() {
        let before = Utc::now();
        let msg = OutboundMessage::json(b"[1,2]".to_vec());

        assert_eq!(msg.properties.content_type, "application/json");
        assert!(msg.properties.timestamp >= before);
        assert!(msg.properties.message_id.is_none());
        assert!(msg.properties.correlation_id.is_none());
    }

    #[test]
    fn test_message_builder() {
        let msg = OutboundMessage::json(Vec::new())
            .with_message_id(Some("cast-1".to_string()))
            .with_correlation_id(Some("cast-1".to_string()));

        assert_eq!(msg.properties.message_id.as_deref(), Some("cast-1"));
        assert_eq!(msg.properties.correlation_id.as_deref(), Some("cast-1"));
    }
}
