use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Result;

/// A decoded inbound frame: the topic it was published on plus the
/// remaining fields of the wire object as an opaque payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicMessage {
    pub topic: String,
    #[serde(flatten)]
    pub payload: Value,
}

impl TopicMessage {
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Decodes a single wire frame. Frames without a `topic` field or with
    /// invalid JSON are an error; callers log and drop them.
    pub fn parse(raw: &str) -> Result<Self> {
        let message: TopicMessage = serde_json::from_str(raw)?;
        Ok(message)
    }

    /// Decodes a poll response, which carries a JSON array of frames.
    pub fn parse_batch(raw: &str) -> Result<Vec<Self>> {
        let messages: Vec<TopicMessage> = serde_json::from_str(raw)?;
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extracts_topic_and_payload() {
        let message = TopicMessage::parse(r#"{"topic":"prices","Symbol":"GOOG","Price":"451.13"}"#)
            .unwrap();
        assert_eq!(message.topic, "prices");
        assert_eq!(message.payload["Symbol"], "GOOG");
        assert_eq!(message.payload["Price"], "451.13");
    }

    #[test]
    fn test_parse_rejects_missing_topic() {
        assert!(TopicMessage::parse(r#"{"Symbol":"GOOG"}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(TopicMessage::parse("not json at all").is_err());
    }

    #[test]
    fn test_parse_batch() {
        let messages =
            TopicMessage::parse_batch(r#"[{"topic":"a","v":1},{"topic":"b","v":2}]"#).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].topic, "a");
        assert_eq!(messages[1].payload["v"], 2);
    }

    #[test]
    fn test_round_trip() {
        let message = TopicMessage::new("quotes", serde_json::json!({"bid": "1.21"}));
        let serialized = serde_json::to_string(&message).unwrap();
        let deserialized = TopicMessage::parse(&serialized).unwrap();
        assert_eq!(message, deserialized);
    }
}
