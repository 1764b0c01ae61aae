use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// Callback invoked with the topic name and the decoded payload of each
/// inbound message on that topic.
pub type TopicListener = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// One topic or several, accepted anywhere the API takes a subscription
/// argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicSet(Vec<String>);

impl TopicSet {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The comma-joined form used by wire requests that name multiple topics
    /// in a single string. Empty topic names are skipped.
    pub fn to_wire_list(&self) -> String {
        self.0
            .iter()
            .filter(|t| !t.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl From<&str> for TopicSet {
    fn from(topic: &str) -> Self {
        Self(vec![topic.to_string()])
    }
}

impl From<String> for TopicSet {
    fn from(topic: String) -> Self {
        Self(vec![topic])
    }
}

impl From<Vec<String>> for TopicSet {
    fn from(topics: Vec<String>) -> Self {
        Self(topics)
    }
}

impl From<Vec<&str>> for TopicSet {
    fn from(topics: Vec<&str>) -> Self {
        Self(topics.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for TopicSet {
    fn from(topics: &[&str]) -> Self {
        Self(topics.iter().map(|t| t.to_string()).collect())
    }
}

/// Mapping from topic name to listener callback.
///
/// A later subscribe to the same topic replaces the earlier listener (last
/// writer wins). The registry survives reconnects, which is what lets the
/// engine replay subscriptions to the server after failover.
#[derive(Default)]
pub struct TopicRegistry {
    listeners: HashMap<String, TopicListener>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, topics: &TopicSet, listener: TopicListener) {
        for topic in topics.iter() {
            // Empty keys never enter the registry.
            if topic.is_empty() {
                tracing::warn!("ignoring subscription to empty topic name");
                continue;
            }
            self.listeners
                .insert(topic.to_string(), Arc::clone(&listener));
        }
    }

    pub fn unsubscribe(&mut self, topics: &TopicSet) {
        for topic in topics.iter() {
            self.listeners.remove(topic);
        }
    }

    pub fn listener_for(&self, topic: &str) -> Option<TopicListener> {
        self.listeners.get(topic).cloned()
    }

    /// Invokes the listener registered for `topic`, if any. Inbound data for
    /// unknown topics is silently dropped: subscribe/unsubscribe
    /// acknowledgements race with incoming data by at least one hop.
    pub fn dispatch(&self, topic: &str, payload: &Value) {
        match self.listeners.get(topic) {
            Some(listener) => listener(topic, payload),
            None => tracing::debug!("no listener for topic '{}', dropping message", topic),
        }
    }

    /// All currently registered topics, for subscription replay.
    pub fn topics(&self) -> TopicSet {
        TopicSet(self.listeners.keys().cloned().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}
