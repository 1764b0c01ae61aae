use url::Url;
use uuid::Uuid;

use crate::config::ConnectionType;

/// The logical identity of one client's relationship to the server.
///
/// Created once per `connect` call. `uid` and `domain` are immutable for the
/// session's lifetime; `connection_type` may be demoted from `Streaming` to
/// `Polling` exactly once by the initial-confirmation fallback.
#[derive(Debug, Clone)]
pub struct Session {
    pub uid: String,
    pub domain: String,
    pub connection_type: ConnectionType,
}

impl Session {
    pub fn new(
        static_uid: Option<String>,
        endpoint: &Url,
        connection_type: ConnectionType,
    ) -> Self {
        let uid = static_uid.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let domain = endpoint.host_str().unwrap_or_default().to_string();
        Self {
            uid,
            domain,
            connection_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_uid_is_kept() {
        let endpoint = Url::parse("http://push.example.com/").unwrap();
        let session = Session::new(
            Some("trader-7".to_string()),
            &endpoint,
            ConnectionType::Streaming,
        );
        assert_eq!(session.uid, "trader-7");
        assert_eq!(session.domain, "push.example.com");
    }

    #[test]
    fn test_generated_uids_are_unique() {
        let endpoint = Url::parse("http://push.example.com/").unwrap();
        let a = Session::new(None, &endpoint, ConnectionType::Streaming);
        let b = Session::new(None, &endpoint, ConnectionType::Streaming);
        assert!(!a.uid.is_empty());
        assert_ne!(a.uid, b.uid);
    }
}
