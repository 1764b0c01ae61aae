use url::Url;
use uuid::Uuid;

use crate::session::Session;
use crate::types::constants::endpoints;
use crate::types::Result;

/// The operation a queued request performs against the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Subscribe,
    Unsubscribe,
    Publish,
    Poll,
    Disconnect,
}

/// A fully resolved request handed to the transport: the operation, the
/// topic (a comma list for subscribe/unsubscribe), an optional payload and
/// the URL it targets.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub kind: RequestKind,
    pub topic: String,
    pub payload: Option<String>,
    pub url: Url,
}

/// Builds per-operation request URLs for the active endpoint.
///
/// Rebuilt every time the engine (re)connects, so queued requests always
/// resolve against the server currently being attempted rather than one
/// that already failed over.
#[derive(Debug, Clone)]
pub struct RequestUrls {
    base: Url,
    uid: String,
    domain: String,
    nonce: String,
}

impl RequestUrls {
    pub fn new(base: &Url, session: &Session) -> Self {
        Self {
            base: base.clone(),
            uid: session.uid.clone(),
            domain: session.domain.clone(),
            // Cache-busting marker, regenerated per connection.
            nonce: Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn resolve(
        &self,
        kind: RequestKind,
        topic: &str,
        payload: Option<&str>,
    ) -> Result<RequestDescriptor> {
        let path = match kind {
            RequestKind::Subscribe => endpoints::SUBSCRIBE,
            RequestKind::Unsubscribe => endpoints::UNSUBSCRIBE,
            RequestKind::Publish => endpoints::PUBLISH,
            RequestKind::Poll => endpoints::POLL,
            RequestKind::Disconnect => endpoints::DISCONNECT,
        };
        let mut url = self.base.join(path)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("uid", &self.uid)
                .append_pair("domain", &self.domain)
                .append_pair("r", &self.nonce);
            match kind {
                RequestKind::Subscribe | RequestKind::Unsubscribe | RequestKind::Publish => {
                    query.append_pair("topic", topic);
                }
                _ => {}
            }
            if let Some(payload) = payload {
                query.append_pair("payload", payload);
            }
        }
        Ok(RequestDescriptor {
            kind,
            topic: topic.to_string(),
            payload: payload.map(str::to_string),
            url,
        })
    }
}
