use rand::Rng;
use url::Url;

use crate::config::FailoverAlgorithm;
use crate::types::{PushError, Result};

/// The ordered server list and the failover walk over it.
///
/// `current_index` starts at 0 for ordered/random and at -1 for priority,
/// where -1 means "not yet pinned": the next pick falls through to index 0,
/// so priority failover always restarts from the top server after recovery.
#[derive(Debug, Clone)]
pub struct ServerList {
    servers: Vec<Url>,
    algorithm: FailoverAlgorithm,
    current_index: isize,
}

impl ServerList {
    pub fn new(servers: &[String], algorithm: FailoverAlgorithm) -> Result<Self> {
        if servers.is_empty() {
            return Err(PushError::Configuration(
                "server list must not be empty".to_string(),
            ));
        }
        let servers = servers
            .iter()
            .map(|raw| {
                Url::parse(raw).map_err(|e| {
                    PushError::Configuration(format!("invalid server URL '{}': {}", raw, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let current_index = match algorithm {
            FailoverAlgorithm::Priority => -1,
            _ => 0,
        };
        Ok(Self {
            servers,
            algorithm,
            current_index,
        })
    }

    /// The endpoint used for the very first connection attempt.
    pub fn initial(&self) -> &Url {
        &self.servers[0]
    }

    /// Advances the failover walk and returns the endpoint for the next
    /// reconnect attempt.
    pub fn pick_next(&mut self) -> Url {
        let len = self.servers.len() as isize;
        self.current_index = match self.algorithm {
            FailoverAlgorithm::Ordered | FailoverAlgorithm::Priority => {
                (self.current_index + 1).rem_euclid(len)
            }
            FailoverAlgorithm::Random => {
                rand::rng().random_range(0..self.servers.len()) as isize
            }
        };
        self.servers[self.current_index as usize].clone()
    }

    /// Re-pins the priority walk to the top of the list. Called on every
    /// transition into the connected state; a no-op for other algorithms.
    pub fn reset_walk(&mut self) {
        if self.algorithm == FailoverAlgorithm::Priority {
            self.current_index = -1;
        }
    }

    pub fn current_index(&self) -> isize {
        self.current_index
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn list(urls: &[&str], algorithm: FailoverAlgorithm) -> ServerList {
        let urls: Vec<String> = urls.iter().map(|s| s.to_string()).collect();
        ServerList::new(&urls, algorithm).unwrap()
    }

    #[test]
    fn test_empty_list_is_a_configuration_error() {
        assert!(matches!(
            ServerList::new(&[], FailoverAlgorithm::Ordered),
            Err(PushError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_url_is_a_configuration_error() {
        assert!(matches!(
            ServerList::new(&["not a url".to_string()], FailoverAlgorithm::Ordered),
            Err(PushError::Configuration(_))
        ));
    }

    #[test]
    fn test_ordered_walks_round_robin() {
        let mut servers = list(
            &["http://a.example.com/", "http://b.example.com/", "http://c.example.com/"],
            FailoverAlgorithm::Ordered,
        );
        assert_eq!(servers.initial().host_str(), Some("a.example.com"));
        let picks: Vec<_> = (0..6)
            .map(|_| servers.pick_next().host_str().unwrap().to_string())
            .collect();
        assert_eq!(
            picks,
            vec![
                "b.example.com",
                "c.example.com",
                "a.example.com",
                "b.example.com",
                "c.example.com",
                "a.example.com"
            ]
        );
    }

    #[test]
    fn test_priority_restarts_from_top_after_recovery() {
        let mut servers = list(
            &["http://a.example.com/", "http://b.example.com/"],
            FailoverAlgorithm::Priority,
        );
        assert_eq!(servers.current_index(), -1);
        assert_eq!(servers.pick_next().host_str(), Some("a.example.com"));
        assert_eq!(servers.pick_next().host_str(), Some("b.example.com"));
        servers.reset_walk();
        assert_eq!(servers.pick_next().host_str(), Some("a.example.com"));
    }

    #[test]
    fn test_reset_walk_does_not_touch_ordered() {
        let mut servers = list(
            &["http://a.example.com/", "http://b.example.com/"],
            FailoverAlgorithm::Ordered,
        );
        servers.pick_next();
        servers.reset_walk();
        assert_eq!(servers.current_index(), 1);
    }

    #[test]
    fn test_random_stays_in_bounds() {
        let mut servers = list(
            &["http://a.example.com/", "http://b.example.com/", "http://c.example.com/"],
            FailoverAlgorithm::Random,
        );
        for _ in 0..50 {
            servers.pick_next();
            assert!((0..3).contains(&servers.current_index()));
        }
    }

    proptest! {
        #[test]
        fn prop_ordered_visits_every_server_each_cycle(count in 1usize..8) {
            let urls: Vec<String> = (0..count)
                .map(|i| format!("http://server-{}.example.com/", i))
                .collect();
            let mut servers = ServerList::new(&urls, FailoverAlgorithm::Ordered).unwrap();
            let mut seen = vec![0usize; count];
            for _ in 0..count {
                servers.pick_next();
                seen[servers.current_index() as usize] += 1;
            }
            prop_assert!(seen.iter().all(|&n| n == 1));
        }
    }
}
