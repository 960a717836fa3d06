// ── Service staleness cache ──
//
// service name -> last time the registry mentioned it. Guarded by its own
// lock, never held while calling into the hub.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// TTL cache of recently seen services.
///
/// An entry not refreshed for at least `ttl` counts as deleted.
pub struct ServiceCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Instant>>,
}

impl ServiceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Record that `service` was seen just now.
    pub async fn stamp(&self, service: &str) {
        self.entries
            .lock()
            .await
            .insert(service.to_owned(), Instant::now());
    }

    /// Returns whether the service was cached.
    pub async fn remove(&self, service: &str) -> bool {
        self.entries.lock().await.remove(service).is_some()
    }

    pub async fn contains(&self, service: &str) -> bool {
        self.entries.lock().await.contains_key(service)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Drop every entry whose age reached the TTL and return their names.
    pub async fn take_expired(&self) -> Vec<String> {
        let now = Instant::now();
        let mut expired = Vec::new();
        self.entries.lock().await.retain(|service, seen| {
            let stale = now.duration_since(*seen) >= self.ttl;
            if stale {
                expired.push(service.clone());
            }
            !stale
        });
        expired.sort();
        expired
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entry_expires_at_ttl() {
        let cache = ServiceCache::new(Duration::from_secs(20));
        cache.stamp("shackbus.rotator.Tower_1").await;

        tokio::time::advance(Duration::from_secs(19)).await;
        assert!(cache.take_expired().await.is_empty());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(
            cache.take_expired().await,
            vec!["shackbus.rotator.Tower_1".to_owned()]
        );
        assert!(cache.is_empty().await);
        assert!(cache.take_expired().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stamp_refreshes_age() {
        let cache = ServiceCache::new(Duration::from_secs(20));
        cache.stamp("a").await;
        tokio::time::advance(Duration::from_secs(15)).await;
        cache.stamp("a").await;
        tokio::time::advance(Duration::from_secs(15)).await;

        assert!(cache.take_expired().await.is_empty());
        assert!(cache.contains("a").await);
    }
}
