//! Signing key resolution against the provider's published key set.
//!
//! Keys are fetched lazily from `{authority}/.well-known/jwks.json`, cached
//! by key id for a configurable TTL (24 hours by default), and refreshed on
//! cache miss or expiry. Remote fetches are bounded by a fixed per-minute
//! budget so a flood of bogus key ids cannot turn into a flood of requests
//! to the provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::JwkSet;
use parking_lot::{Mutex, RwLock};

use super::error::VerifyError;

/// Time source for cache expiry and the fetch window. Injected so tests
/// can drive expiry deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock used in production.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CachedKey {
    key: Arc<DecodingKey>,
    fetched_at: Instant,
}

/// TTL-aware cache of decoding keys, keyed by key id.
///
/// Stale entries are overwritten by the next successful fetch rather than
/// purged; a read past the TTL simply reports a miss.
pub struct KeyCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedKey>>,
}

impl KeyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, kid: &str, now: Instant) -> Option<Arc<DecodingKey>> {
        let entries = self.entries.read();
        let entry = entries.get(kid)?;
        if now.duration_since(entry.fetched_at) < self.ttl {
            Some(entry.key.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, kid: String, key: Arc<DecodingKey>, now: Instant) {
        self.entries
            .write()
            .insert(kid, CachedKey { key, fetched_at: now });
    }
}

/// Fixed-window bound on remote key-set fetches. When the window budget is
/// spent, callers fail fast instead of queuing.
pub struct FetchGate {
    max_per_window: u32,
    window: Duration,
    state: Mutex<GateState>,
}

struct GateState {
    window_start: Instant,
    used: u32,
}

impl FetchGate {
    pub fn new(max_per_window: u32, window: Duration, now: Instant) -> Self {
        Self {
            max_per_window,
            window,
            state: Mutex::new(GateState {
                window_start: now,
                used: 0,
            }),
        }
    }

    /// Take one fetch slot from the current window, if any remain.
    pub fn try_acquire(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        if now.duration_since(state.window_start) >= self.window {
            state.window_start = now;
            state.used = 0;
        }
        if state.used >= self.max_per_window {
            return false;
        }
        state.used += 1;
        true
    }
}

/// Resolves public signing keys by key id.
///
/// Cache hits within the TTL return without touching the network. On a
/// miss, the whole key-set document is fetched and every keyed entry is
/// cached. Concurrent misses for the same key id may fetch twice; the
/// second write wins.
pub struct KeyResolver {
    http: reqwest::Client,
    jwks_url: String,
    cache: KeyCache,
    gate: FetchGate,
    clock: Arc<dyn Clock>,
}

impl KeyResolver {
    pub fn new(
        http: reqwest::Client,
        jwks_url: String,
        ttl: Duration,
        max_fetches_per_minute: u32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        Self {
            http,
            jwks_url,
            cache: KeyCache::new(ttl),
            gate: FetchGate::new(max_fetches_per_minute, Duration::from_secs(60), now),
            clock,
        }
    }

    pub async fn resolve(&self, kid: &str) -> Result<Arc<DecodingKey>, VerifyError> {
        let now = self.clock.now();
        if let Some(key) = self.cache.get(kid, now) {
            return Ok(key);
        }

        if !self.gate.try_acquire(now) {
            tracing::warn!(kid, "Key set fetch budget exhausted");
            return Err(VerifyError::KeyFetch(
                "key set fetch budget exhausted".to_string(),
            ));
        }

        tracing::debug!(kid, url = %self.jwks_url, "Fetching key set");
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| VerifyError::KeyFetch(format!("key set request failed: {e}")))?
            .error_for_status()
            .map_err(|e| VerifyError::KeyFetch(format!("key set endpoint error: {e}")))?;

        let key_set: JwkSet = response
            .json()
            .await
            .map_err(|e| VerifyError::KeyFetch(format!("invalid key set document: {e}")))?;

        let fetched_at = self.clock.now();
        let mut requested = None;
        for jwk in &key_set.keys {
            let Some(id) = jwk.common.key_id.as_deref() else {
                continue;
            };
            let Ok(key) = DecodingKey::from_jwk(jwk) else {
                tracing::warn!(kid = id, "Skipping unusable key set entry");
                continue;
            };
            let key = Arc::new(key);
            if id == kid {
                requested = Some(key.clone());
            }
            self.cache.insert(id.to_string(), key, fetched_at);
        }

        requested.ok_or_else(|| {
            VerifyError::KeyFetch(format!("key set has no entry for key id {kid:?}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        fn advance(&self, by: Duration) {
            *self.now.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock()
        }
    }

    fn test_key() -> Arc<DecodingKey> {
        Arc::new(DecodingKey::from_secret(b"irrelevant"))
    }

    #[test]
    fn cache_hit_within_ttl() {
        let clock = ManualClock::new();
        let cache = KeyCache::new(Duration::from_secs(60));
        cache.insert("k1".into(), test_key(), clock.now());

        clock.advance(Duration::from_secs(59));
        assert!(cache.get("k1", clock.now()).is_some());
    }

    #[test]
    fn cache_miss_after_ttl() {
        let clock = ManualClock::new();
        let cache = KeyCache::new(Duration::from_secs(60));
        cache.insert("k1".into(), test_key(), clock.now());

        clock.advance(Duration::from_secs(60));
        assert!(cache.get("k1", clock.now()).is_none());
    }

    #[test]
    fn cache_miss_for_unknown_kid() {
        let clock = ManualClock::new();
        let cache = KeyCache::new(Duration::from_secs(60));
        assert!(cache.get("nope", clock.now()).is_none());
    }

    #[test]
    fn stale_entry_is_overwritten_not_purged() {
        let clock = ManualClock::new();
        let cache = KeyCache::new(Duration::from_secs(60));
        cache.insert("k1".into(), test_key(), clock.now());
        clock.advance(Duration::from_secs(120));
        assert!(cache.get("k1", clock.now()).is_none());

        cache.insert("k1".into(), test_key(), clock.now());
        assert!(cache.get("k1", clock.now()).is_some());
    }

    #[test]
    fn gate_exhausts_within_window() {
        let clock = ManualClock::new();
        let gate = FetchGate::new(3, Duration::from_secs(60), clock.now());

        assert!(gate.try_acquire(clock.now()));
        assert!(gate.try_acquire(clock.now()));
        assert!(gate.try_acquire(clock.now()));
        assert!(!gate.try_acquire(clock.now()));
    }

    #[test]
    fn gate_refills_after_window() {
        let clock = ManualClock::new();
        let gate = FetchGate::new(1, Duration::from_secs(60), clock.now());

        assert!(gate.try_acquire(clock.now()));
        assert!(!gate.try_acquire(clock.now()));

        clock.advance(Duration::from_secs(60));
        assert!(gate.try_acquire(clock.now()));
    }
}
