//! API Key Pool Management
//!
//! Round-robin credential rotation with a dynamic blocklist. One pool per
//! provider, shared by every in-flight request for the process lifetime.

use crate::error::{LazywriteError, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A single provider credential
///
/// Cheap to clone. `Debug` and `Display` only show a redacted hint so the
/// secret never ends up in logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Arc::from(value.into()))
    }

    /// Get the secret value
    pub fn value(&self) -> &str {
        &self.0
    }

    /// Redacted form, e.g. `sk-o…9f2c`
    pub fn redacted(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 8 {
            return "…".repeat(chars.len().min(3));
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.redacted()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

#[derive(Debug, Default)]
struct PoolState {
    /// Index of the last issued key, `None` before the first issue
    cursor: Option<usize>,

    /// Indices into `keys` that are currently blocked
    blocked: HashSet<usize>,
}

/// Pool of credentials for one provider
#[derive(Debug)]
pub struct KeyPool {
    /// Provider name this pool belongs to
    provider: String,

    /// Credentials in priority order
    keys: Vec<Credential>,

    /// Cursor and blocklist, mutated together
    state: Mutex<PoolState>,

    /// Credentials handed out so far
    issued: AtomicU64,
}

impl KeyPool {
    /// Create a new key pool. Empty and duplicate entries are dropped.
    pub fn new(provider: impl Into<String>, keys: Vec<String>) -> Self {
        let mut unique: Vec<Credential> = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.trim();
            if key.is_empty() || unique.iter().any(|k| k.value() == key) {
                continue;
            }
            unique.push(Credential::new(key));
        }

        Self {
            provider: provider.into(),
            keys: unique,
            state: Mutex::new(PoolState::default()),
            issued: AtomicU64::new(0),
        }
    }

    /// Get the provider name
    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Next unblocked credential in rotation order
    ///
    /// The cursor starts unset, so the first call returns `keys[0]`.
    /// Scans at most `len` slots starting after the cursor and fails with
    /// [`LazywriteError::PoolExhausted`] when nothing is usable.
    pub fn next(&self) -> Result<Credential> {
        let len = self.keys.len();
        let mut state = self.state.lock();

        let start = state.cursor.map_or(0, |c| (c + 1) % len.max(1));
        for offset in 0..len {
            let idx = (start + offset) % len;
            if !state.blocked.contains(&idx) {
                state.cursor = Some(idx);
                self.issued.fetch_add(1, Ordering::Relaxed);
                return Ok(self.keys[idx].clone());
            }
        }

        Err(LazywriteError::PoolExhausted {
            provider: self.provider.clone(),
            retry_after: None,
        })
    }

    /// Block a credential. Returns `true` if it was newly blocked.
    pub fn block(&self, credential: &Credential) -> bool {
        match self.index_of(credential) {
            Some(idx) => self.state.lock().blocked.insert(idx),
            None => false,
        }
    }

    /// Unblock a credential. Returns `true` if it was blocked.
    pub fn unblock(&self, credential: &Credential) -> bool {
        match self.index_of(credential) {
            Some(idx) => self.state.lock().blocked.remove(&idx),
            None => false,
        }
    }

    /// Unblock every credential, returning how many were blocked
    pub fn reset_all(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.blocked.len();
        state.blocked.clear();
        count
    }

    pub fn is_blocked(&self, credential: &Credential) -> bool {
        self.index_of(credential)
            .is_some_and(|idx| self.state.lock().blocked.contains(&idx))
    }

    /// Whether `next()` would fail right now
    pub fn is_exhausted(&self) -> bool {
        self.state.lock().blocked.len() >= self.keys.len()
    }

    /// Get statistics about the pool
    pub fn stats(&self) -> KeyPoolStats {
        let total = self.keys.len();
        let blocked = self.state.lock().blocked.len();

        KeyPoolStats {
            total_keys: total,
            available_keys: total - blocked,
            blocked_keys: blocked,
            issued: self.issued.load(Ordering::Relaxed),
        }
    }

    fn index_of(&self, credential: &Credential) -> Option<usize> {
        self.keys.iter().position(|k| k == credential)
    }
}

/// Statistics about a key pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPoolStats {
    pub total_keys: usize,
    pub available_keys: usize,
    pub blocked_keys: usize,
    pub issued: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn pool(keys: &[&str]) -> KeyPool {
        KeyPool::new("test", keys.iter().map(|k| k.to_string()).collect())
    }

    fn key(value: &str) -> Credential {
        Credential::new(value)
    }

    #[test]
    fn test_round_robin_covers_every_key() {
        let pool = pool(&["key1", "key2", "key3"]);

        let issued: Vec<String> = (0..3)
            .map(|_| pool.next().unwrap().value().to_string())
            .collect();
        assert_eq!(issued, vec!["key1", "key2", "key3"]);

        // Wraps around
        assert_eq!(pool.next().unwrap().value(), "key1");
    }

    #[test]
    fn test_round_robin_from_any_cursor() {
        let pool = pool(&["a", "b", "c", "d"]);
        pool.next().unwrap();
        pool.next().unwrap();

        let mut seen: Vec<String> = (0..4)
            .map(|_| pool.next().unwrap().value().to_string())
            .collect();
        assert_eq!(seen, vec!["c", "d", "a", "b"]);

        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_blocked_key_is_skipped_until_unblocked() {
        let pool = pool(&["key1", "key2"]);
        assert!(pool.block(&key("key1")));

        for _ in 0..4 {
            assert_eq!(pool.next().unwrap().value(), "key2");
        }

        assert!(pool.unblock(&key("key1")));
        let issued: Vec<String> = (0..2)
            .map(|_| pool.next().unwrap().value().to_string())
            .collect();
        assert!(issued.contains(&"key1".to_string()));
    }

    #[test]
    fn test_block_is_idempotent_and_ignores_unknown() {
        let pool = pool(&["key1", "key2"]);
        assert!(pool.block(&key("key1")));
        assert!(!pool.block(&key("key1")));
        assert!(!pool.block(&key("stranger")));
        assert_eq!(pool.stats().blocked_keys, 1);
    }

    #[test]
    fn test_exhaustion_signal() {
        let empty = KeyPool::new("empty", vec![]);
        assert!(matches!(empty.next(), Err(LazywriteError::PoolExhausted { .. })));
        assert!(empty.is_exhausted());

        let single = pool(&["only"]);
        assert_ok!(single.next());
        single.block(&key("only"));
        assert_err!(single.next());

        let many = pool(&["a", "b", "c"]);
        for k in ["a", "b", "c"] {
            many.block(&key(k));
        }
        assert!(many.is_exhausted());
        assert!(matches!(many.next(), Err(LazywriteError::PoolExhausted { provider, .. }) if provider == "test"));
    }

    #[test]
    fn test_blocked_then_last_key_rate_limited() {
        let pool = pool(&["k1", "k2", "k3"]);
        pool.block(&key("k1"));
        pool.block(&key("k2"));

        let k3 = pool.next().unwrap();
        assert_eq!(k3.value(), "k3");

        pool.block(&k3);
        assert_err!(pool.next());
    }

    #[test]
    fn test_reset_all() {
        let pool = pool(&["k1", "k2"]);
        pool.block(&key("k1"));
        pool.block(&key("k2"));
        assert_eq!(pool.reset_all(), 2);
        assert_ok!(pool.next());
        assert_eq!(pool.stats().available_keys, 2);
    }

    #[test]
    fn test_new_filters_empty_and_duplicate_keys() {
        let pool = KeyPool::new(
            "test",
            vec![
                "".to_string(),
                "key1".to_string(),
                "  ".to_string(),
                "key1".to_string(),
                "key2".to_string(),
            ],
        );
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_credential_redaction() {
        let long = key("sk-or-v1-abcdef123456");
        assert_eq!(long.redacted(), "sk-o…3456");
        assert!(!format!("{:?}", long).contains("abcdef"));
        assert_eq!(key("short").redacted(), "………");
    }

    #[test]
    fn test_concurrent_rotation_keeps_invariants() {
        let pool = Arc::new(pool(&["a", "b", "c", "d"]));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if let Ok(k) = pool.next() {
                            if i % 4 == 0 {
                                pool.block(&k);
                                pool.unblock(&k);
                            }
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = pool.stats();
        assert!(stats.blocked_keys <= stats.total_keys);
        assert_eq!(stats.issued, 800);
    }
}
