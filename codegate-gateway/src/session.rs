//! In-memory admin session store.
//!
//! Maps opaque bearer tokens to their expiry. Validation takes the read
//! lock only and never mutates; expired entries linger until the next
//! [`SessionStore::sweep`], which runs on a background interval
//! ([`spawn_sweeper`]) rather than on the request path.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use rand::{rngs::OsRng, RngCore};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Lifetime of an issued session token.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest lifetime a token can be issued with; larger TTLs are clamped.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Default period of the background sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Thread-safe table of live admin sessions.
#[derive(Debug)]
pub struct SessionStore {
    tokens: RwLock<HashMap<String, Instant>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create an empty store issuing tokens valid for [`DEFAULT_SESSION_TTL`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }

    /// Create an empty store with a custom token lifetime.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { tokens: RwLock::new(HashMap::new()), ttl }
    }

    /// Issue a fresh token valid for the store's TTL.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    pub fn issue(&self) -> String {
        self.issue_with_ttl(self.ttl)
    }

    /// Issue a fresh token valid for `ttl`, clamped to [`MAX_SESSION_TTL`].
    ///
    /// The token is 32 bytes from the OS CSPRNG, hex-encoded. It is never
    /// one already present in the store.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    pub fn issue_with_ttl(&self, ttl: Duration) -> String {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut tokens = self.tokens.write().expect("session store write lock poisoned");
        let mut token = generate_token();
        while tokens.contains_key(&token) {
            token = generate_token();
        }
        tokens.insert(token.clone(), Instant::now() + ttl.min(MAX_SESSION_TTL));
        token
    }

    /// Return `true` if `token` is known and has not yet expired.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn validate(&self, token: &str) -> bool {
        let now = Instant::now();
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let tokens = self.tokens.read().expect("session store read lock poisoned");
        tokens.get(token).is_some_and(|expiry| now < *expiry)
    }

    /// Remove every expired entry. Returns how many were removed.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let mut tokens = self.tokens.write().expect("session store write lock poisoned");
        let before = tokens.len();
        tokens.retain(|_, expiry| now < *expiry);
        before - tokens.len()
    }

    /// Number of stored entries, expired ones included.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
        let tokens = self.tokens.read().expect("session store read lock poisoned");
        tokens.len()
    }

    /// Return `true` if no entries are stored.
    ///
    /// # Panics
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Run [`SessionStore::sweep`] every `every` until the task is aborted.
///
/// The first sweep happens one full period after spawning.
pub fn spawn_sweeper(store: Arc<SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = store.sweep();
            if removed > 0 {
                tracing::debug!(removed, remaining = store.len(), "swept expired sessions");
            }
        }
    })
}
