//! Vault sessions.
//!
//! A session is an ephemeral, server-held "unlocked" marker bound to one
//! master-passcode (or credential) proof. It holds the derived vault key
//! for its lifetime and dies on explicit lock or TTL expiry; expiry behaves
//! exactly like a lock.

use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;
use vigil_crypto::DerivedKey;

pub const DEFAULT_SESSION_TTL_SECS: i64 = 15 * 60;

/// Handle returned to the caller. The token is required on every vault read.
#[derive(Clone, Debug)]
pub struct VaultSession {
    pub token: String,
    pub created_at: i64,
    pub expires_at: i64,
}

struct ActiveSession {
    key: DerivedKey,
    expires_at: i64,
}

/// In-memory registry of active sessions.
pub struct SessionBook {
    sessions: RwLock<HashMap<String, ActiveSession>>,
    ttl_secs: i64,
}

impl SessionBook {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl_secs,
        }
    }

    /// Mints a session holding the vault key.
    pub fn create(&self, key: DerivedKey) -> VaultSession {
        let now = chrono::Utc::now().timestamp();
        let token = Uuid::new_v4().to_string();
        let expires_at = now + self.ttl_secs;

        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(token.clone(), ActiveSession { key, expires_at });
        sessions.retain(|_, s| s.expires_at > now);

        VaultSession {
            token,
            created_at: now,
            expires_at,
        }
    }

    /// Returns the session's vault key if the token is active and unexpired.
    /// Expired sessions are dropped on sight.
    pub fn key_for(&self, token: &str) -> Option<DerivedKey> {
        let now = chrono::Utc::now().timestamp();
        let mut sessions = self.sessions.write().unwrap();

        match sessions.get(token) {
            Some(s) if s.expires_at > now => Some(s.key.clone()),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    /// Destroys a session immediately.
    pub fn remove(&self, token: &str) {
        self.sessions.write().unwrap().remove(token);
    }

    pub fn active_count(&self) -> usize {
        let now = chrono::Utc::now().timestamp();
        self.sessions
            .read()
            .unwrap()
            .values()
            .filter(|s| s.expires_at > now)
            .count()
    }
}
