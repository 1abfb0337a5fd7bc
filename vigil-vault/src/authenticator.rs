//! Platform-authenticator boundary and challenge bookkeeping.
//!
//! The authenticator is an external collaborator: it registers credentials
//! and verifies assertions against server-issued challenges. It never
//! derives key material — a verified assertion only gates retrieval of the
//! vault key escrowed at registration time.

use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

const CHALLENGE_SIZE: usize = 32;
pub const DEFAULT_CHALLENGE_TTL_SECS: i64 = 300;

/// Attestation produced by the authenticator when a credential is created.
#[derive(Clone, Debug)]
pub struct CredentialRegistration {
    pub credential_id: String,
    pub attestation: Vec<u8>,
}

/// Assertion produced by the authenticator for an unlock attempt.
#[derive(Clone, Debug)]
pub struct CredentialAssertion {
    pub credential_id: String,
    pub signature: Vec<u8>,
}

/// The consumed authenticator interface.
pub trait PlatformAuthenticator: Send + Sync {
    /// Validates a registration attestation against the issued challenge.
    fn register(&self, challenge: &[u8], registration: &CredentialRegistration) -> bool;

    /// Validates an unlock assertion against the issued challenge.
    fn verify(&self, challenge: &[u8], assertion: &CredentialAssertion) -> bool;
}

/// A server-issued, single-use, expiring challenge.
#[derive(Clone, Debug)]
pub struct AuthChallenge {
    pub id: String,
    pub bytes: [u8; CHALLENGE_SIZE],
    pub expires_at: i64,
}

impl AuthChallenge {
    fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// Issues and consumes authenticator challenges.
pub struct ChallengeBook {
    challenges: Mutex<HashMap<String, AuthChallenge>>,
    ttl_secs: i64,
}

impl Default for ChallengeBook {
    fn default() -> Self {
        Self::new(DEFAULT_CHALLENGE_TTL_SECS)
    }
}

impl ChallengeBook {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            challenges: Mutex::new(HashMap::new()),
            ttl_secs,
        }
    }

    pub fn issue(&self) -> AuthChallenge {
        let mut bytes = [0u8; CHALLENGE_SIZE];
        OsRng.fill_bytes(&mut bytes);
        let now = chrono::Utc::now().timestamp();

        let challenge = AuthChallenge {
            id: Uuid::new_v4().to_string(),
            bytes,
            expires_at: now + self.ttl_secs,
        };

        let mut challenges = self.challenges.lock().unwrap();
        challenges.insert(challenge.id.clone(), challenge.clone());
        challenges.retain(|_, c| !c.is_expired(now));

        challenge
    }

    /// Removes and returns the challenge if it exists and is unexpired.
    /// Single use: any lookup consumes it.
    pub fn consume(&self, challenge_id: &str) -> Option<AuthChallenge> {
        let now = chrono::Utc::now().timestamp();
        let mut challenges = self.challenges.lock().unwrap();
        challenges
            .remove(challenge_id)
            .filter(|c| !c.is_expired(now))
    }
}
