//! One-time proofs gating recovery-code reveal.
//!
//! The reveal flow is two-factor: the password proves the caller, and a
//! short-lived single-use code delivered out of band proves possession of
//! the second channel. This module issues and consumes those codes.

use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Mutex;

pub const DEFAULT_PROOF_TTL_SECS: i64 = 300;

/// An issued proof, returned to the caller for out-of-band delivery.
#[derive(Clone, Debug)]
pub struct RevealProof {
    pub code: String,
    pub expires_at: i64,
}

struct IssuedProof {
    code: String,
    expires_at: i64,
}

impl IssuedProof {
    fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// Issues and consumes single-use reveal proofs, one active per account.
pub struct RevealProofGate {
    proofs: Mutex<HashMap<String, IssuedProof>>,
    ttl_secs: i64,
}

impl Default for RevealProofGate {
    fn default() -> Self {
        Self::new(DEFAULT_PROOF_TTL_SECS)
    }
}

impl RevealProofGate {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            proofs: Mutex::new(HashMap::new()),
            ttl_secs,
        }
    }

    /// Issues a fresh proof for a user, replacing any outstanding one.
    /// The returned code must be delivered out of band, never echoed back
    /// through the channel the password arrived on.
    pub fn issue(&self, user_id: &str) -> RevealProof {
        let code = format!("{:06}", OsRng.next_u32() % 1_000_000);
        let now = chrono::Utc::now().timestamp();
        let proof = RevealProof {
            code: code.clone(),
            expires_at: now + self.ttl_secs,
        };

        let mut proofs = self.proofs.lock().unwrap();
        proofs.insert(
            user_id.to_string(),
            IssuedProof {
                code,
                expires_at: proof.expires_at,
            },
        );
        // Sweep expired entries while we hold the lock
        proofs.retain(|_, p| !p.is_expired(now));

        proof
    }

    /// Verifies and consumes a proof. Single use: the entry is removed on
    /// any attempt, matching or not, so a guessed code cannot be retried.
    pub fn verify_and_consume(&self, user_id: &str, code: &str) -> bool {
        let now = chrono::Utc::now().timestamp();
        let mut proofs = self.proofs.lock().unwrap();

        match proofs.remove(user_id) {
            Some(issued) => !issued.is_expired(now) && issued.code == code,
            None => false,
        }
    }
}
