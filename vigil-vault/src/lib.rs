//! Master-passcode vault.
//!
//! A convenience store of *other* entities' passcodes, protected by one
//! master passcode. Deliberately separate from the DEK/KEK machinery in
//! `vigil-keys`: the vault's secret is never shared and never needs
//! rotation-without-re-sharing, so it uses the simpler direct scheme
//! (Argon2id-derived key + verification token).
//!
//! Unlocking mints an explicit session token with a TTL; every vault read
//! requires an active session — there is no ambient "unlocked" global.
//! A platform-authenticator credential can be registered as a quick-unlock
//! path, but only after the master passcode has been proven in the same
//! call, and it only gates retrieval of an escrowed copy of the vault key;
//! it derives no key material itself.

mod authenticator;
mod error;
mod gate;
mod session;

pub use authenticator::{
    AuthChallenge, ChallengeBook, CredentialAssertion, CredentialRegistration,
    PlatformAuthenticator, DEFAULT_CHALLENGE_TTL_SECS,
};
pub use error::{VaultError, VaultResult};
pub use gate::VaultUnlockGate;
pub use session::{SessionBook, VaultSession, DEFAULT_SESSION_TTL_SECS};
