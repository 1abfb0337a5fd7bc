use std::sync::{Arc, Mutex};
use vigil_vault::{
    CredentialAssertion, CredentialRegistration, PlatformAuthenticator, VaultError,
    VaultUnlockGate,
};

/// Accepts any registration; verifies an assertion when the signature is the
/// challenge bytes echoed back (a stand-in for a real signing ceremony).
struct EchoAuthenticator;

impl PlatformAuthenticator for EchoAuthenticator {
    fn register(&self, _challenge: &[u8], registration: &CredentialRegistration) -> bool {
        !registration.credential_id.is_empty()
    }

    fn verify(&self, challenge: &[u8], assertion: &CredentialAssertion) -> bool {
        assertion.signature == challenge
    }
}

/// Rejects everything.
struct StoneWallAuthenticator;

impl PlatformAuthenticator for StoneWallAuthenticator {
    fn register(&self, _challenge: &[u8], _registration: &CredentialRegistration) -> bool {
        false
    }

    fn verify(&self, _challenge: &[u8], _assertion: &CredentialAssertion) -> bool {
        false
    }
}

fn gate() -> VaultUnlockGate {
    VaultUnlockGate::open_in_memory(Arc::new(EchoAuthenticator)).unwrap()
}

#[test]
fn setup_and_unlock() {
    let gate = gate();
    assert!(!gate.is_set_up());

    gate.setup("master-passcode").unwrap();
    assert!(gate.is_set_up());

    let session = gate.unlock("master-passcode").unwrap();
    assert!(!session.token.is_empty());
    assert_eq!(gate.active_session_count(), 1);
}

#[test]
fn short_passcode_rejected() {
    let gate = gate();
    assert!(matches!(
        gate.setup("short"),
        Err(VaultError::PasscodeTooShort)
    ));
}

#[test]
fn double_setup_rejected() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();
    assert!(matches!(
        gate.setup("other-passcode"),
        Err(VaultError::AlreadySetUp)
    ));
}

#[test]
fn wrong_passcode_rejected() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();
    assert!(matches!(
        gate.unlock("wrong-passcode"),
        Err(VaultError::InvalidPasscode)
    ));
}

#[test]
fn unlock_before_setup_rejected() {
    let gate = gate();
    assert!(matches!(
        gate.unlock("master-passcode"),
        Err(VaultError::NotSetUp)
    ));
}

#[test]
fn entries_roundtrip_within_session() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();
    let session = gate.unlock("master-passcode").unwrap();

    gate.store_entry(&session.token, "list-a", "passcode-for-a")
        .unwrap();
    gate.store_entry(&session.token, "list-b", "passcode-for-b")
        .unwrap();

    assert_eq!(
        gate.read_entry(&session.token, "list-a").unwrap(),
        "passcode-for-a"
    );

    let mut ids = gate.list_entries(&session.token).unwrap();
    ids.sort();
    assert_eq!(ids, vec!["list-a", "list-b"]);
}

#[test]
fn store_replaces_existing_entry() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();
    let session = gate.unlock("master-passcode").unwrap();

    gate.store_entry(&session.token, "list-a", "old").unwrap();
    gate.store_entry(&session.token, "list-a", "new").unwrap();

    assert_eq!(gate.read_entry(&session.token, "list-a").unwrap(), "new");
    assert_eq!(gate.list_entries(&session.token).unwrap().len(), 1);
}

#[test]
fn remove_entry_then_read_fails() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();
    let session = gate.unlock("master-passcode").unwrap();

    gate.store_entry(&session.token, "list-a", "passcode")
        .unwrap();
    gate.remove_entry(&session.token, "list-a").unwrap();

    assert!(matches!(
        gate.read_entry(&session.token, "list-a"),
        Err(VaultError::EntryNotFound(_))
    ));
    assert!(matches!(
        gate.remove_entry(&session.token, "list-a"),
        Err(VaultError::EntryNotFound(_))
    ));
}

#[test]
fn locked_session_cannot_read() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();
    let session = gate.unlock("master-passcode").unwrap();
    gate.store_entry(&session.token, "list-a", "passcode")
        .unwrap();

    gate.lock(&session.token);

    assert!(matches!(
        gate.read_entry(&session.token, "list-a"),
        Err(VaultError::LockedVault)
    ));
    assert!(matches!(
        gate.list_entries(&session.token),
        Err(VaultError::LockedVault)
    ));
}

#[test]
fn lock_is_idempotent() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();
    let session = gate.unlock("master-passcode").unwrap();

    gate.lock(&session.token);
    gate.lock(&session.token);
    assert_eq!(gate.active_session_count(), 0);
}

#[test]
fn bogus_token_is_locked() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();

    assert!(matches!(
        gate.read_entry("no-such-token", "list-a"),
        Err(VaultError::LockedVault)
    ));
}

#[test]
fn sessions_are_independent() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();

    let s1 = gate.unlock("master-passcode").unwrap();
    let s2 = gate.unlock("master-passcode").unwrap();
    gate.lock(&s1.token);

    gate.store_entry(&s2.token, "list-a", "passcode").unwrap();
    assert!(matches!(
        gate.store_entry(&s1.token, "list-b", "passcode"),
        Err(VaultError::LockedVault)
    ));
}

#[test]
fn quick_unlock_full_ceremony() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();

    let reg_challenge = gate.issue_challenge();
    let registration = CredentialRegistration {
        credential_id: "cred-1".into(),
        attestation: vec![1, 2, 3],
    };
    let credential_id = gate
        .register_quick_unlock("master-passcode", &reg_challenge.id, &registration)
        .unwrap();
    assert_eq!(credential_id, "cred-1");

    let unlock_challenge = gate.issue_challenge();
    let assertion = CredentialAssertion {
        credential_id: "cred-1".into(),
        signature: unlock_challenge.bytes.to_vec(),
    };
    let session = gate
        .unlock_via_credential(&unlock_challenge.id, &assertion)
        .unwrap();

    // a credential session reads entries exactly like a passcode session
    gate.store_entry(&session.token, "list-a", "passcode")
        .unwrap();
    assert_eq!(
        gate.read_entry(&session.token, "list-a").unwrap(),
        "passcode"
    );
}

#[test]
fn registration_requires_fresh_master_proof() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();

    let challenge = gate.issue_challenge();
    let registration = CredentialRegistration {
        credential_id: "cred-1".into(),
        attestation: vec![],
    };
    assert!(matches!(
        gate.register_quick_unlock("wrong-passcode", &challenge.id, &registration),
        Err(VaultError::InvalidPasscode)
    ));
}

#[test]
fn challenge_is_consumed_on_use() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();

    let challenge = gate.issue_challenge();
    let registration = CredentialRegistration {
        credential_id: "cred-1".into(),
        attestation: vec![],
    };
    gate.register_quick_unlock("master-passcode", &challenge.id, &registration)
        .unwrap();

    // reuse of the same challenge fails
    let assertion = CredentialAssertion {
        credential_id: "cred-1".into(),
        signature: challenge.bytes.to_vec(),
    };
    assert!(matches!(
        gate.unlock_via_credential(&challenge.id, &assertion),
        Err(VaultError::ChallengeRejected)
    ));
}

#[test]
fn unknown_credential_rejected() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();

    let challenge = gate.issue_challenge();
    let assertion = CredentialAssertion {
        credential_id: "never-registered".into(),
        signature: challenge.bytes.to_vec(),
    };
    assert!(matches!(
        gate.unlock_via_credential(&challenge.id, &assertion),
        Err(VaultError::CredentialNotRegistered)
    ));
}

#[test]
fn bad_assertion_rejected() {
    let gate = gate();
    gate.setup("master-passcode").unwrap();

    let reg_challenge = gate.issue_challenge();
    let registration = CredentialRegistration {
        credential_id: "cred-1".into(),
        attestation: vec![],
    };
    gate.register_quick_unlock("master-passcode", &reg_challenge.id, &registration)
        .unwrap();

    let unlock_challenge = gate.issue_challenge();
    let assertion = CredentialAssertion {
        credential_id: "cred-1".into(),
        signature: b"not the challenge".to_vec(),
    };
    assert!(matches!(
        gate.unlock_via_credential(&unlock_challenge.id, &assertion),
        Err(VaultError::AssertionRejected)
    ));
}

#[test]
fn rejecting_authenticator_blocks_registration() {
    let gate = VaultUnlockGate::open_in_memory(Arc::new(StoneWallAuthenticator)).unwrap();
    gate.setup("master-passcode").unwrap();

    let challenge = gate.issue_challenge();
    let registration = CredentialRegistration {
        credential_id: "cred-1".into(),
        attestation: vec![],
    };
    assert!(matches!(
        gate.register_quick_unlock("master-passcode", &challenge.id, &registration),
        Err(VaultError::AssertionRejected)
    ));
}

#[test]
fn vault_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.db");

    {
        let conn = duckdb::Connection::open(&path).unwrap();
        let gate =
            VaultUnlockGate::open(Arc::new(Mutex::new(conn)), Arc::new(EchoAuthenticator)).unwrap();
        gate.setup("master-passcode").unwrap();
        let session = gate.unlock("master-passcode").unwrap();
        gate.store_entry(&session.token, "grandma", "grandma-pass")
            .unwrap();
    }

    // Sessions die with the process; the salt, verification token and
    // entries come back from disk.
    let conn = duckdb::Connection::open(&path).unwrap();
    let gate =
        VaultUnlockGate::open(Arc::new(Mutex::new(conn)), Arc::new(EchoAuthenticator)).unwrap();
    assert!(gate.is_set_up());
    assert_eq!(gate.active_session_count(), 0);

    let session = gate.unlock("master-passcode").unwrap();
    assert_eq!(
        gate.read_entry(&session.token, "grandma").unwrap(),
        "grandma-pass"
    );
}
