//! The vault unlock gate.

use crate::authenticator::{
    ChallengeBook, CredentialAssertion, CredentialRegistration, PlatformAuthenticator,
};
use crate::error::{VaultError, VaultResult};
use crate::session::{SessionBook, VaultSession, DEFAULT_SESSION_TTL_SECS};
use duckdb::{params, Connection};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use vigil_crypto::{
    decrypt, derive_key, encrypt, generate_random_key, DerivedKey, EncryptedData, KdfParams,
    Salt, KEY_SIZE, SALT_SIZE,
};

/// Verification token: a known plaintext encrypted with the derived key.
/// On unlock we decrypt it and check it matches.
const VERIFICATION_PLAINTEXT: &[u8] = b"vigil-vault-verification-token-v1";

/// Master-passcode-protected store of other entities' passcodes.
///
/// Persistent state (salt, verification token, encrypted entries, escrowed
/// credentials) lives in DuckDB; sessions and challenges are in-memory.
pub struct VaultUnlockGate {
    conn: Arc<Mutex<Connection>>,
    sessions: SessionBook,
    challenges: ChallengeBook,
    authenticator: Arc<dyn PlatformAuthenticator>,
}

impl VaultUnlockGate {
    pub fn open(
        conn: Arc<Mutex<Connection>>,
        authenticator: Arc<dyn PlatformAuthenticator>,
    ) -> VaultResult<Self> {
        let gate = Self {
            conn,
            sessions: SessionBook::new(DEFAULT_SESSION_TTL_SECS),
            challenges: ChallengeBook::default(),
            authenticator,
        };
        gate.ensure_tables()?;
        Ok(gate)
    }

    pub fn open_in_memory(authenticator: Arc<dyn PlatformAuthenticator>) -> VaultResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| VaultError::Storage(e.to_string()))?;
        Self::open(Arc::new(Mutex::new(conn)), authenticator)
    }

    fn ensure_tables(&self) -> VaultResult<()> {
        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS vault_meta (
                key VARCHAR PRIMARY KEY,
                value BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS vault_entries (
                entity_id VARCHAR PRIMARY KEY,
                encrypted_passcode BLOB NOT NULL,
                created_at BIGINT NOT NULL,
                modified_at BIGINT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS vault_credentials (
                credential_id VARCHAR PRIMARY KEY,
                escrow_key BLOB NOT NULL,
                escrowed_vault_key BLOB NOT NULL,
                registered_at BIGINT NOT NULL
            );",
        )
        .map_err(|e| VaultError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Whether a master passcode has been configured.
    pub fn is_set_up(&self) -> bool {
        let conn = match self.conn.lock() {
            Ok(c) => c,
            Err(_) => return false,
        };
        let result: Result<i64, _> = conn.query_row(
            "SELECT COUNT(*) FROM vault_meta WHERE key = 'salt'",
            [],
            |row| row.get(0),
        );
        matches!(result, Ok(n) if n > 0)
    }

    /// First-time setup. Persists the KDF salt and a verification token.
    pub fn setup(&self, master_passcode: &str) -> VaultResult<()> {
        if master_passcode.len() < 8 {
            return Err(VaultError::PasscodeTooShort);
        }
        if self.is_set_up() {
            return Err(VaultError::AlreadySetUp);
        }

        let salt = Salt::random();
        let key = derive_key(master_passcode, &salt, &KdfParams::default())
            .map_err(|e| VaultError::Crypto(e.to_string()))?;
        let verification = encrypt(&key, VERIFICATION_PLAINTEXT)
            .map_err(|e| VaultError::Crypto(e.to_string()))?;
        let verification_bytes =
            serde_json::to_vec(&verification).map_err(|e| VaultError::Storage(e.to_string()))?;

        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        conn.execute(
            "INSERT INTO vault_meta (key, value) VALUES ('salt', ?)",
            params![salt.as_bytes().to_vec()],
        )
        .map_err(|e| VaultError::Storage(e.to_string()))?;
        conn.execute(
            "INSERT INTO vault_meta (key, value) VALUES ('verification', ?)",
            params![verification_bytes],
        )
        .map_err(|e| VaultError::Storage(e.to_string()))?;

        info!("vault set up");
        Ok(())
    }

    /// Unlocks the vault with the master passcode, minting a session.
    pub fn unlock(&self, master_passcode: &str) -> VaultResult<VaultSession> {
        let key = self.verify_master(master_passcode)?;
        Ok(self.sessions.create(key))
    }

    /// Destroys a session immediately. Locking an already-dead session is a
    /// no-op; the end state is the same.
    pub fn lock(&self, session_token: &str) {
        self.sessions.remove(session_token);
    }

    /// Stores (or replaces) an entity's passcode under the vault key.
    pub fn store_entry(
        &self,
        session_token: &str,
        entity_id: &str,
        passcode: &str,
    ) -> VaultResult<()> {
        let key = self.session_key(session_token)?;
        let encrypted = encrypt(&key, passcode.as_bytes())
            .map_err(|e| VaultError::Crypto(e.to_string()))?;
        let blob = serde_json::to_vec(&encrypted).map_err(|e| VaultError::Storage(e.to_string()))?;
        let now = chrono::Utc::now().timestamp();

        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO vault_entries (entity_id, encrypted_passcode, created_at, modified_at)
             VALUES (?, ?, COALESCE((SELECT created_at FROM vault_entries WHERE entity_id = ?), ?), ?)",
            params![entity_id, blob, entity_id, now, now],
        )
        .map_err(|e| VaultError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Reads and decrypts an entity's stored passcode.
    pub fn read_entry(&self, session_token: &str, entity_id: &str) -> VaultResult<String> {
        let key = self.session_key(session_token)?;

        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        let blob: Vec<u8> = conn
            .query_row(
                "SELECT encrypted_passcode FROM vault_entries WHERE entity_id = ?",
                params![entity_id],
                |row| row.get(0),
            )
            .map_err(|_| VaultError::EntryNotFound(entity_id.to_string()))?;
        drop(conn);

        let encrypted: EncryptedData =
            serde_json::from_slice(&blob).map_err(|e| VaultError::Storage(e.to_string()))?;
        let plaintext = decrypt(&key, &encrypted).map_err(|_| VaultError::InvalidPasscode)?;
        String::from_utf8(plaintext).map_err(|e| VaultError::Storage(e.to_string()))
    }

    /// Lists the entity ids with stored passcodes.
    pub fn list_entries(&self, session_token: &str) -> VaultResult<Vec<String>> {
        // Listing ids is still a vault read: require an active session
        self.session_key(session_token)?;

        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        let mut stmt = conn
            .prepare("SELECT entity_id FROM vault_entries ORDER BY modified_at DESC")
            .map_err(|e| VaultError::Storage(e.to_string()))?;
        let ids: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| VaultError::Storage(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(ids)
    }

    /// Removes an entity's stored passcode.
    pub fn remove_entry(&self, session_token: &str, entity_id: &str) -> VaultResult<()> {
        self.session_key(session_token)?;

        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        let affected = conn
            .execute(
                "DELETE FROM vault_entries WHERE entity_id = ?",
                params![entity_id],
            )
            .map_err(|e| VaultError::Storage(e.to_string()))?;
        if affected == 0 {
            return Err(VaultError::EntryNotFound(entity_id.to_string()));
        }
        Ok(())
    }

    /// Issues a challenge for credential registration or assertion.
    pub fn issue_challenge(&self) -> crate::authenticator::AuthChallenge {
        self.challenges.issue()
    }

    /// Binds a platform-authenticator credential as a quick-unlock path.
    ///
    /// The master passcode must be proven in this very call — a stale
    /// session is not enough to escrow the vault key. The vault key is
    /// escrowed encrypted under a server-held escrow key: the escrow is
    /// recoverable by the server operator, and the authenticator ceremony
    /// gates retrieval only.
    pub fn register_quick_unlock(
        &self,
        master_passcode: &str,
        challenge_id: &str,
        registration: &CredentialRegistration,
    ) -> VaultResult<String> {
        let vault_key = self.verify_master(master_passcode)?;

        let challenge = self
            .challenges
            .consume(challenge_id)
            .ok_or(VaultError::ChallengeRejected)?;
        if !self.authenticator.register(&challenge.bytes, registration) {
            warn!(
                credential_id = %registration.credential_id,
                "quick-unlock registration rejected by authenticator"
            );
            return Err(VaultError::AssertionRejected);
        }

        let escrow_key = generate_random_key();
        let escrowed = encrypt(&escrow_key, vault_key.as_bytes())
            .map_err(|e| VaultError::Crypto(e.to_string()))?;
        let escrowed_blob =
            serde_json::to_vec(&escrowed).map_err(|e| VaultError::Storage(e.to_string()))?;
        let now = chrono::Utc::now().timestamp();

        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO vault_credentials
             (credential_id, escrow_key, escrowed_vault_key, registered_at)
             VALUES (?, ?, ?, ?)",
            params![
                registration.credential_id,
                escrow_key.as_bytes().to_vec(),
                escrowed_blob,
                now
            ],
        )
        .map_err(|e| VaultError::Storage(e.to_string()))?;

        info!(credential_id = %registration.credential_id, "quick-unlock credential registered");
        Ok(registration.credential_id.clone())
    }

    /// Unlocks the vault via a registered credential's assertion.
    pub fn unlock_via_credential(
        &self,
        challenge_id: &str,
        assertion: &CredentialAssertion,
    ) -> VaultResult<VaultSession> {
        let challenge = self
            .challenges
            .consume(challenge_id)
            .ok_or(VaultError::ChallengeRejected)?;

        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;
        let row: Result<(Vec<u8>, Vec<u8>), _> = conn.query_row(
            "SELECT escrow_key, escrowed_vault_key FROM vault_credentials WHERE credential_id = ?",
            params![assertion.credential_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        );
        drop(conn);
        let (escrow_key_bytes, escrowed_blob) =
            row.map_err(|_| VaultError::CredentialNotRegistered)?;

        if !self.authenticator.verify(&challenge.bytes, assertion) {
            warn!(
                credential_id = %assertion.credential_id,
                "quick-unlock assertion rejected"
            );
            return Err(VaultError::AssertionRejected);
        }

        let escrow_key = key_from_blob(&escrow_key_bytes)?;
        let escrowed: EncryptedData =
            serde_json::from_slice(&escrowed_blob).map_err(|e| VaultError::Storage(e.to_string()))?;
        let vault_key_bytes =
            decrypt(&escrow_key, &escrowed).map_err(|e| VaultError::Crypto(e.to_string()))?;
        let vault_key = key_from_blob(&vault_key_bytes)?;

        Ok(self.sessions.create(vault_key))
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.active_count()
    }

    fn session_key(&self, session_token: &str) -> VaultResult<DerivedKey> {
        self.sessions
            .key_for(session_token)
            .ok_or(VaultError::LockedVault)
    }

    /// Derives the vault key from the stored salt and checks it against the
    /// verification token. Wrong passcode and corrupted token fail alike.
    fn verify_master(&self, master_passcode: &str) -> VaultResult<DerivedKey> {
        let conn = self.conn.lock().map_err(|e| VaultError::Storage(e.to_string()))?;

        let salt_bytes: Vec<u8> = conn
            .query_row(
                "SELECT value FROM vault_meta WHERE key = 'salt'",
                [],
                |row| row.get(0),
            )
            .map_err(|_| VaultError::NotSetUp)?;
        let verification_bytes: Vec<u8> = conn
            .query_row(
                "SELECT value FROM vault_meta WHERE key = 'verification'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| VaultError::Storage(e.to_string()))?;
        drop(conn);

        if salt_bytes.len() != SALT_SIZE {
            return Err(VaultError::Storage("invalid salt length".into()));
        }
        let mut salt_arr = [0u8; SALT_SIZE];
        salt_arr.copy_from_slice(&salt_bytes);
        let salt = Salt::from_bytes(salt_arr);

        let key = derive_key(master_passcode, &salt, &KdfParams::default())
            .map_err(|e| VaultError::Crypto(e.to_string()))?;

        let verification: EncryptedData = serde_json::from_slice(&verification_bytes)
            .map_err(|e| VaultError::Storage(e.to_string()))?;
        let decrypted = decrypt(&key, &verification).map_err(|_| VaultError::InvalidPasscode)?;
        if decrypted != VERIFICATION_PLAINTEXT {
            return Err(VaultError::InvalidPasscode);
        }

        Ok(key)
    }
}

fn key_from_blob(bytes: &[u8]) -> VaultResult<DerivedKey> {
    if bytes.len() != KEY_SIZE {
        return Err(VaultError::Storage(format!(
            "invalid key length: expected {KEY_SIZE}, got {}",
            bytes.len()
        )));
    }
    let mut arr = [0u8; KEY_SIZE];
    arr.copy_from_slice(bytes);
    Ok(DerivedKey::from_bytes(arr))
}
