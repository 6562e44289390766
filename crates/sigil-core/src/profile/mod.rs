//! Password-protected profile container.
//!
//! ## Lifecycle
//!
//! ```text
//! Empty ──load──▶ Loaded ──open──▶ Unlocked ──sub_profile──▶ Open ⇄ Dirty
//!   │                ▲                                         │
//!   └──create_new────┼────────────────────────────────────────▶│
//!                    └──────────────close / decrypt failure────┘
//! ```
//!
//! On disk a profile is the 4-byte magic header followed by an encoded
//! [`ProfileRecord`]: the master key wrapped under the password (and
//! optionally a backup password), plus the AES-GCM encrypted [`SubProfile`].

mod shared;

pub use shared::SharedProfile;

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::config::VaultConfig;
use crate::crypto::{
    self, random_iv, KeySource, SigningKeyPair, SymmetricKey, IV_LENGTH,
};
use crate::error::{VaultError, VaultResult};
use crate::relation::{self, SignedPayload};
use crate::schema::{
    decode, Account, KeyPair, KeyPub, KeyWrapped, PendingAccount, ProfileRecord, Record,
    SignedMessage, SubProfile,
};
use crate::storage::{BlobStore, PROFILE_KEY};

/// Magic header of a serialized profile.
pub const PROFILE_MAGIC: [u8; 4] = [0x63, 0xAC, 0x50, 0xA0];

/// Descriptive fields of a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileMetadata {
    pub name: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
}

impl ProfileMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Observable container state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileState {
    /// Nothing loaded
    Empty,
    /// Record loaded, master key still wrapped
    Loaded,
    /// Master key unwrapped, sub-profile not yet decrypted
    Unlocked,
    /// Sub-profile decrypted and matching the stored ciphertext
    Open,
    /// Sub-profile modified since the last serialization
    Dirty,
}

struct Decrypted {
    sub_profile: SubProfile,
    signing: SigningKeyPair,
    dirty: bool,
}

struct Session {
    master_key: SymmetricKey,
    decrypted: Option<Decrypted>,
}

/// The identity container.
///
/// All mutation goes through methods; a failed call leaves the sub-profile,
/// dirty flag and cached keys exactly as they were.
pub struct Profile {
    config: VaultConfig,
    record: Option<ProfileRecord>,
    session: Option<Session>,
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(VaultConfig::default())
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("state", &self.state())
            .field("has_backup", &self.has_backup())
            .finish()
    }
}

impl Profile {
    pub fn new(config: VaultConfig) -> Self {
        Self {
            config,
            record: None,
            session: None,
        }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn state(&self) -> ProfileState {
        match (&self.record, &self.session) {
            (None, _) => ProfileState::Empty,
            (Some(_), None) => ProfileState::Loaded,
            (Some(_), Some(Session { decrypted: None, .. })) => ProfileState::Unlocked,
            (Some(_), Some(Session { decrypted: Some(d), .. })) if d.dirty => ProfileState::Dirty,
            (Some(_), Some(_)) => ProfileState::Open,
        }
    }

    /// True once a profile record is present.
    pub fn is_loaded(&self) -> bool {
        self.record.is_some()
    }

    /// True when the master key is unwrapped.
    pub fn is_unlocked(&self) -> bool {
        self.session.is_some()
    }

    pub fn has_backup(&self) -> bool {
        self.record
            .as_ref()
            .is_some_and(|r| r.wrapped_backup_key.is_some())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Creation, loading and unlocking
    // ═══════════════════════════════════════════════════════════════════════

    /// Create a fresh profile, replacing whatever the container held.
    ///
    /// The master key is wrapped under `password` and, when given, separately
    /// under `backup_password`. The container ends up Open.
    pub fn create_new(
        &mut self,
        password: &str,
        metadata: ProfileMetadata,
        backup_password: Option<&str>,
    ) -> VaultResult<()> {
        let params = self.config.kdf_params()?;
        params.validate()?;
        let salt_len = self.config.wrap_salt_length;

        let master_key = SymmetricKey::generate(256)?;
        let signing = SigningKeyPair::generate(self.config.key_lifetime_secs());
        let sub_profile = SubProfile {
            name: metadata.name,
            email: metadata.email,
            url: metadata.url,
            signing_keypair: signing.to_record()?,
            accounts: BTreeMap::new(),
            pendings: BTreeMap::new(),
        };

        let wrapped_master_key = crypto::wrap_with_password(&master_key, password, &params, salt_len)?;
        let wrapped_backup_key = backup_password
            .map(|backup| crypto::wrap_with_password(&master_key, backup, &params, salt_len))
            .transpose()?;

        let iv = random_iv(IV_LENGTH);
        let ciphertext = master_key.encrypt_with_iv(&sub_profile.encode()?, &iv)?;
        let master_key = SymmetricKey::import_raw(&master_key.export_raw()?, false)?;

        self.record = Some(ProfileRecord {
            wrapped_master_key,
            wrapped_backup_key,
            iv,
            ciphertext,
        });
        self.session = Some(Session {
            master_key,
            decrypted: Some(Decrypted {
                sub_profile,
                signing,
                dirty: false,
            }),
        });

        info!(
            backup = backup_password.is_some(),
            iterations = params.iterations,
            "Created new profile"
        );
        Ok(())
    }

    /// Load serialized profile bytes. The container ends up Loaded.
    pub fn load(&mut self, bytes: &[u8]) -> VaultResult<()> {
        let body = bytes
            .strip_prefix(PROFILE_MAGIC.as_slice())
            .ok_or_else(|| VaultError::Format("missing profile header".into()))?;
        let record: ProfileRecord =
            decode(body).map_err(|e| VaultError::Format(format!("not a profile: {}", e)))?;

        self.record = Some(record);
        self.session = None;
        debug!(len = bytes.len(), "Loaded profile");
        Ok(())
    }

    /// Unwrap the master key with the main password.
    ///
    /// A wrong password returns [`VaultError::Decrypt`] and leaves the
    /// container Loaded, so the call can be retried.
    pub fn open(&mut self, password: &str) -> VaultResult<()> {
        let wrapped = self.locked_record()?.wrapped_master_key.clone();
        self.unlock_with(&wrapped, password)
    }

    /// Unwrap the master key with the backup password.
    pub fn open_with_backup(&mut self, password: &str) -> VaultResult<()> {
        let wrapped = self
            .locked_record()?
            .wrapped_backup_key
            .clone()
            .ok_or_else(|| VaultError::State("profile has no backup key".into()))?;
        self.unlock_with(&wrapped, password)
    }

    fn locked_record(&self) -> VaultResult<&ProfileRecord> {
        if self.session.is_some() {
            return Err(VaultError::State("profile is already unlocked".into()));
        }
        self.record
            .as_ref()
            .ok_or_else(|| VaultError::State("no profile loaded".into()))
    }

    fn unlock_with(&mut self, wrapped: &KeyWrapped, password: &str) -> VaultResult<()> {
        match crypto::unwrap_with_password(wrapped, password) {
            Ok(master_key) => {
                self.session = Some(Session {
                    master_key,
                    decrypted: None,
                });
                info!("Profile unlocked");
                Ok(())
            }
            Err(e) => {
                warn!("Profile unlock failed");
                Err(e)
            }
        }
    }

    /// Drop the master key and decrypted state. Unsaved changes are lost.
    pub fn close(&mut self) {
        if let Some(Session {
            decrypted: Some(d), ..
        }) = &self.session
        {
            if d.dirty {
                warn!("Closing profile with unsaved changes");
            }
        }
        self.session = None;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Sub-profile access
    // ═══════════════════════════════════════════════════════════════════════

    fn decrypted_mut(&mut self) -> VaultResult<&mut Decrypted> {
        let record = self
            .record
            .as_ref()
            .ok_or_else(|| VaultError::State("no profile loaded".into()))?;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| VaultError::State("profile is locked".into()))?;

        if session.decrypted.is_none() {
            match decrypt_sub_profile(&session.master_key, record) {
                Ok(decrypted) => session.decrypted = Some(decrypted),
                Err(e) => {
                    warn!("Sub-profile could not be opened, dropping keys");
                    self.session = None;
                    return Err(e);
                }
            }
        }

        self.session
            .as_mut()
            .and_then(|s| s.decrypted.as_mut())
            .ok_or_else(|| VaultError::State("profile is locked".into()))
    }

    /// The decrypted sub-profile, decrypting it on first access.
    ///
    /// A decrypt or decode failure drops every cached key and returns the
    /// container to Loaded.
    pub fn sub_profile(&mut self) -> VaultResult<&SubProfile> {
        Ok(&self.decrypted_mut()?.sub_profile)
    }

    /// Replace the sub-profile wholesale.
    ///
    /// Rejected when an id names both an account and a pending entry.
    pub fn update_sub_profile(&mut self, sub_profile: SubProfile) -> VaultResult<()> {
        let decrypted = self.decrypted_mut()?;
        if let Some(id) = sub_profile
            .accounts
            .keys()
            .find(|id| sub_profile.pendings.contains_key(*id))
        {
            return Err(VaultError::Validation(format!(
                "id {} is both an account and a pending entry",
                id
            )));
        }
        let signing = SigningKeyPair::from_record(&sub_profile.signing_keypair)?;
        decrypted.sub_profile = sub_profile;
        decrypted.signing = signing;
        decrypted.dirty = true;
        Ok(())
    }

    pub fn metadata(&mut self) -> VaultResult<ProfileMetadata> {
        let sub = self.sub_profile()?;
        Ok(ProfileMetadata {
            name: sub.name.clone(),
            email: sub.email.clone(),
            url: sub.url.clone(),
        })
    }

    pub fn update_metadata(&mut self, metadata: ProfileMetadata) -> VaultResult<()> {
        let decrypted = self.decrypted_mut()?;
        decrypted.sub_profile.name = metadata.name;
        decrypted.sub_profile.email = metadata.email;
        decrypted.sub_profile.url = metadata.url;
        decrypted.dirty = true;
        Ok(())
    }

    /// Serialize to the at-rest format.
    ///
    /// A dirty sub-profile is re-encrypted under a fresh IV first.
    pub fn serialize(&mut self) -> VaultResult<Vec<u8>> {
        let record = self
            .record
            .as_ref()
            .ok_or_else(|| VaultError::State("no profile to serialize".into()))?;

        if let Some(Session {
            master_key,
            decrypted: Some(decrypted),
        }) = &self.session
        {
            if decrypted.dirty {
                let plaintext = decrypted.sub_profile.encode()?;
                let mut iv = random_iv(IV_LENGTH);
                while iv == record.iv {
                    iv = random_iv(IV_LENGTH);
                }
                let ciphertext = master_key.encrypt_with_iv(&plaintext, &iv)?;

                let updated = ProfileRecord {
                    iv,
                    ciphertext,
                    ..record.clone()
                };
                self.record = Some(updated);
                if let Some(d) = self.session.as_mut().and_then(|s| s.decrypted.as_mut()) {
                    d.dirty = false;
                }
                debug!("Re-encrypted sub-profile");
            }
        }

        let record = self
            .record
            .as_ref()
            .ok_or_else(|| VaultError::State("no profile to serialize".into()))?;
        let mut bytes = PROFILE_MAGIC.to_vec();
        bytes.extend_from_slice(&record.encode()?);
        Ok(bytes)
    }

    /// Serialize and store under the profile key.
    pub fn save_to(&mut self, store: &dyn BlobStore) -> VaultResult<()> {
        let bytes = self.serialize()?;
        store.set(PROFILE_KEY, &bytes)?;
        info!(len = bytes.len(), "Saved profile");
        Ok(())
    }

    /// Load from the store. Returns `false` when nothing is stored.
    pub fn load_from(&mut self, store: &dyn BlobStore) -> VaultResult<bool> {
        match store.get(PROFILE_KEY)? {
            Some(bytes) => {
                self.load(&bytes)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Signing identity
    // ═══════════════════════════════════════════════════════════════════════

    pub fn signing_key_pair(&mut self) -> VaultResult<&SigningKeyPair> {
        Ok(&self.decrypted_mut()?.signing)
    }

    pub fn key_pub(&mut self) -> VaultResult<KeyPub> {
        Ok(self.signing_key_pair()?.key_pub())
    }

    /// SPKI PEM of the signing public key.
    pub fn export_public_key_pem(&mut self) -> VaultResult<String> {
        crypto::export_public_key_pem(KeySource::Pair(self.signing_key_pair()?))
    }

    /// Sign a payload with this profile's signing key.
    pub fn sign_message(&mut self, payload: &SignedPayload) -> VaultResult<SignedMessage> {
        let signing = self.signing_key_pair()?;
        relation::sign_message(payload, signing, Some(signing.uid().to_string()))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accounts and pendings
    // ═══════════════════════════════════════════════════════════════════════

    pub fn accounts(&mut self) -> VaultResult<&BTreeMap<String, Account>> {
        Ok(&self.sub_profile()?.accounts)
    }

    pub fn account_ids(&mut self) -> VaultResult<Vec<String>> {
        Ok(self.accounts()?.keys().cloned().collect())
    }

    pub fn account(&mut self, id: &str) -> VaultResult<Option<&Account>> {
        Ok(self.accounts()?.get(id))
    }

    pub fn pendings(&mut self) -> VaultResult<&BTreeMap<String, PendingAccount>> {
        Ok(&self.sub_profile()?.pendings)
    }

    pub fn pending_ids(&mut self) -> VaultResult<Vec<String>> {
        Ok(self.pendings()?.keys().cloned().collect())
    }

    pub fn pending(&mut self, id: &str) -> VaultResult<Option<&PendingAccount>> {
        Ok(self.pendings()?.get(id))
    }

    /// Insert a new account. `Ok(false)` if the id is already used by an
    /// account or a pending entry.
    pub fn add_account(&mut self, id: &str, account: Account) -> VaultResult<bool> {
        let decrypted = self.decrypted_mut()?;
        let sub = &mut decrypted.sub_profile;
        if sub.accounts.contains_key(id) || sub.pendings.contains_key(id) {
            warn!(id, "Account id already in use");
            return Ok(false);
        }
        sub.accounts.insert(id.to_string(), account);
        decrypted.dirty = true;
        debug!(id, "Added account");
        Ok(true)
    }

    /// Replace an existing account. `Ok(false)` if the id is unknown.
    pub fn set_account(&mut self, id: &str, account: Account) -> VaultResult<bool> {
        let decrypted = self.decrypted_mut()?;
        match decrypted.sub_profile.accounts.get_mut(id) {
            Some(existing) => {
                *existing = account;
                decrypted.dirty = true;
                Ok(true)
            }
            None => {
                warn!(id, "No such account");
                Ok(false)
            }
        }
    }

    /// Insert a pending entry. `Ok(false)` if the id is already used by a
    /// pending entry or an account.
    pub fn add_pending(&mut self, id: &str, pending: PendingAccount) -> VaultResult<bool> {
        let decrypted = self.decrypted_mut()?;
        let sub = &mut decrypted.sub_profile;
        if sub.pendings.contains_key(id) || sub.accounts.contains_key(id) {
            warn!(id, "Pending id already in use");
            return Ok(false);
        }
        sub.pendings.insert(id.to_string(), pending);
        decrypted.dirty = true;
        debug!(id, "Added pending");
        Ok(true)
    }

    /// Remove a pending entry. `Ok(false)` if it does not exist.
    pub fn remove_pending(&mut self, id: &str) -> VaultResult<bool> {
        let decrypted = self.decrypted_mut()?;
        if decrypted.sub_profile.pendings.remove(id).is_none() {
            warn!(id, "No such pending");
            return Ok(false);
        }
        decrypted.dirty = true;
        debug!(id, "Removed pending");
        Ok(true)
    }

    /// Turn a pending entry into an account under the same id.
    ///
    /// `Ok(false)`, with nothing changed, when the pending entry is missing
    /// or an account with that id already exists.
    pub fn upgrade_pending(&mut self, id: &str, account: Account) -> VaultResult<bool> {
        let decrypted = self.decrypted_mut()?;
        let sub = &mut decrypted.sub_profile;
        if !sub.pendings.contains_key(id) || sub.accounts.contains_key(id) {
            warn!(id, "Cannot upgrade pending");
            return Ok(false);
        }
        sub.accounts.insert(id.to_string(), account);
        sub.pendings.remove(id);
        decrypted.dirty = true;
        info!(id, "Pending upgraded to account");
        Ok(true)
    }
}

fn decrypt_sub_profile(master_key: &SymmetricKey, record: &ProfileRecord) -> VaultResult<Decrypted> {
    let plaintext = master_key.decrypt_with_iv(&record.ciphertext, &record.iv)?;
    let sub_profile: SubProfile = decode(&plaintext)?;
    let signing = SigningKeyPair::from_record(&sub_profile.signing_keypair)
        .map_err(|e| VaultError::schema(KeyPair::NAME, e))?;
    Ok(Decrypted {
        sub_profile,
        signing,
        dirty: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MIN_ITERATIONS;
    use crate::storage::MemoryStore;

    fn test_config() -> VaultConfig {
        VaultConfig::default().with_iterations(MIN_ITERATIONS)
    }

    fn new_profile(password: &str) -> Profile {
        let mut profile = Profile::new(test_config());
        profile
            .create_new(password, ProfileMetadata::named("Alice"), None)
            .unwrap();
        profile
    }

    fn sample_account(name: &str) -> Account {
        Account {
            name: name.into(),
            url: None,
            email: None,
            public_sign_key: SigningKeyPair::generate(3600).key_pub(),
            public_exchange_key: None,
            hkdf_salt: None,
            shared_key: None,
            established_at: 0,
        }
    }

    #[test]
    fn test_state_transitions() {
        let mut profile = Profile::new(test_config());
        assert_eq!(profile.state(), ProfileState::Empty);
        assert!(!profile.is_loaded());

        profile
            .create_new("pw", ProfileMetadata::named("Alice"), None)
            .unwrap();
        assert_eq!(profile.state(), ProfileState::Open);

        profile.update_metadata(ProfileMetadata::named("Alicia")).unwrap();
        assert_eq!(profile.state(), ProfileState::Dirty);

        let bytes = profile.serialize().unwrap();
        assert_eq!(profile.state(), ProfileState::Open);
        assert_eq!(&bytes[..4], &PROFILE_MAGIC);

        profile.close();
        assert_eq!(profile.state(), ProfileState::Loaded);

        profile.open("pw").unwrap();
        assert_eq!(profile.state(), ProfileState::Unlocked);
        assert_eq!(profile.sub_profile().unwrap().name.as_deref(), Some("Alicia"));
        assert_eq!(profile.state(), ProfileState::Open);
    }

    #[test]
    fn test_operations_require_loaded_profile() {
        let mut profile = Profile::new(test_config());
        assert!(matches!(profile.open("pw"), Err(VaultError::State(_))));
        assert!(matches!(profile.serialize(), Err(VaultError::State(_))));
        assert!(matches!(profile.sub_profile(), Err(VaultError::State(_))));
        assert!(matches!(
            profile.add_account("x", sample_account("x")),
            Err(VaultError::State(_))
        ));
    }

    #[test]
    fn test_locked_profile_refuses_mutation() {
        let mut profile = new_profile("pw");
        let bytes = profile.serialize().unwrap();

        let mut locked = Profile::new(test_config());
        locked.load(&bytes).unwrap();
        assert!(matches!(
            locked.update_metadata(ProfileMetadata::default()),
            Err(VaultError::State(_))
        ));
        assert!(matches!(locked.key_pub(), Err(VaultError::State(_))));
    }

    #[test]
    fn test_open_twice_is_state_error() {
        let mut profile = new_profile("pw");
        assert!(matches!(profile.open("pw"), Err(VaultError::State(_))));
    }

    #[test]
    fn test_open_with_backup_requires_backup() {
        let mut profile = new_profile("pw");
        let bytes = profile.serialize().unwrap();
        let mut loaded = Profile::new(test_config());
        loaded.load(&bytes).unwrap();
        assert!(!loaded.has_backup());
        assert!(matches!(
            loaded.open_with_backup("pw"),
            Err(VaultError::State(_))
        ));
    }

    #[test]
    fn test_load_rejects_bad_header() {
        let mut profile = Profile::new(test_config());
        assert!(matches!(
            profile.load(&[0x00, 0xAC, 0x50, 0xA0, 1, 2, 3]),
            Err(VaultError::Format(_))
        ));
        assert!(matches!(profile.load(&[0x63]), Err(VaultError::Format(_))));
        assert!(matches!(
            profile.load(&[0x63, 0xAC, 0x50, 0xA0, 0xff]),
            Err(VaultError::Format(_))
        ));
        assert_eq!(profile.state(), ProfileState::Empty);
    }

    #[test]
    fn test_failed_load_keeps_previous_profile() {
        let mut profile = new_profile("pw");
        assert!(profile.load(b"garbage").is_err());
        assert_eq!(profile.state(), ProfileState::Open);
    }

    #[test]
    fn test_account_crud() {
        let mut profile = new_profile("pw");

        assert!(profile.add_account("bob", sample_account("bob")).unwrap());
        assert!(!profile.add_account("bob", sample_account("imposter")).unwrap());
        assert_eq!(profile.account("bob").unwrap().unwrap().name, "bob");

        assert!(!profile.set_account("carol", sample_account("carol")).unwrap());
        assert!(profile.set_account("bob", sample_account("robert")).unwrap());
        assert_eq!(profile.account("bob").unwrap().unwrap().name, "robert");
        assert_eq!(profile.account_ids().unwrap(), vec!["bob".to_string()]);
    }

    #[test]
    fn test_refused_mutation_keeps_clean_state() {
        let mut profile = new_profile("pw");
        assert!(!profile.set_account("nobody", sample_account("x")).unwrap());
        assert!(!profile.remove_pending("nothing").unwrap());
        assert_eq!(profile.state(), ProfileState::Open);
    }

    #[test]
    fn test_save_and_load_from_store() {
        let store = MemoryStore::new();
        let mut profile = new_profile("pw");
        profile.save_to(&store).unwrap();

        let mut restored = Profile::new(test_config());
        assert!(restored.load_from(&store).unwrap());
        restored.open("pw").unwrap();
        assert_eq!(restored.metadata().unwrap(), ProfileMetadata::named("Alice"));

        let mut empty = Profile::new(test_config());
        assert!(!empty.load_from(&MemoryStore::new()).unwrap());
    }

    #[test]
    fn test_update_sub_profile_rejects_bad_signing_key() {
        let mut profile = new_profile("pw");
        let mut sub = profile.sub_profile().unwrap().clone();
        sub.signing_keypair.private_key.truncate(3);

        assert!(profile.update_sub_profile(sub).is_err());
        assert_eq!(profile.state(), ProfileState::Open);
    }

    #[test]
    fn test_export_public_key_pem() {
        let mut profile = new_profile("pw");
        let pem = profile.export_public_key_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
    }

    #[test]
    fn test_update_sub_profile_rejects_shared_id() {
        let mut profile = new_profile("pw");
        let pending = crate::relation::create_request(
            "bob",
            "alice",
            "https://a.example",
            None,
            None,
            &test_config(),
        )
        .unwrap()
        .pending;

        let mut sub = profile.sub_profile().unwrap().clone();
        sub.accounts.insert("id".into(), sample_account("bob"));
        sub.pendings.insert("id".into(), pending);

        assert!(matches!(
            profile.update_sub_profile(sub),
            Err(VaultError::Validation(_))
        ));
        assert!(profile.account_ids().unwrap().is_empty());
        assert_eq!(profile.state(), ProfileState::Open);
    }

    #[test]
    fn test_unusable_signing_key_is_a_schema_error() {
        let profile = new_profile("pw");
        let record = profile.record.clone().unwrap();
        let mut sub = profile
            .session
            .as_ref()
            .and_then(|s| s.decrypted.as_ref())
            .unwrap()
            .sub_profile
            .clone();
        sub.signing_keypair.private_key = vec![0; 5];

        let master_key = SymmetricKey::generate(256).unwrap();
        let iv = random_iv(IV_LENGTH);
        let record = ProfileRecord {
            ciphertext: master_key
                .encrypt_with_iv(&sub.encode().unwrap(), &iv)
                .unwrap(),
            iv,
            ..record
        };

        assert!(matches!(
            decrypt_sub_profile(&master_key, &record),
            Err(VaultError::Schema { record: "KeyPair", .. })
        ));
    }
}
