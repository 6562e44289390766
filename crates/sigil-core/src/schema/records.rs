use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{KeyPair, KeyPub, KeyWrapped, Record, RelationRequest};

/// Where an account's secret key lives.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecretKeyRef {
    /// Identifier of a key held elsewhere
    StoredKeyId(String),
    /// Raw key bytes, only ever persisted inside the encrypted sub-profile
    Inline(Vec<u8>),
}

impl fmt::Debug for SecretKeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretKeyRef::StoredKeyId(id) => f.debug_tuple("StoredKeyId").field(id).finish(),
            SecretKeyRef::Inline(bytes) => write!(f, "Inline(<{} bytes>)", bytes.len()),
        }
    }
}

/// An established peer relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub url: Option<String>,
    pub email: Option<String>,
    pub public_sign_key: KeyPub,
    pub public_exchange_key: Option<KeyPub>,
    pub hkdf_salt: Option<Vec<u8>>,
    pub shared_key: Option<SecretKeyRef>,
    pub established_at: i64,
}

/// Which side of the handshake created a pending entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingOrigin {
    /// We sent the request and wait for a response
    Outgoing,
    /// We received the request and have not answered yet
    Incoming { requester_sign_key: KeyPub },
}

/// A relationship proposal that has not completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAccount {
    pub receiver_label: String,
    pub request: RelationRequest,
    /// One-time exchange key pair for this handshake
    pub ephemeral_keypair: KeyPair,
    pub origin: PendingOrigin,
}

impl PendingAccount {
    pub fn is_outgoing(&self) -> bool {
        matches!(self.origin, PendingOrigin::Outgoing)
    }
}

/// Decrypted identity payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
    pub signing_keypair: KeyPair,
    pub accounts: BTreeMap<String, Account>,
    pub pendings: BTreeMap<String, PendingAccount>,
}

/// At-rest container: the wrapped master key(s) and the encrypted
/// [`SubProfile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub wrapped_master_key: KeyWrapped,
    pub wrapped_backup_key: Option<KeyWrapped>,
    pub iv: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl Record for SecretKeyRef {
    const NAME: &'static str = "SecretKeyRef";
}

impl Record for Account {
    const NAME: &'static str = "Account";
}

impl Record for PendingAccount {
    const NAME: &'static str = "PendingAccount";
}

impl Record for SubProfile {
    const NAME: &'static str = "SubProfile";
}

impl Record for ProfileRecord {
    const NAME: &'static str = "ProfileRecord";
}
