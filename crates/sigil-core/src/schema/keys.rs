use std::fmt;

use serde::{Deserialize, Serialize};

use super::Record;

/// Encoding of a public key's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicKeyFormat {
    Raw,
    Spki,
}

/// Encoding of a private key's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivateKeyFormat {
    Raw,
    Pkcs8,
}

/// A full asymmetric key pair, private half included.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub uid: String,
    pub alg: String,
    pub public_key: Vec<u8>,
    pub public_key_format: PublicKeyFormat,
    pub private_key: Vec<u8>,
    pub private_key_format: PrivateKeyFormat,
    pub created_at: i64,
    pub expires_at: i64,
}

impl KeyPair {
    /// The public half of this pair.
    pub fn to_pub(&self) -> KeyPub {
        KeyPub {
            uid: self.uid.clone(),
            alg: self.alg.clone(),
            public_key: self.public_key.clone(),
            public_key_format: self.public_key_format,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("uid", &self.uid)
            .field("alg", &self.alg)
            .field("public_key", &hex::encode(&self.public_key))
            .field("private_key", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Public half of a key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPub {
    pub uid: String,
    pub alg: String,
    pub public_key: Vec<u8>,
    pub public_key_format: PublicKeyFormat,
    pub created_at: i64,
    pub expires_at: i64,
}

/// A symmetric key wrapped under a password-derived key.
///
/// Carries everything needed to re-derive the wrapping key except the
/// password itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWrapped {
    pub uid: Option<String>,
    /// Algorithm of the wrapped key ("AES-GCM")
    pub alg: String,
    pub wrapped_key: Vec<u8>,
    /// Wrapping algorithm ("AES-KW")
    pub derive_alg: String,
    /// Wrapping key length in bits
    pub derive_length: u32,
    /// PBKDF2 hash name
    pub derive_hash: String,
    pub salt: Vec<u8>,
    pub iterations: u32,
}

impl Record for KeyPair {
    const NAME: &'static str = "KeyPair";
}

impl Record for KeyPub {
    const NAME: &'static str = "KeyPub";
}

impl Record for KeyWrapped {
    const NAME: &'static str = "KeyWrapped";
}
